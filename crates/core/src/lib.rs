//! Shared primitives for the folio execution backend.
//!
//! Keeps zero internal dependencies so every other crate in the
//! workspace can depend on it.

pub mod context;
pub mod error;
pub mod status;
pub mod types;

pub use error::CoreError;
