//! Status enums mapping to SMALLINT columns.
//!
//! Each variant's discriminant matches the seed data order (1-based)
//! in the corresponding status column. Both sets are closed: the
//! scheduler and the store queries only ever see these values.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Map a database status ID back to the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Like [`Self::from_id`], but an id outside the closed
            /// set is an error.
            pub fn try_from_id(id: StatusId) -> Result<Self, crate::error::CoreError> {
                Self::from_id(id).ok_or(crate::error::CoreError::UnknownStatus(id))
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Job execution status.
    ///
    /// Pending -> Running -> {Done, Error}; Running -> Aborting ->
    /// Aborted. Crash compensation may force Running back to Pending.
    JobStatus {
        Pending = 1,
        Running = 2,
        Done = 3,
        Error = 4,
        Aborting = 5,
        Aborted = 6,
    }
}

define_status_enum! {
    /// Batch execution status. Gates the ready/cancel store queries:
    /// only Pending/Running batches are scheduled, only Aborting
    /// batches are cancelled.
    BatchStatus {
        Pending = 1,
        Running = 2,
        Done = 3,
        Error = 4,
        Aborting = 5,
        Aborted = 6,
    }
}

impl JobStatus {
    /// Terminal states never leave on their own.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Aborted)
    }
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Aborted)
    }
}
