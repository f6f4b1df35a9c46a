pub mod batch_repo;
pub mod job_repo;
pub mod payload_repo;
pub mod result_repo;

pub use batch_repo::JobBatchRepo;
pub use job_repo::JobRepo;
pub use payload_repo::JobPayloadRepo;
pub use result_repo::JobResultRepo;
