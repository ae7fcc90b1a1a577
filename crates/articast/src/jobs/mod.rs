pub mod job;
pub mod registry;

pub use job::{ConversionJob, JobStatus};
pub use registry::{JobRegistry, RegistryError};
