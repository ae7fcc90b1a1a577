use thiserror::Error;

use crate::error::StorageError;
use crate::extract::ExtractError;
use crate::jobs::RegistryError;
use crate::synthesis::SynthesisError;

/// Failures that end a job. The `Display` text is what the job's error
/// field ends up holding.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to parse article: {0}")]
    Parse(#[source] ExtractError),

    #[error("Failed to generate audio: {0}")]
    Generate(#[source] SynthesisError),

    #[error("Failed to upload audio: {0}")]
    Upload(#[source] StorageError),

    #[error("Failed to update job state: {0}")]
    Registry(#[from] RegistryError),
}

/// Problems the pipeline recovers from on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    DurationUnavailable { error: String },
    FeedUpdateFailed { error: String },
}
