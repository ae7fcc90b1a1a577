use std::sync::Arc;

use crate::jobs::ConversionJob;

use super::error::PipelineWarning;

#[derive(Debug)]
pub struct PipelineContext {
    // Input snapshot
    pub job: ConversionJob,

    // Parse result
    pub content: Option<String>,

    // Generate result
    pub chunk_count: usize,
    pub audio: Option<Arc<Vec<u8>>>,

    // Duration estimate, 0 when the audio could not be probed
    pub duration_secs: f64,

    // Upload results
    pub audio_file_name: Option<String>,
    pub audio_url: Option<String>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(job: ConversionJob) -> Self {
        Self {
            job,
            content: None,
            chunk_count: 0,
            audio: None,
            duration_secs: 0.0,
            audio_file_name: None,
            audio_url: None,
            warnings: Vec::new(),
        }
    }
}
