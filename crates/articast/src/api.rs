//! Request and response bodies of the conversion HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jobs::{ConversionJob, JobStatus};

/// Timestamp layout used in file listings.
const LISTING_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub job_id: String,
    pub status: JobStatus,
    /// Rough wait in seconds before the audio is ready.
    pub estimated_time: u64,
}

impl ConversionResponse {
    pub fn new(job: &ConversionJob, estimated_time: u64) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            estimated_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ConversionJob> for StatusResponse {
    fn from(job: &ConversionJob) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            error: job.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFileEntry {
    pub key: String,
    pub url: String,
    pub created_at: String,
}

impl AudioFileEntry {
    pub fn new(key: String, url: String, created_at: DateTime<Utc>) -> Self {
        Self {
            key,
            url,
            created_at: created_at.format(LISTING_TIME_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListResponse {
    pub files: Vec<AudioFileEntry>,
}
