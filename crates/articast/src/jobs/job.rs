use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a conversion job.
///
/// States advance strictly in declaration order; `Failed` can be entered from
/// any non-terminal state. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Parsing,
    GeneratingAudio,
    Uploading,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Parsing => "PARSING",
            JobStatus::GeneratingAudio => "GENERATING_AUDIO",
            JobStatus::Uploading => "UPLOADING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// The single state that follows this one on the success path.
    pub fn next(&self) -> Option<JobStatus> {
        match self {
            JobStatus::Pending => Some(JobStatus::Parsing),
            JobStatus::Parsing => Some(JobStatus::GeneratingAudio),
            JobStatus::GeneratingAudio => Some(JobStatus::Uploading),
            JobStatus::Uploading => Some(JobStatus::Completed),
            JobStatus::Completed | JobStatus::Failed => None,
        }
    }

    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == JobStatus::Failed || self.next() == Some(target)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One article-to-audio conversion request and everything learned about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionJob {
    pub id: String,
    pub url: String,
    pub user_id: String,
    pub status: JobStatus,
    /// Extracted article text (set once parsing succeeds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Object name of the uploaded audio (set once uploading succeeds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file_name: Option<String>,
    /// Estimated playback length in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Human-readable failure, prefixed with the failing stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ConversionJob {
    pub fn new(user_id: &str, url: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            user_id: user_id.to_string(),
            status: JobStatus::Pending,
            content: None,
            audio_file_name: None,
            duration_secs: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}
