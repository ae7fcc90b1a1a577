//! Isolated environment for end-to-end conversion tests.
//!
//! Each harness owns a temp directory backing a `FilesystemBlobStore` and a
//! `ConversionService` wired to the scripted fakes.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use articast::config::{load_config_from_str, Config};
use articast::{
    ConversionJob, ConversionService, FilesystemBlobStore, JobStatus, SpeechSynthesizer,
};

use super::fakes::{ScriptedExtractor, SilentSynthesizer};

pub const PUBLIC_BASE_URL: &str = "https://cdn.example.com";

pub struct TestHarness {
    temp_dir: TempDir,
    pub config: Config,
    pub storage: Arc<FilesystemBlobStore>,
    pub synthesizer: Arc<SilentSynthesizer>,
    pub service: ConversionService,
}

impl TestHarness {
    /// 400 frames per chunk (~10.4 s of audio), no artificial latency.
    pub fn new() -> Self {
        Self::build(
            ScriptedExtractor::new(),
            SilentSynthesizer::new(400, Duration::ZERO),
            2048,
        )
    }

    pub fn build(
        extractor: ScriptedExtractor,
        synthesizer: SilentSynthesizer,
        max_chunk_size: usize,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = Self::config_for(temp_dir.path(), max_chunk_size);
        let storage = Arc::new(FilesystemBlobStore::new(temp_dir.path()));
        let synthesizer = Arc::new(synthesizer);
        let backend: Arc<dyn SpeechSynthesizer> = synthesizer.clone();

        let service =
            ConversionService::new(&config, Arc::new(extractor), backend, storage.clone());

        Self {
            temp_dir,
            config,
            storage,
            synthesizer,
            service,
        }
    }

    fn config_for(root: &Path, max_chunk_size: usize) -> Config {
        let raw = serde_json::json!({
            "version": "1.0",
            "storage": {
                "root": root.to_string_lossy(),
                "public_base_url": PUBLIC_BASE_URL,
            },
            "synthesis": { "max_chunk_size": max_chunk_size, "max_concurrency": 3 },
            "auth": { "enabled": false },
        });
        load_config_from_str(&raw.to_string()).expect("harness config must be valid")
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Polls until the job reaches a terminal state, recording every status
    /// observed along the way.
    pub async fn wait_for_terminal(&self, job_id: &str) -> (ConversionJob, Vec<JobStatus>) {
        let mut seen = Vec::new();
        for _ in 0..500 {
            let job = self.service.get_status(job_id).expect("job must exist");
            if seen.last() != Some(&job.status) {
                seen.push(job.status);
            }
            if job.status.is_terminal() {
                return (job, seen);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish; statuses seen: {:?}", job_id, seen);
    }
}
