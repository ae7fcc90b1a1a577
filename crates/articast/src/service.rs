//! Entry points used by the HTTP layer: start a conversion, poll it, list
//! what a user has produced.

use std::sync::Arc;

use reqwest::Url;
use tokio::runtime::Handle;
use tracing::{debug, info, warn, Instrument};

use crate::api::AudioFileEntry;
use crate::config::Config;
use crate::error::ConversionError;
use crate::extract::ArticleExtractor;
use crate::feed::FeedStore;
use crate::jobs::{ConversionJob, JobRegistry};
use crate::pipeline::{ConversionPipeline, PipelineConfig};
use crate::sanitize;
use crate::storage::{public_url, user_prefix, BlobStore, FEED_OBJECT_NAME};
use crate::synthesis::{ChunkSynthesizer, SpeechSynthesizer};

pub struct ConversionService {
    registry: Arc<JobRegistry>,
    pipeline: Arc<ConversionPipeline>,
    storage: Arc<dyn BlobStore>,
    feeds: Arc<FeedStore>,
    public_base_url: String,
    estimated_time_secs: u64,
}

impl ConversionService {
    /// Wires a registry, feed store and pipeline around the given
    /// collaborators.
    pub fn new(
        config: &Config,
        extractor: Arc<dyn ArticleExtractor>,
        backend: Arc<dyn SpeechSynthesizer>,
        storage: Arc<dyn BlobStore>,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let feeds = Arc::new(FeedStore::new(
            storage.clone(),
            config.feed.clone(),
            config.storage.public_base_url.clone(),
        ));
        let synthesizer = ChunkSynthesizer::new(backend, config.synthesis.max_concurrency);
        let pipeline = Arc::new(ConversionPipeline::new(
            Arc::new(PipelineConfig::from_config(config)),
            registry.clone(),
            extractor,
            synthesizer,
            storage.clone(),
            feeds.clone(),
        ));

        Self {
            registry,
            pipeline,
            storage,
            feeds,
            public_base_url: config.storage.public_base_url.clone(),
            estimated_time_secs: config.estimated_time_secs,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn feeds(&self) -> &Arc<FeedStore> {
        &self.feeds
    }

    pub fn estimated_time(&self) -> u64 {
        self.estimated_time_secs
    }

    /// Registers a job and starts its pipeline in the background.
    ///
    /// Returns as soon as the job is registered; the snapshot is in
    /// `PENDING`. Must be called from within a Tokio runtime.
    pub fn start_conversion(
        &self,
        user_id: &str,
        url: &str,
    ) -> Result<ConversionJob, ConversionError> {
        validate_article_url(url)?;

        let handle = Handle::try_current().map_err(|_| ConversionError::RuntimeUnavailable)?;
        let job = self.registry.create(user_id, url);
        info!(
            job_id = %job.id,
            user = %sanitize::hash_id(user_id),
            url = %sanitize::redact_url(url),
            "Conversion queued"
        );

        let pipeline = Arc::clone(&self.pipeline);
        let snapshot = job.clone();
        let span = tracing::Span::current();
        handle.spawn(
            async move {
                if let Err(e) = pipeline.run(job).await {
                    debug!(error = %e, "Conversion ended with an error");
                }
            }
            .instrument(span),
        );

        Ok(snapshot)
    }

    pub fn get_status(&self, job_id: &str) -> Result<ConversionJob, ConversionError> {
        self.registry
            .get(job_id)
            .ok_or_else(|| ConversionError::NotFound(job_id.to_string()))
    }

    /// Audio objects stored for `user_id`, newest first. The feed document
    /// is not included.
    pub async fn list_audio_files(
        &self,
        user_id: &str,
    ) -> Result<Vec<AudioFileEntry>, ConversionError> {
        let prefix = user_prefix(user_id);
        let mut objects = self.storage.list(&prefix).await.map_err(|e| {
            warn!(user = %sanitize::hash_id(user_id), error = %e, "Listing audio files failed");
            e
        })?;
        objects.retain(|object| {
            let name = object.key.strip_prefix(&prefix).unwrap_or(&object.key);
            name != FEED_OBJECT_NAME
        });
        objects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.key.cmp(&b.key)));

        Ok(objects
            .into_iter()
            .map(|object| {
                let url = public_url(&self.public_base_url, &object.key);
                AudioFileEntry::new(object.key, url, object.created_at)
            })
            .collect())
    }

    pub fn feed_url(&self, user_id: &str) -> String {
        self.feeds.feed_url(user_id)
    }
}

fn validate_article_url(url: &str) -> Result<(), ConversionError> {
    match Url::parse(url.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(ConversionError::InvalidUrl(sanitize::redact_url(url))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;
    use crate::extract::ExtractError;
    use crate::jobs::JobStatus;
    use crate::storage::MemoryBlobStore;
    use crate::synthesis::SynthesisError;
    use async_trait::async_trait;

    struct NeverExtractor;

    #[async_trait]
    impl ArticleExtractor for NeverExtractor {
        async fn extract(&self, _url: &str) -> Result<String, ExtractError> {
            Err(ExtractError::NoContent)
        }
    }

    struct NeverSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for NeverSynthesizer {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SynthesisError> {
            Err(SynthesisError::EmptyInput)
        }
    }

    fn config() -> Config {
        load_config_from_str(
            r#"{
                "version": "1.0",
                "storage": { "root": "/tmp/articast", "public_base_url": "https://cdn.example.com/" },
                "auth": { "enabled": false }
            }"#,
        )
        .unwrap()
    }

    fn service(blobs: Arc<MemoryBlobStore>) -> ConversionService {
        ConversionService::new(
            &config(),
            Arc::new(NeverExtractor),
            Arc::new(NeverSynthesizer),
            blobs,
        )
    }

    #[test]
    fn test_url_validation() {
        assert!(validate_article_url("https://example.com/post").is_ok());
        assert!(validate_article_url("http://example.com").is_ok());
        assert!(validate_article_url("ftp://example.com/file").is_err());
        assert!(validate_article_url("not a url").is_err());
        assert!(validate_article_url("").is_err());
    }

    #[test]
    fn test_start_outside_runtime_is_rejected() {
        let svc = service(Arc::new(MemoryBlobStore::new()));
        let err = svc
            .start_conversion("user-1", "https://example.com/post")
            .unwrap_err();
        assert!(matches!(err, ConversionError::RuntimeUnavailable));
        assert!(svc.registry().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url_creates_no_job() {
        let svc = service(Arc::new(MemoryBlobStore::new()));
        let err = svc.start_conversion("user-1", "javascript:alert(1)").unwrap_err();
        assert!(matches!(err, ConversionError::InvalidUrl(_)));
        assert!(svc.registry().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let svc = service(Arc::new(MemoryBlobStore::new()));
        assert!(matches!(
            svc.get_status("nope"),
            Err(ConversionError::NotFound(id)) if id == "nope"
        ));
    }

    #[tokio::test]
    async fn test_started_job_is_visible() {
        let svc = service(Arc::new(MemoryBlobStore::new()));
        let job = svc
            .start_conversion("user-1", "https://example.com/post")
            .unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(svc.get_status(&job.id).unwrap().id, job.id);
        assert_eq!(svc.estimated_time(), 30);
    }

    #[tokio::test]
    async fn test_listing_skips_feed_and_other_users() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.put("user-1/a.mp3", b"a").await.unwrap();
        blobs.put("user-1/rss.xml", b"<rss/>").await.unwrap();
        blobs.put("user-10/b.mp3", b"b").await.unwrap();
        blobs.put("user-2/c.mp3", b"c").await.unwrap();
        let svc = service(blobs);

        let files = svc.list_audio_files("user-1").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].key, "user-1/a.mp3");
        assert_eq!(files[0].url, "https://cdn.example.com/user-1/a.mp3");
        assert_eq!(
            svc.feed_url("user-1"),
            "https://cdn.example.com/user-1/rss.xml"
        );
    }
}
