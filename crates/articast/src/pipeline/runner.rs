use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::audio::{estimate_duration, AudioError};
use crate::extract::ArticleExtractor;
use crate::feed::{EpisodeDraft, FeedStore};
use crate::jobs::{ConversionJob, JobRegistry, JobStatus};
use crate::sanitize;
use crate::storage::{audio_key, public_url, BlobStore};
use crate::synthesis::{split_into_chunks, ChunkSynthesizer};

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::{PipelineError, PipelineWarning};

/// Drives one job from `PENDING` to a terminal state.
pub struct ConversionPipeline {
    config: Arc<PipelineConfig>,
    registry: Arc<JobRegistry>,
    extractor: Arc<dyn ArticleExtractor>,
    synthesizer: ChunkSynthesizer,
    storage: Arc<dyn BlobStore>,
    feeds: Arc<FeedStore>,
}

impl ConversionPipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        registry: Arc<JobRegistry>,
        extractor: Arc<dyn ArticleExtractor>,
        synthesizer: ChunkSynthesizer,
        storage: Arc<dyn BlobStore>,
        feeds: Arc<FeedStore>,
    ) -> Self {
        Self {
            config,
            registry,
            extractor,
            synthesizer,
            storage,
            feeds,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Run every step for `job`. The registry is kept current as the job
    /// advances; on a fatal error the job is marked `FAILED` with the error's
    /// message before the error is returned.
    pub async fn run(&self, job: ConversionJob) -> Result<PipelineContext, PipelineError> {
        let span = info_span!("pipeline",
            job_id = %job.id,
            user = %sanitize::hash_id(&job.user_id),
            url = %sanitize::redact_url(&job.url),
        );
        self.run_steps(PipelineContext::new(job)).instrument(span).await
    }

    async fn run_steps(&self, mut ctx: PipelineContext) -> Result<PipelineContext, PipelineError> {
        info!("Conversion started");

        // Step 1: Parse article
        let step = self
            .step_parse(&mut ctx)
            .instrument(info_span!("parse_article"))
            .await;
        self.check(&ctx, step)?;

        // Step 2: Generate audio
        let step = self
            .step_generate(&mut ctx)
            .instrument(info_span!("generate_audio"))
            .await;
        self.check(&ctx, step)?;

        // Step 3: Estimate duration
        self.step_duration(&mut ctx)
            .instrument(info_span!("estimate_duration"))
            .await?;

        // Step 4: Upload audio
        let step = self
            .step_upload(&mut ctx)
            .instrument(info_span!("upload_audio"))
            .await;
        self.check(&ctx, step)?;

        // Step 5: Update feed
        self.step_update_feed(&mut ctx)
            .instrument(info_span!("update_feed"))
            .await;

        self.registry.transition(&ctx.job.id, JobStatus::Completed)?;
        info!(
            duration_secs = ctx.duration_secs,
            warnings = ctx.warnings.len(),
            "Conversion completed"
        );
        Ok(ctx)
    }

    /// Marks the job failed when a fatal step returned an error.
    fn check(
        &self,
        ctx: &PipelineContext,
        step: Result<(), PipelineError>,
    ) -> Result<(), PipelineError> {
        let err = match step {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        let message = err.to_string();
        warn!(error = %message, "Conversion failed");
        if let Err(e) = self.registry.fail(&ctx.job.id, message) {
            warn!(error = %e, "Could not record job failure");
        }
        Err(err)
    }

    async fn step_parse(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        self.registry.transition(&ctx.job.id, JobStatus::Parsing)?;

        let content = self
            .extractor
            .extract(&ctx.job.url)
            .await
            .map_err(PipelineError::Parse)?;
        debug!(chars = content.chars().count(), "Article text extracted");

        self.registry.record_content(&ctx.job.id, content.clone())?;
        ctx.content = Some(content);
        Ok(())
    }

    async fn step_generate(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        self.registry
            .transition(&ctx.job.id, JobStatus::GeneratingAudio)?;

        let text = ctx.content.as_deref().unwrap_or_default();
        let chunks = split_into_chunks(text, self.config.max_chunk_size);
        ctx.chunk_count = chunks.len();
        debug!(chunks = ctx.chunk_count, "Article split for synthesis");

        let audio = self
            .synthesizer
            .synthesize(chunks)
            .await
            .map_err(PipelineError::Generate)?;
        debug!(bytes = audio.len(), "Audio generated");
        ctx.audio = Some(Arc::new(audio));
        Ok(())
    }

    /// Non-fatal: an unreadable stream is recorded as zero seconds.
    async fn step_duration(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let estimate = match ctx.audio.clone() {
            Some(audio) => tokio::task::spawn_blocking(move || estimate_duration(&audio))
                .await
                .unwrap_or_else(|e| Err(AudioError::TaskFailed(e.to_string()))),
            None => Err(AudioError::NoTrack),
        };

        ctx.duration_secs = match estimate {
            Ok(secs) => secs as f64,
            Err(e) => {
                warn!(error = %e, "Could not determine audio duration, using 0");
                ctx.warnings.push(PipelineWarning::DurationUnavailable {
                    error: e.to_string(),
                });
                0.0
            }
        };
        self.registry
            .record_duration(&ctx.job.id, ctx.duration_secs)?;
        Ok(())
    }

    async fn step_upload(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        self.registry.transition(&ctx.job.id, JobStatus::Uploading)?;

        let key = audio_key(&ctx.job.user_id, &ctx.job.id);
        let audio = ctx.audio.clone().unwrap_or_default();
        self.storage
            .put(&key, &audio)
            .await
            .map_err(PipelineError::Upload)?;

        let file_name = format!("{}.mp3", ctx.job.id);
        self.registry
            .record_audio_file(&ctx.job.id, file_name.clone())?;
        ctx.audio_url = Some(public_url(&self.config.public_base_url, &key));
        ctx.audio_file_name = Some(file_name);
        info!(bytes = audio.len(), "Audio uploaded");
        Ok(())
    }

    /// Best effort: the audio is already stored, so a feed problem only
    /// costs the episode entry.
    async fn step_update_feed(&self, ctx: &mut PipelineContext) {
        let (Some(title), Some(audio_url)) = (ctx.audio_file_name.clone(), ctx.audio_url.clone())
        else {
            return;
        };
        let draft = EpisodeDraft {
            title,
            author: self.config.episode_author.clone(),
            description: format!("Audio version of article from: {}", ctx.job.url),
            audio_url,
            length_bytes: ctx.audio.as_ref().map(|audio| audio.len() as u64),
            duration_secs: ctx.duration_secs,
        };

        if let Err(e) = self
            .feeds
            .append_episode(
                &ctx.job.user_id,
                &self.config.owner_name,
                &self.config.owner_email,
                draft,
            )
            .await
        {
            warn!(error = %e, "Failed to update podcast feed");
            ctx.warnings.push(PipelineWarning::FeedUpdateFailed {
                error: e.to_string(),
            });
        }
    }
}
