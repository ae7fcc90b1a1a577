pub mod api;
pub mod audio;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod feed;
pub mod jobs;
pub mod pipeline;
pub mod sanitize;
pub mod secrets;
pub mod service;
pub mod storage;
pub mod synthesis;
pub mod telemetry;

pub use audio::estimate_duration;
pub use auth::{AuthError, Authenticator, JwksCache, TokenVerifier};
pub use config::{load_config, Config};
pub use error::{ArticastError, ConversionError, Result, StorageError};
pub use extract::{ArticleExtractor, ExtractError};
pub use feed::{FeedError, FeedStore, PodcastFeed};
pub use jobs::{ConversionJob, JobRegistry, JobStatus};
pub use pipeline::{ConversionPipeline, PipelineConfig, PipelineError};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use service::ConversionService;
pub use storage::{BlobStore, FilesystemBlobStore, MemoryBlobStore, StoredObject};
pub use synthesis::{split_into_chunks, ChunkSynthesizer, SpeechSynthesizer, SynthesisError};
