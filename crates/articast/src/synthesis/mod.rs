//! Text-to-speech: sentence-bounded chunking and bounded fan-out synthesis.

pub mod chunker;
pub mod error;
pub mod openai;
pub mod pool;

use async_trait::async_trait;

pub use chunker::{split_into_chunks, TextChunk};
pub use error::SynthesisError;
pub use openai::OpenAiSynthesizer;
pub use pool::{ChunkResult, ChunkSynthesizer, DEFAULT_MAX_CONCURRENCY};

/// A text-to-speech backend.
///
/// Callers guarantee that `text` never exceeds the configured chunk budget.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes `text` and returns the encoded audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError>;
}
