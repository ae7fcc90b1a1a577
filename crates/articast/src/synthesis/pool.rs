use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use super::chunker::TextChunk;
use super::error::SynthesisError;
use super::SpeechSynthesizer;

/// Default ceiling on simultaneous requests to the speech backend.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Outcome of synthesizing one chunk, tagged with the chunk's index.
#[derive(Debug)]
pub struct ChunkResult {
    pub index: usize,
    pub result: Result<Vec<u8>, SynthesisError>,
}

/// Fans chunks out to a [`SpeechSynthesizer`] with bounded concurrency and
/// reassembles the audio in chunk order.
#[derive(Clone)]
pub struct ChunkSynthesizer {
    backend: Arc<dyn SpeechSynthesizer>,
    max_concurrency: usize,
}

impl ChunkSynthesizer {
    /// # Panics
    /// Panics if `max_concurrency` is 0.
    pub fn new(backend: Arc<dyn SpeechSynthesizer>, max_concurrency: usize) -> Self {
        assert!(max_concurrency > 0, "max_concurrency must be > 0");
        Self {
            backend,
            max_concurrency,
        }
    }

    pub fn with_defaults(backend: Arc<dyn SpeechSynthesizer>) -> Self {
        Self::new(backend, DEFAULT_MAX_CONCURRENCY)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Synthesizes every chunk and returns the concatenated audio.
    ///
    /// The result is ordered by chunk index no matter which request finishes
    /// first. The first failure seen while draining results is returned
    /// immediately; requests still in flight are left to finish on their own.
    pub async fn synthesize(&self, chunks: Vec<TextChunk>) -> Result<Vec<u8>, SynthesisError> {
        match chunks.len() {
            0 => Err(SynthesisError::EmptyInput),
            1 => {
                let chunk = &chunks[0];
                self.backend
                    .synthesize(&chunk.text)
                    .await
                    .map_err(|e| SynthesisError::Chunk {
                        index: chunk.index,
                        source: Box::new(e),
                    })
            }
            _ => self.synthesize_concurrently(chunks).await,
        }
    }

    async fn synthesize_concurrently(
        &self,
        chunks: Vec<TextChunk>,
    ) -> Result<Vec<u8>, SynthesisError> {
        let total = chunks.len();
        let total_chars: usize = chunks.iter().map(|c| c.text.len()).sum();
        info!(
            chunks = total,
            chars = total_chars,
            concurrency = self.max_concurrency,
            "Starting chunked synthesis"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let (result_tx, mut result_rx) = mpsc::channel::<ChunkResult>(total);

        for chunk in chunks {
            let backend = Arc::clone(&self.backend);
            let semaphore = Arc::clone(&semaphore);
            let result_tx = result_tx.clone();

            tokio::spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        debug!(index = chunk.index, "Chunk synthesis started");
                        backend.synthesize(&chunk.text).await
                    }
                    Err(_) => Err(SynthesisError::Request(
                        "concurrency limiter closed".to_string(),
                    )),
                };
                // Receiver may already be gone after an earlier failure.
                let _ = result_tx
                    .send(ChunkResult {
                        index: chunk.index,
                        result,
                    })
                    .await;
            });
        }

        // The channel closes once every task has dropped its sender.
        drop(result_tx);

        let mut slots: Vec<Option<Vec<u8>>> = vec![None; total];
        while let Some(chunk_result) = result_rx.recv().await {
            match chunk_result.result {
                Ok(bytes) => {
                    debug!(index = chunk_result.index, bytes = bytes.len(), "Chunk synthesized");
                    if let Some(slot) = slots.get_mut(chunk_result.index) {
                        *slot = Some(bytes);
                    }
                }
                Err(e) => {
                    warn!(index = chunk_result.index, error = %e, "Chunk synthesis failed");
                    return Err(SynthesisError::Chunk {
                        index: chunk_result.index,
                        source: Box::new(e),
                    });
                }
            }
        }

        let mut parts = Vec::with_capacity(total);
        for (index, slot) in slots.into_iter().enumerate() {
            parts.push(slot.ok_or(SynthesisError::MissingChunk(index))?);
        }

        let combined = parts.concat();
        info!(
            chunks = total,
            bytes = combined.len(),
            "Generated audio from chunks"
        );
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::split_into_chunks;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes the chunk text as bytes, delaying chunks that start with "slow".
    struct EchoSynthesizer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl EchoSynthesizer {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for EchoSynthesizer {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = if text.starts_with("slow") { 80 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if text.starts_with("fail") {
                return Err(SynthesisError::Backend {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(format!("[{}]", text).into_bytes())
        }
    }

    fn chunks(texts: &[&str]) -> Vec<TextChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| TextChunk {
                index,
                text: text.to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_input_fails() {
        let pool = ChunkSynthesizer::with_defaults(Arc::new(EchoSynthesizer::new()));
        let err = pool.synthesize(Vec::new()).await.unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyInput));
    }

    #[tokio::test]
    async fn test_empty_text_after_splitting_fails() {
        let pool = ChunkSynthesizer::with_defaults(Arc::new(EchoSynthesizer::new()));
        let err = pool
            .synthesize(split_into_chunks("   ", 100))
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyInput));
    }

    #[tokio::test]
    async fn test_single_chunk_is_synthesized_directly() {
        let backend = Arc::new(EchoSynthesizer::new());
        let pool = ChunkSynthesizer::with_defaults(backend.clone());

        let audio = pool.synthesize(chunks(&["only"])).await.unwrap();
        assert_eq!(audio, b"[only]");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reassembles_by_index_not_completion_order() {
        let pool = ChunkSynthesizer::with_defaults(Arc::new(EchoSynthesizer::new()));

        // Chunk 0 finishes last.
        let audio = pool
            .synthesize(chunks(&["slow-a", "b", "c", "d"]))
            .await
            .unwrap();
        assert_eq!(audio, b"[slow-a][b][c][d]");
    }

    #[tokio::test]
    async fn test_respects_concurrency_ceiling() {
        let backend = Arc::new(EchoSynthesizer::new());
        let pool = ChunkSynthesizer::new(backend.clone(), 2);

        let texts: Vec<String> = (0..8).map(|i| format!("part{}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        pool.synthesize(chunks(&refs)).await.unwrap();

        assert!(backend.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_first_error_wins() {
        let pool = ChunkSynthesizer::with_defaults(Arc::new(EchoSynthesizer::new()));

        let err = pool
            .synthesize(chunks(&["slow-a", "fail-b", "c"]))
            .await
            .unwrap_err();
        match err {
            SynthesisError::Chunk { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, SynthesisError::Backend { status: 500, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_message_names_chunk() {
        let pool = ChunkSynthesizer::with_defaults(Arc::new(EchoSynthesizer::new()));
        let err = pool.synthesize(chunks(&["fail"])).await.unwrap_err();
        assert!(err.to_string().starts_with("error processing chunk 0"));
    }
}
