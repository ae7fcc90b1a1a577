//! Scripted stand-ins for the extraction engine, the speech backend and the
//! identity provider's key set.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use articast::auth::{AuthError, JwkSet, KeySetSource};
use articast::{ArticleExtractor, ExtractError, SpeechSynthesizer, SynthesisError};

/// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz frame header.
const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
const FRAME_LEN: usize = 417;

/// `count` silent frames, 1152 samples (~26.12 ms) each.
pub fn silent_mp3(count: usize) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_LEN];
    frame[..4].copy_from_slice(&FRAME_HEADER);
    frame.repeat(count)
}

pub const ARTICLE_TEXT: &str = "Rust makes systems programming approachable. \
    Ownership rules are checked at compile time. \
    Async code runs on executors such as Tokio. \
    Podcasts are a pleasant way to read the news.";

/// Extraction keyed off the URL: `fail` in the URL is a fetch error,
/// `empty` yields no text, anything else returns [`ARTICLE_TEXT`].
pub struct ScriptedExtractor {
    delay: Duration,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ArticleExtractor for ScriptedExtractor {
    async fn extract(&self, url: &str) -> Result<String, ExtractError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if url.contains("fail") {
            return Err(ExtractError::Fetch("404 Not Found".to_string()));
        }
        if url.contains("empty") {
            return Ok(String::new());
        }
        Ok(ARTICLE_TEXT.to_string())
    }
}

/// Returns `frames_per_chunk` silent frames for every request and keeps
/// track of how many requests overlapped.
pub struct SilentSynthesizer {
    frames_per_chunk: usize,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SilentSynthesizer {
    pub fn new(frames_per_chunk: usize, delay: Duration) -> Self {
        Self {
            frames_per_chunk,
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for SilentSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(silent_mp3(self.frames_per_chunk))
    }
}

/// Serves the key set in `tests/fixtures/jwks.json`.
pub struct FixtureKeySource {
    fetches: AtomicUsize,
}

impl FixtureKeySource {
    pub fn new() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySetSource for FixtureKeySource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        serde_json::from_str(include_str!("../fixtures/jwks.json"))
            .map_err(|e| AuthError::KeyFetch(e.to_string()))
    }
}
