//! Speech backend speaking the OpenAI `audio/speech` protocol.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::error::SynthesisError;
use super::SpeechSynthesizer;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/speech";

/// Maximum length for error bodies carried into job messages and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Long articles take a while to narrate, even per chunk.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn truncate_error_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
        Some((cut, _)) => format!("{}... (truncated)", &body[..cut]),
        None => body.to_string(),
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
}

pub struct OpenAiSynthesizer {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
    voice: String,
}

impl OpenAiSynthesizer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SynthesisError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            voice: voice.into(),
        })
    }

    /// Builds a synthesizer from the `synthesis` section of the config.
    pub fn from_config(
        config: &crate::config::SynthesisConfig,
        api_key: SecretString,
    ) -> Result<Self, SynthesisError> {
        Self::new(
            config.endpoint.clone(),
            api_key,
            config.model.clone(),
            config.voice.clone(),
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        debug!("Requesting speech for {} characters", text.chars().count());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&SpeechRequest {
                model: &self.model,
                input: text,
                voice: &self.voice,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Backend {
                status: status.as_u16(),
                body: truncate_error_body(&body),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
