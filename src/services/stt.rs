//! Speech-to-text service boundary. The engine only sees the narrow
//! `Transcriber` seam; the HTTP client posts the recorded WAV and a
//! language hint and reads back `{ "text": ... }`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::multipart;
use serde::Deserialize;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SttError {
    #[error("speech recognition unavailable")]
    Unsupported,
    #[error("transcription request failed: {0}")]
    Failed(String),
}

pub type TranscribeFuture = Pin<Box<dyn Future<Output = Result<String, SttError>> + Send>>;

pub trait Transcriber: Send + Sync {
    fn transcribe(&self, wav: Vec<u8>, lang: &str) -> TranscribeFuture;
}

#[derive(Deserialize)]
struct SttResponse {
    #[serde(default)]
    text: String,
}

#[derive(Clone)]
pub struct SttClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SttClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }
}

impl Transcriber for SttClient {
    fn transcribe(&self, wav: Vec<u8>, lang: &str) -> TranscribeFuture {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let lang = lang.to_string();

        Box::pin(async move {
            let part = multipart::Part::bytes(wav)
                .file_name("speech.wav")
                .mime_str("audio/wav")
                .map_err(|e| SttError::Failed(e.to_string()))?;
            let form = multipart::Form::new().part("audio", part).text("lang", lang);

            let response = client
                .post(&endpoint)
                .multipart(form)
                .send()
                .await
                .map_err(|e| SttError::Failed(e.to_string()))?;

            if !response.status().is_success() {
                return Err(SttError::Failed(format!("status {}", response.status())));
            }

            let body: SttResponse = response
                .json()
                .await
                .map_err(|e| SttError::Failed(e.to_string()))?;
            Ok(body.text)
        })
    }
}

/// Stand-in when no STT endpoint is configured: reports `Unsupported` so
/// the engine can degrade to empty recognized text.
pub struct UnsupportedTranscriber;

impl Transcriber for UnsupportedTranscriber {
    fn transcribe(&self, _wav: Vec<u8>, _lang: &str) -> TranscribeFuture {
        Box::pin(async { Err(SttError::Unsupported) })
    }
}
