//! Speech-to-text adapter

use async_trait::async_trait;

use crate::{Error, Result};

/// Outcome of a transcription call
///
/// "No speech detected" is an ordinary value, distinct from a hard
/// adapter failure: silence or noise in a recording is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// Recognized speech
    Text(String),
    /// The recording contained no usable speech
    NoSpeech,
}

impl Transcript {
    /// Classify raw adapter output: whitespace-only text means no speech
    #[must_use]
    pub fn from_raw(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::NoSpeech
        } else {
            Self::Text(trimmed.to_string())
        }
    }
}

/// Capability boundary around an external speech-to-text service
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Convert encoded audio bytes to text
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transcription`] when the service is unavailable
    /// (network, auth, quota). Silence is signalled via
    /// [`Transcript::NoSpeech`], never as an error.
    async fn transcribe(&self, audio: &[u8]) -> Result<Transcript>;
}

/// Response from the Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes speech via the OpenAI Whisper API
#[derive(Debug)]
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl SpeechToText {
    /// Create a new Whisper STT instance
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for transcription".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl Transcriber for SpeechToText {
    async fn transcribe(&self, audio: &[u8]) -> Result<Transcript> {
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Transcription(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                Error::Transcription(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Transcription(format!(
                "Whisper API error {status}: {body}"
            )));
        }

        let result: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(e.to_string()))?;

        let transcript = Transcript::from_raw(&result.text);
        match &transcript {
            Transcript::Text(text) => tracing::info!(transcript = %text, "transcription complete"),
            Transcript::NoSpeech => tracing::debug!("no speech detected"),
        }

        Ok(transcript)
    }
}
