//! Error types for the agrivoice pipeline

use thiserror::Error;

/// Result type alias for agrivoice operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the agrivoice pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text adapter unavailable or rejected the call
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Answer adapter unavailable or rejected the call
    #[error("answer error: {0}")]
    Answer(String),

    /// Text-to-speech adapter unavailable or rejected the call
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// True when an external adapter (STT, chat, TTS) failed — network,
    /// authentication, or quota trouble rather than a local fault.
    ///
    /// Adapter failures are non-fatal to the session: the conversation
    /// store remains resumable and the next pass may retry naturally.
    #[must_use]
    pub const fn is_adapter_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Transcription(_) | Self::Answer(_) | Self::Synthesis(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_failures_are_classified() {
        assert!(Error::Transcription("down".into()).is_adapter_unavailable());
        assert!(Error::Answer("quota".into()).is_adapter_unavailable());
        assert!(Error::Synthesis("auth".into()).is_adapter_unavailable());
        assert!(!Error::Config("missing key".into()).is_adapter_unavailable());
        assert!(!Error::Audio("no device".into()).is_adapter_unavailable());
    }
}
