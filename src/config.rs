//! Configuration for the agrivoice assistant

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Default system prompt given to the answer model
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an experienced agricultural \
consultant with deep expertise in sustainable farming practices, crop \
management, and livestock care across diverse regions and climates. Provide \
practical, actionable advice that accounts for soil types, rainfall patterns, \
growing seasons, farm sizes, and resource levels. Explain the reasoning behind \
recommendations, include seasonal timing and cost-effective alternatives, and \
tailor your language to farmers with varying levels of experience.";

/// Default greeting shown (and spoken) at the start of a session
pub const DEFAULT_GREETING: &str = "Hi! How may I assist you today?";

/// Agrivoice configuration
///
/// Loaded from a TOML file with every field optional; the OpenAI API
/// key comes from the `OPENAI_API_KEY` environment variable and always
/// wins over the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// OpenAI API key (env: `OPENAI_API_KEY`)
    pub openai_api_key: String,

    /// System prompt seeding every conversation
    pub system_prompt: String,

    /// Assistant greeting for a fresh session
    pub greeting: String,

    /// Speech-to-text settings
    pub stt: SttConfig,

    /// Answer model settings
    pub llm: LlmConfig,

    /// Text-to-speech settings
    pub tts: TtsConfig,

    /// Clear the dedup fingerprint on audio-less passes
    /// (see `DedupPolicy::ResetOnIdle`)
    pub dedup_reset_on_idle: bool,
}

/// Speech-to-text settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SttConfig {
    /// Transcription model (e.g. "whisper-1")
    pub model: String,
}

/// Answer model settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// Chat model identifier
    pub model: String,

    /// Max tokens per completion; `None` leaves it to the API default
    pub max_tokens: Option<u32>,
}

/// Text-to-speech settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TtsConfig {
    /// TTS model (e.g. "tts-1")
    pub model: String,

    /// Voice identity; fixed per session, never a runtime parameter
    pub voice: String,

    /// Speed multiplier (0.25 to 4.0)
    pub speed: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            stt: SttConfig::default(),
            llm: LlmConfig::default(),
            tts: TtsConfig::default(),
            dedup_reset_on_idle: false,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: None,
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            model: "tts-1".to_string(),
            voice: "nova".to_string(),
            speed: 1.0,
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// Reads the TOML file at `path` (or the default location when
    /// `None`; a missing default file just yields defaults), then
    /// applies the `OPENAI_API_KEY` env override and validates.
    ///
    /// # Errors
    ///
    /// Returns error if the file is malformed or validation fails
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                config.openai_api_key = key;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Default config file location (`<config dir>/agrivoice/config.toml`)
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "agrivoice")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check the configuration for unusable values
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the TTS speed is out
    /// of the supported range
    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.is_empty() {
            return Err(Error::Config(
                "OPENAI_API_KEY is not set (env var or openai_api_key in config)".to_string(),
            ));
        }
        if !(0.25..=4.0).contains(&self.tts.speed) {
            return Err(Error::Config(format!(
                "tts.speed must be between 0.25 and 4.0, got {}",
                self.tts.speed
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_stock_models() {
        let config = Config::default();
        assert_eq!(config.stt.model, "whisper-1");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.tts.model, "tts-1");
        assert_eq!(config.tts.voice, "nova");
        assert!((config.tts.speed - 1.0).abs() < f32::EPSILON);
        assert!(!config.dedup_reset_on_idle);
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let config: Config = toml::from_str(
            r#"
            greeting = "Welcome back!"
            dedup_reset_on_idle = true

            [llm]
            model = "gpt-4o-mini"
            max_tokens = 512

            [tts]
            voice = "alloy"
            "#,
        )
        .unwrap();

        assert_eq!(config.greeting, "Welcome back!");
        assert!(config.dedup_reset_on_idle);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, Some(512));
        assert_eq!(config.tts.voice, "alloy");
        // Untouched sections keep their defaults
        assert_eq!(config.stt.model, "whisper-1");
    }

    #[test]
    fn validate_rejects_missing_api_key() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate_rejects_out_of_range_speed() {
        let config = Config {
            openai_api_key: "sk-test".to_string(),
            tts: TtsConfig {
                speed: 9.0,
                ..TtsConfig::default()
            },
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("no_such_field = 1");
        assert!(result.is_err());
    }
}
