//! Client configuration
//!
//! Read from a JSON file. Every field has a default, so a partial file (or
//! no file at all) is valid.

pub mod preferences;

pub use preferences::{CameraSetting, CameraSettings, TrainingPreferences};

use crate::session::state::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable pointing at the config file
pub const CONFIG_PATH_ENV: &str = "FORM_COACH_CONFIG";

/// Environment variable overriding the service URL
pub const SERVER_URL_ENV: &str = "FORM_COACH_SERVER_URL";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Streaming service endpoint
    pub server_url: String,
    pub tone: ToneConfig,
    pub speech: SpeechConfig,
    pub phrases: Phrases,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".to_string(),
            tone: ToneConfig::default(),
            speech: SpeechConfig::default(),
            phrases: Phrases::default(),
        }
    }
}

impl ClientConfig {
    /// Read configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded client config from {:?}", path);
        Ok(config)
    }

    /// Load from `FORM_COACH_CONFIG` if set, then apply `FORM_COACH_SERVER_URL`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            config.server_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Write configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::Invalid("serverUrl must not be empty".to_string()));
        }
        if self.tone.duration_ms == 0 {
            return Err(ConfigError::Invalid("tone.durationMs must be positive".to_string()));
        }
        if self.speech.words_per_minute == 0 {
            return Err(ConfigError::Invalid(
                "speech.wordsPerMinute must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rep tone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToneConfig {
    pub frequency_hz: u32,
    pub duration_ms: u64,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 800,
            duration_ms: 100,
        }
    }
}

impl ToneConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Speech output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeechConfig {
    /// External text-to-speech program. Speech is only logged when unset.
    pub program: Option<String>,
    /// Program arguments, `{text}` is replaced by the phrase
    pub args: Vec<String>,
    /// Pacing used to estimate how long a phrase takes
    pub words_per_minute: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            words_per_minute: 160,
        }
    }
}

impl SpeechConfig {
    /// Rough spoken length of `text`, never shorter than 300ms
    pub fn estimate_duration(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count().max(1) as u64;
        let ms = words * 60_000 / u64::from(self.words_per_minute.max(1));
        Duration::from_millis(ms.max(300))
    }
}

/// Spoken phrases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Phrases {
    /// Service is ready and waiting for the user
    pub waiting: String,
    pub calibration_start: String,
    pub calibration_complete: String,
    pub training_complete: String,
    /// Overrides for form error names, keyed by wire identifier
    pub errors: HashMap<String, String>,
}

impl Default for Phrases {
    fn default() -> Self {
        Self {
            waiting: "Say start or press the button".to_string(),
            calibration_start: "Starting calibration".to_string(),
            calibration_complete: "Calibration complete, starting training".to_string(),
            training_complete: "Training complete".to_string(),
            errors: HashMap::new(),
        }
    }
}

impl Phrases {
    /// Spoken name of a form error
    pub fn error_name(&self, kind: &ErrorKind) -> String {
        self.errors
            .get(kind.as_str())
            .cloned()
            .unwrap_or_else(|| kind.default_phrase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client.json");
        fs::write(
            &path,
            r#"{ "serverUrl": "http://coach.local:5000", "tone": { "frequencyHz": 880 } }"#,
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.server_url, "http://coach.local:5000");
        assert_eq!(config.tone.frequency_hz, 880);
        assert_eq!(config.tone.duration_ms, 100);
        assert_eq!(config.phrases, Phrases::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client.json");

        let mut config = ClientConfig::default();
        config.speech.program = Some("espeak-ng".to_string());
        config
            .phrases
            .errors
            .insert("trunk_tilted".to_string(), "Trzymaj plecy prosto".to_string());
        config.save(&path).unwrap();

        assert_eq!(ClientConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client.json");
        fs::write(&path, r#"{ "serverUrl": "  " }"#).unwrap();

        assert!(matches!(
            ClientConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_error_name_override() {
        let mut phrases = Phrases::default();
        phrases
            .errors
            .insert("trunk_tilted".to_string(), "Back straight!".to_string());

        assert_eq!(phrases.error_name(&ErrorKind::TrunkTilted), "Back straight!");
        assert_eq!(
            phrases.error_name(&ErrorKind::ElbowsTooWide),
            "Keep your elbows forward"
        );
    }

    #[test]
    fn test_speech_duration_estimate() {
        let speech = SpeechConfig::default();
        assert_eq!(speech.estimate_duration("go"), Duration::from_millis(375));
        assert_eq!(speech.estimate_duration(""), Duration::from_millis(375));
        assert_eq!(
            speech.estimate_duration("keep your back straight please now"),
            Duration::from_millis(2250)
        );
    }
}
