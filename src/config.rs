// config.rs

use config::{Environment, File};
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const BEATS_PER_BAR: u32 = 4;
pub const BARS_PER_PHRASE: u32 = 4;

/// Length of the phrase in decimal units (one unit per bar).
pub const PHRASE_LENGTH: f64 = BARS_PER_PHRASE as f64;
/// One beat expressed in decimal units.
pub const BEAT_FRACTION: f64 = 1.0 / BEATS_PER_BAR as f64;
/// Slack allowed when comparing decimal positions.
pub const POSITION_TOLERANCE: f64 = 1e-9;

pub const DEFAULT_TEMPO: f64 = 120.0;
pub const DEFAULT_LOOKAHEAD_RANGE: f64 = 0.1;
pub const DEFAULT_REFRESH_RATE_MS: u64 = 25;
pub const DEFAULT_MAX_CATCH_UP_BEATS: u32 = 16;

pub const DEFAULT_NOTE_LENGTH: f64 = 0.25;
pub const DEFAULT_VELOCITY: u8 = 100;

pub const DEFAULT_CONFIG_FILE: &str = "lookaheadrs.toml";
pub const ENV_PREFIX: &str = "LOOKAHEAD";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LookaheadConfig {
    /// Horizon ahead of "now", in seconds, inside which beats are scheduled.
    pub range: f64,
    /// Delay between loop firings, in milliseconds.
    pub refresh_rate: u64,
    /// Upper bound on beats scheduled by a single firing when the loop has fallen behind.
    pub max_catch_up_beats: u32,
}

impl Default for LookaheadConfig {
    fn default() -> Self {
        LookaheadConfig {
            range: DEFAULT_LOOKAHEAD_RANGE,
            refresh_rate: DEFAULT_REFRESH_RATE_MS,
            max_catch_up_beats: DEFAULT_MAX_CATCH_UP_BEATS,
        }
    }
}

impl LookaheadConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_rate)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(SettingsError::Invalid {
                key: "lookahead.range",
                reason: format!("must be a positive number of seconds, got {}", self.range),
            });
        }
        if self.refresh_rate == 0 {
            return Err(SettingsError::Invalid {
                key: "lookahead.refresh_rate",
                reason: "must be at least 1 ms".to_string(),
            });
        }
        if self.max_catch_up_beats == 0 {
            return Err(SettingsError::Invalid {
                key: "lookahead.max_catch_up_beats",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Runtime settings for the player binary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tempo: f64,
    pub lookahead: LookaheadConfig,
    pub midi_output: Option<String>,
    pub instruments: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tempo: DEFAULT_TEMPO,
            lookahead: LookaheadConfig::default(),
            midi_output: None,
            instruments: vec!["acoustic_grand_piano".to_string()],
        }
    }
}

impl Settings {
    /// Layers the optional settings file and `LOOKAHEAD_*` environment
    /// variables over the defaults. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = path
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
        debug!("Loading settings from file: {}", file);

        let settings: Settings = config::Config::builder()
            .add_source(File::with_name(&file).required(path.is_some()))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        info!(
            "Settings loaded: tempo={} BPM, lookahead={:?}",
            settings.tempo, settings.lookahead
        );
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.tempo.is_finite() && self.tempo > 0.0) {
            return Err(SettingsError::Invalid {
                key: "tempo",
                reason: format!("must be a positive BPM, got {}", self.tempo),
            });
        }
        self.lookahead.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_constants() {
        let settings = Settings::default();
        assert_eq!(settings.tempo, DEFAULT_TEMPO);
        assert_eq!(settings.lookahead.range, 0.1);
        assert_eq!(settings.lookahead.refresh_rate, 25);
        assert_eq!(
            settings.lookahead.refresh_interval(),
            Duration::from_millis(25)
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "tempo = 90.0\ninstruments = [\"marimba\"]\n\n[lookahead]\nrange = 0.2"
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.tempo, 90.0);
        assert_eq!(settings.instruments, vec!["marimba".to_string()]);
        assert_eq!(settings.lookahead.range, 0.2);
        // Keys absent from the file keep their defaults
        assert_eq!(settings.lookahead.refresh_rate, DEFAULT_REFRESH_RATE_MS);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/lookaheadrs-settings.toml")));
        assert!(matches!(result, Err(SettingsError::Load(_))));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut settings = Settings {
            tempo: 0.0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        settings.tempo = 120.0;
        settings.lookahead.refresh_rate = 0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid {
                key: "lookahead.refresh_rate",
                ..
            })
        ));

        settings.lookahead.refresh_rate = 25;
        settings.lookahead.max_catch_up_beats = 0;
        assert!(settings.validate().is_err());
    }
}
