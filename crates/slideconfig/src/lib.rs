use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Order in which the slideshow walks its source directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSetting {
    #[default]
    Sequential,
    Shuffle,
}

/// Top-level slideshow configuration, loadable from a TOML file.
///
/// Durations accept either plain seconds (`slide_interval = 10`) or
/// humantime strings (`slide_interval = "10s"`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SlideConfig {
    /// Directory scanned for slideshow images.
    pub source_dir: PathBuf,
    /// Time each slide stays on screen before the next acquisition.
    #[serde(
        default = "default_slide_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub slide_interval: Duration,
    /// Wall-clock duration of the crossfade between consecutive slides.
    #[serde(
        default = "default_crossfade",
        deserialize_with = "deserialize_duration"
    )]
    pub crossfade: Duration,
    /// Presented frame-rate cap.
    #[serde(default = "default_fps")]
    pub fps: f32,
    #[serde(default)]
    pub selection: SelectionSetting,
}

fn default_slide_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_crossfade() -> Duration {
    Duration::from_secs(1)
}

fn default_fps() -> f32 {
    60.0
}

impl SlideConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SlideConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("source_dir must not be empty".into()));
        }

        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "fps must be a positive number, got {}",
                self.fps
            )));
        }

        if self.slide_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "slide_interval must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}
