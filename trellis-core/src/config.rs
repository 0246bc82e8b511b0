//! Framework settings.
//!
//! Settings come from a TOML file and can be overridden by `TRELLIS_*`
//! environment variables:
//!
//! ```toml
//! oob_swap = "outerHTML"
//! consume_by_default = true
//!
//! [element]
//! tag = "div"
//! hx_target = "this"
//! hx_swap = "outerHTML"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use crate::logging::{LogFormat, LogLevel};
use crate::Error;
use serde::Deserialize;
use std::path::Path;

pub const ENV_PREFIX: &str = "TRELLIS_";

/// Defaults for element containers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ElementSettings {
    pub tag: String,
    pub hx_target: String,
    pub hx_swap: String,
}

impl Default for ElementSettings {
    fn default() -> Self {
        Self {
            tag: "div".to_string(),
            hx_target: "this".to_string(),
            hx_swap: "outerHTML".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Filter directive such as `trellis_core=debug`; overrides `level`
    pub filter: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            filter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub element: ElementSettings,
    /// Swap mode used by [`RequestContext::swap_oob`](crate::RequestContext::swap_oob)
    pub oob_swap: String,
    /// Header naming the field a validation request is about
    pub validate_field_header: String,
    /// Whether request parameters are consumed unless a parameter says
    /// otherwise
    pub consume_by_default: bool,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            element: ElementSettings::default(),
            oob_swap: "outerHTML".to_string(),
            validate_field_header: "X-Trellis-Validate-Field".to_string(),
            consume_by_default: true,
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Read settings from a TOML file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut settings = Self::from_toml_str(&content)?;
        settings.apply_env(std::env::vars())?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, Error> {
        let mut settings = Self::default();
        settings.apply_env(std::env::vars())?;
        Ok(settings)
    }

    /// Apply `TRELLIS_*` overrides from `vars`; unknown keys are ignored
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.into();
            match name.to_ascii_lowercase().as_str() {
                "element_tag" => self.element.tag = value,
                "element_hx_target" => self.element.hx_target = value,
                "element_hx_swap" => self.element.hx_swap = value,
                "oob_swap" => self.oob_swap = value,
                "validate_field_header" => self.validate_field_header = value,
                "consume_by_default" => {
                    self.consume_by_default = value.parse().map_err(|_| {
                        Error::Config(format!("TRELLIS_CONSUME_BY_DEFAULT must be a bool, got '{}'", value))
                    })?
                }
                "log_level" => {
                    self.logging.level = LogLevel::from_str(&value)
                        .ok_or_else(|| Error::Config(format!("Unknown log level '{}'", value)))?
                }
                "log_format" => {
                    self.logging.format = LogFormat::from_str(&value)
                        .ok_or_else(|| Error::Config(format!("Unknown log format '{}'", value)))?
                }
                "log_filter" => self.logging.filter = Some(value),
                other => tracing::trace!(key = other, "Ignoring unknown settings override"),
            }
        }
        Ok(())
    }
}
