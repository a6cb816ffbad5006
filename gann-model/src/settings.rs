//! Per-invocation model settings

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lowest temperature accepted by the invoker
pub const MIN_TEMPERATURE: f32 = 0.0;
/// Highest temperature accepted by the invoker
pub const MAX_TEMPERATURE: f32 = 2.0;

/// The numeric knobs controlling a single model invocation.
///
/// Settings are plain values: a round never mutates the settings it ran
/// with, it derives new ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub temperature: f32,
    pub max_output_size: usize,
    pub timeout_ms: u64,
}

impl Settings {
    pub const fn new(temperature: f32, max_output_size: usize, timeout_ms: u64) -> Self {
        Self {
            temperature,
            max_output_size,
            timeout_ms,
        }
    }

    /// Apply a partial override; absent fields keep `self`'s values
    pub fn merge(&self, overrides: &SettingsOverride) -> Settings {
        Settings {
            temperature: overrides.temperature.unwrap_or(self.temperature),
            max_output_size: overrides.max_output_size.unwrap_or(self.max_output_size),
            timeout_ms: overrides.timeout_ms.unwrap_or(self.timeout_ms),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(Error::config_invalid(format!(
                "temperature {} outside [{}, {}]",
                self.temperature, MIN_TEMPERATURE, MAX_TEMPERATURE
            ))
            .with_operation("settings::validate")
            .with_context("temperature", self.temperature.to_string()));
        }
        if self.max_output_size == 0 {
            return Err(Error::config_invalid("max output size must be positive")
                .with_operation("settings::validate"));
        }
        if self.timeout_ms == 0 {
            return Err(Error::config_invalid("timeout must be positive")
                .with_operation("settings::validate"));
        }
        Ok(())
    }
}

/// A partial [`Settings`] value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl SettingsOverride {
    pub fn temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.max_output_size.is_none() && self.timeout_ms.is_none()
    }
}

impl From<Settings> for SettingsOverride {
    fn from(settings: Settings) -> Self {
        Self {
            temperature: Some(settings.temperature),
            max_output_size: Some(settings.max_output_size),
            timeout_ms: Some(settings.timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const DEFAULTS: Settings = Settings::new(0.7, 1024, 30_000);

    #[test]
    fn test_merge_temperature_only() {
        let merged = DEFAULTS.merge(&SettingsOverride::temperature(0.3));
        assert_eq!(merged, Settings::new(0.3, 1024, 30_000));
    }

    #[test]
    fn test_merge_empty_keeps_defaults() {
        let merged = DEFAULTS.merge(&SettingsOverride::default());
        assert_eq!(merged, DEFAULTS);
        assert!(SettingsOverride::default().is_empty());
    }

    #[test]
    fn test_merge_full_override() {
        let other = Settings::new(1.1, 256, 5_000);
        assert_eq!(DEFAULTS.merge(&other.into()), other);
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let err = DEFAULTS.with_temperature(2.5).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.context_value("temperature"), Some("2.5"));

        assert!(DEFAULTS.with_temperature(-0.1).validate().is_err());
        assert!(DEFAULTS.with_temperature(0.0).validate().is_ok());
        assert!(DEFAULTS.with_temperature(2.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        assert!(Settings::new(0.7, 0, 30_000).validate().is_err());
        assert!(Settings::new(0.7, 1024, 0).validate().is_err());
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let json = serde_json::to_value(DEFAULTS).unwrap();
        assert_eq!(json["maxOutputSize"], 1024);
        assert_eq!(json["timeoutMs"], 30_000);
    }
}
