//! Configuration for geoflow streams
//!
//! The only tunable inputs are where member values live and whether every
//! emitted snapshot is logged. Values layer as: defaults, then a TOML file,
//! then `GEOFLOW_*` environment variables.

use crate::errors::{GeoflowError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding [`GeoflowConfig::value_prefix`]
pub const ENV_VALUE_PREFIX: &str = "GEOFLOW_VALUE_PREFIX";
/// Environment variable overriding [`GeoflowConfig::trace_snapshots`]
pub const ENV_TRACE_SNAPSHOTS: &str = "GEOFLOW_TRACE_SNAPSHOTS";

/// Stream configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeoflowConfig {
    /// Path prefix for member values; a member's address is `"{prefix}/{key}"`
    pub value_prefix: Option<String>,
    /// Log every emitted snapshot at `trace` level
    pub trace_snapshots: bool,
}

impl GeoflowConfig {
    /// Config with a value prefix and defaults otherwise.
    pub fn with_value_prefix(prefix: impl Into<String>) -> Self {
        Self {
            value_prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GeoflowError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `GEOFLOW_*` overrides from the process environment.
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `GEOFLOW_*` overrides from an explicit variable list.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                ENV_VALUE_PREFIX => {
                    tracing::debug!(prefix = value, "value prefix overridden from environment");
                    self.value_prefix = (!value.is_empty()).then(|| value.to_owned());
                }
                ENV_TRACE_SNAPSHOTS => {
                    self.trace_snapshots = parse_bool(value).ok_or_else(|| {
                        GeoflowError::config(format!(
                            "{ENV_TRACE_SNAPSHOTS} must be a boolean, got {value:?}"
                        ))
                    })?;
                }
                _ => {}
            }
        }
        self.validate()
    }

    /// Check the value prefix is a usable path.
    pub fn validate(&self) -> Result<()> {
        let Some(prefix) = &self.value_prefix else {
            return Ok(());
        };
        if prefix.is_empty() {
            return Err(GeoflowError::config("value_prefix must not be empty"));
        }
        if prefix.ends_with('/') {
            return Err(GeoflowError::config(format!(
                "value_prefix must not end with '/': {prefix:?}"
            )));
        }
        if prefix.split('/').skip(1).any(str::is_empty) {
            return Err(GeoflowError::config(format!(
                "value_prefix contains an empty segment: {prefix:?}"
            )));
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GeoflowConfig::default();
        assert_eq!(config.value_prefix, None);
        assert!(!config.trace_snapshots);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = GeoflowConfig::from_toml_str(
            r#"
            value_prefix = "profiles/public"
            trace_snapshots = true
            "#,
        )
        .unwrap();
        assert_eq!(config.value_prefix.as_deref(), Some("profiles/public"));
        assert!(config.trace_snapshots);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = GeoflowConfig::from_toml_str("radius = 3");
        assert!(matches!(result, Err(GeoflowError::Config { .. })));
    }

    #[test]
    fn test_invalid_prefixes() {
        for prefix in ["", "users/", "a//b"] {
            let config = GeoflowConfig::with_value_prefix(prefix);
            assert!(config.validate().is_err(), "{prefix:?} should be rejected");
        }
        // A leading slash addresses the database root.
        assert!(GeoflowConfig::with_value_prefix("/users").validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GeoflowConfig::default();
        config
            .merge_with_vars([
                (ENV_VALUE_PREFIX, "drivers"),
                (ENV_TRACE_SNAPSHOTS, "yes"),
                ("UNRELATED", "x"),
            ])
            .unwrap();
        assert_eq!(config.value_prefix.as_deref(), Some("drivers"));
        assert!(config.trace_snapshots);

        let result = config.merge_with_vars([(ENV_TRACE_SNAPSHOTS, "maybe")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "value_prefix = \"riders\"").unwrap();

        let config = GeoflowConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.value_prefix.as_deref(), Some("riders"));
    }
}
