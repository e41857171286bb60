//! Configuration for building schema documents.
//!
//! `SchemaConfig` centralizes the model-wide defaults written into every
//! dumped schema document and the step naming scheme used when partitions
//! render their step chains.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error_codes;
use crate::step_chain::StepNumbering;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub compatibility_level: u32,
    pub culture: String,
    pub source_query_culture: String,
    #[serde(alias = "data_source_version")]
    pub default_data_source_version: String,
    pub desktop_version: String,
    pub step_numbering: StepNumbering,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            compatibility_level: 1550,
            culture: "en-US".to_string(),
            source_query_culture: "en-US".to_string(),
            default_data_source_version: "powerBI_V3".to_string(),
            desktop_version: "2.115.842.0".to_string(),
            step_numbering: StepNumbering::Sequential,
        }
    }
}

impl SchemaConfig {
    /// Step names numbered the way earlier generated templates were, for
    /// byte-compatible output.
    pub fn legacy_compatible() -> Self {
        Self {
            step_numbering: StepNumbering::Legacy,
            ..Default::default()
        }
    }

    pub fn builder() -> SchemaConfigBuilder {
        SchemaConfigBuilder {
            inner: SchemaConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compatibility_level == 0 {
            return Err(ConfigError::ZeroCompatibilityLevel);
        }
        ensure_non_empty(&self.culture, "culture")?;
        ensure_non_empty(&self.source_query_culture, "source_query_culture")?;
        ensure_non_empty(
            &self.default_data_source_version,
            "default_data_source_version",
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("[PBIT_CONFIG_001] compatibility_level must be greater than zero")]
    ZeroCompatibilityLevel,
    #[error("[PBIT_CONFIG_001] {field} must not be empty")]
    EmptyField { field: &'static str },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        error_codes::CONFIG_INVALID
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyField { field });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SchemaConfigBuilder {
    inner: SchemaConfig,
}

impl Default for SchemaConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaConfigBuilder {
    pub fn new() -> Self {
        SchemaConfig::builder()
    }

    pub fn compatibility_level(mut self, value: u32) -> Self {
        self.inner.compatibility_level = value;
        self
    }

    pub fn culture(mut self, value: impl Into<String>) -> Self {
        self.inner.culture = value.into();
        self
    }

    pub fn source_query_culture(mut self, value: impl Into<String>) -> Self {
        self.inner.source_query_culture = value.into();
        self
    }

    pub fn default_data_source_version(mut self, value: impl Into<String>) -> Self {
        self.inner.default_data_source_version = value.into();
        self
    }

    pub fn desktop_version(mut self, value: impl Into<String>) -> Self {
        self.inner.desktop_version = value.into();
        self
    }

    pub fn step_numbering(mut self, value: StepNumbering) -> Self {
        self.inner.step_numbering = value;
        self
    }

    pub fn build(self) -> Result<SchemaConfig, ConfigError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_desktop_template() {
        let cfg = SchemaConfig::default();
        assert_eq!(cfg.compatibility_level, 1550);
        assert_eq!(cfg.culture, "en-US");
        assert_eq!(cfg.default_data_source_version, "powerBI_V3");
        assert_eq!(cfg.step_numbering, StepNumbering::Sequential);
    }

    #[test]
    fn serde_roundtrip_preserves_defaults() {
        let cfg = SchemaConfig::default();
        let json = serde_json::to_string(&cfg).expect("serialize default config");
        let parsed: SchemaConfig = serde_json::from_str(&json).expect("deserialize default config");
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn serde_fills_missing_fields_and_accepts_aliases() {
        let json = r#"{
            "data_source_version": "powerBI_V2",
            "step_numbering": "legacy"
        }"#;
        let cfg: SchemaConfig = serde_json::from_str(json).expect("deserialize with aliases");
        assert_eq!(cfg.default_data_source_version, "powerBI_V2");
        assert_eq!(cfg.step_numbering, StepNumbering::Legacy);
        assert_eq!(cfg.culture, "en-US");
    }

    #[test]
    fn builder_rejects_empty_culture() {
        let err = SchemaConfig::builder()
            .culture("  ")
            .build()
            .expect_err("builder should reject an empty culture");
        assert!(matches!(err, ConfigError::EmptyField { field } if field == "culture"));
    }

    #[test]
    fn builder_rejects_zero_compatibility_level() {
        let err = SchemaConfig::builder()
            .compatibility_level(0)
            .build()
            .expect_err("zero level");
        assert_eq!(err, ConfigError::ZeroCompatibilityLevel);
        assert_eq!(err.code(), "PBIT_CONFIG_001");
    }

    #[test]
    fn legacy_preset_only_changes_numbering() {
        let legacy = SchemaConfig::legacy_compatible();
        assert_eq!(legacy.step_numbering, StepNumbering::Legacy);
        assert_eq!(
            SchemaConfig {
                step_numbering: StepNumbering::Sequential,
                ..legacy
            },
            SchemaConfig::default()
        );
    }
}
