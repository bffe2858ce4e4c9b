//! Tracking configuration
//!
//! Loaded from TOML. Every field has a default, so an absent file or an
//! empty document yields `TrackingConfig::default()`.
//!
//! ```toml
//! strict_cascade = true
//! log_profile = "production"
//! max_walk_visits = 10000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TrackingError};
use crate::logging_facility::{self, Profile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrackingConfig {
    /// Treat an inconsistent delete cascade as an error instead of a warning
    pub strict_cascade: bool,
    /// Logging profile used by `logging_facility::init`
    pub log_profile: Profile,
    /// Visit budget for graph walks; None means "graph size"
    pub max_walk_visits: Option<usize>,
}

impl TrackingConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the document is not valid TOML or has
    /// fields of the wrong type.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TrackingConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, falling back to defaults when it does not exist
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| TrackingError::InvalidConfig {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Install the global subscriber for `log_profile`
    pub fn init_logging(&self) {
        logging_facility::init(self.log_profile);
    }

    fn validate(&self) -> Result<()> {
        if self.max_walk_visits == Some(0) {
            return Err(TrackingError::InvalidConfig {
                reason: "max_walk_visits must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = TrackingConfig::from_toml_str("").unwrap();
        assert_eq!(config, TrackingConfig::default());
        assert!(!config.strict_cascade);
        assert_eq!(config.log_profile, Profile::Development);
    }

    #[test]
    fn test_parse_all_fields() {
        let config = TrackingConfig::from_toml_str(
            r#"
            strict_cascade = true
            log_profile = "production"
            max_walk_visits = 500
            "#,
        )
        .unwrap();

        assert!(config.strict_cascade);
        assert_eq!(config.log_profile, Profile::Production);
        assert_eq!(config.max_walk_visits, Some(500));
    }

    #[test]
    fn test_invalid_toml() {
        let result = TrackingConfig::from_toml_str("strict_cascade = \"yes\"");
        assert!(matches!(result, Err(TrackingError::InvalidConfig { .. })));
    }

    #[test]
    fn test_zero_visit_budget_rejected() {
        let result = TrackingConfig::from_toml_str("max_walk_visits = 0");
        assert!(matches!(result, Err(TrackingError::InvalidConfig { .. })));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackingConfig::load(&dir.path().join("tracking.toml")).unwrap();
        assert_eq!(config, TrackingConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.toml");
        std::fs::write(&path, "strict_cascade = true\n").unwrap();

        let config = TrackingConfig::load(&path).unwrap();
        assert!(config.strict_cascade);
    }
}
