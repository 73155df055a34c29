//! Configuration structures for the parsing engine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{InvexError, Result};

/// Per-call parse options. This is a closed configuration: callers cannot
/// extend the pipeline, only steer it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParseOptions {
    /// Bypass vendor detection and force the named vendor's parser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_hint: Option<String>,

    /// Run only the vendor-specific parser, with no generic fallbacks.
    pub strict: bool,

    /// Allow aggressive garbage-line removal when text quality is poor.
    pub aggressive_clean: bool,

    /// Include the debug block in the result.
    pub debug: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            vendor_hint: None,
            strict: false,
            aggressive_clean: true,
            debug: false,
        }
    }
}

/// Process-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Path to the advisory pattern store. Absent disables the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_store_path: Option<PathBuf>,

    /// Default parse options applied when the caller passes none.
    pub defaults: ParseOptions,
}

impl EngineConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| InvexError::Config(e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| InvexError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ParseOptions::default();
        assert!(opts.aggressive_clean);
        assert!(!opts.strict);
        assert!(!opts.debug);
        assert!(opts.vendor_hint.is_none());
    }

    #[test]
    fn test_options_deserialize_partial() {
        let opts: ParseOptions = serde_json::from_str(r#"{"strict": true}"#).unwrap();
        assert!(opts.strict);
        // Unspecified fields keep their defaults.
        assert!(opts.aggressive_clean);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");

        let mut config = EngineConfig::default();
        config.pattern_store_path = Some(dir.path().join("patterns.json"));
        config.save(&path).unwrap();

        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded.pattern_store_path, config.pattern_store_path);
    }
}
