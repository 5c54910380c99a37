use crate::error::{ExportError, Result};
use cloudpick_io::Encoding;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for an export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Extension, without the dot, that marks a display name as a source
    /// file. Also used for the output files.
    pub extension: String,
    /// Merge radius for displayed points; 0 merges exact duplicates only.
    pub tolerance: f64,
    /// Data encoding of the output files.
    pub encoding: Encoding,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            extension: "pcd".to_string(),
            tolerance: 0.0,
            encoding: Encoding::Binary,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty() || self.extension.starts_with('.') {
            return Err(ExportError::Config(format!(
                "extension must be non-empty and given without a dot, got {:?}",
                self.extension
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ExportError::Config(format!(
                "tolerance must be finite and >= 0, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// `<prefix><sequence>.<extension>`; the sequence starts at 1.
    pub fn output_path(&self, prefix: &str, sequence: usize) -> PathBuf {
        PathBuf::from(format!("{prefix}{sequence}.{}", self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.extension, "pcd");
        assert_eq!(config.tolerance, 0.0);
        assert_eq!(config.encoding, Encoding::Binary);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn output_naming() {
        let config = ExportConfig::default();
        assert_eq!(config.output_path("out/sel_", 1), PathBuf::from("out/sel_1.pcd"));
        assert_eq!(config.output_path("", 12), PathBuf::from("12.pcd"));
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = ExportConfig {
            tolerance: -0.5,
            ..ExportConfig::default()
        };
        assert!(matches!(config.validate(), Err(ExportError::Config(_))));
        config.tolerance = f64::NAN;
        assert!(config.validate().is_err());
        config.tolerance = 0.0;
        config.extension = ".pcd".into();
        assert!(config.validate().is_err());
        config.extension.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: ExportConfig = serde_json::from_str(r#"{ "tolerance": 0.01 }"#).unwrap();
        assert_eq!(config.tolerance, 0.01);
        assert_eq!(config.extension, "pcd");
    }

    #[test]
    fn json_round_trip() {
        let config = ExportConfig {
            extension: "ply".into(),
            tolerance: 0.25,
            encoding: Encoding::Ascii,
        };
        let text = serde_json::to_string(&config).unwrap();
        assert!(text.contains(r#""encoding":"ascii""#));
        let back: ExportConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<ExportConfig>(r#"{ "tolerence": 1 }"#).is_err());
    }
}
