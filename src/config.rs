use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolsError};
use crate::mixer::BlendMode;

/// Environment variable a host may set to choose the output root.
pub const OUTPUT_DIR_ENV: &str = "WANDERING_OUTPUT_DIR";

/// Top-level configuration, loadable from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub vault: VaultConfig,
    pub mixer: MixerDefaults,
}

impl ToolsConfig {
    /// Load a config file; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| ToolsError::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Settings for the image vault writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Root directory receiving full images.
    pub output_dir: PathBuf,
    /// Subdirectory of `output_dir` receiving thumbnails and sidecars.
    pub snapshot_subdir: String,
    /// Longest side of a thumbnail in pixels.
    pub thumbnail_size: u32,
    /// Claim each file with a create-exclusive open instead of check-then-write.
    pub exclusive_create: bool,
    /// How many indices to try when a claimed name is taken concurrently.
    pub max_claim_attempts: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            snapshot_subdir: "snapshot".to_string(),
            thumbnail_size: 256,
            exclusive_create: true,
            max_claim_attempts: 64,
        }
    }
}

impl VaultConfig {
    /// Directory for thumbnails and sidecar files.
    pub fn snapshot_dir(&self) -> PathBuf {
        self.output_dir.join(&self.snapshot_subdir)
    }
}

/// Widget defaults for the prompt mixer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerDefaults {
    pub blend_percent: i64,
    pub mode: BlendMode,
    pub seed: u64,
    pub max_length: usize,
}

impl Default for MixerDefaults {
    fn default() -> Self {
        Self {
            blend_percent: 50,
            mode: BlendMode::Append,
            seed: 0,
            max_length: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ToolsConfig::default();
        assert_eq!(config.vault.output_dir, PathBuf::from("output"));
        assert_eq!(config.vault.snapshot_dir(), PathBuf::from("output/snapshot"));
        assert_eq!(config.vault.thumbnail_size, 256);
        assert!(config.vault.exclusive_create);
        assert_eq!(config.mixer.blend_percent, 50);
        assert_eq!(config.mixer.max_length, 300);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tools.json");
        fs::write(
            &path,
            r#"{"vault": {"output_dir": "/srv/out"}, "mixer": {"mode": "shuffle"}}"#,
        )
        .unwrap();

        let config = ToolsConfig::load(&path).unwrap();
        assert_eq!(config.vault.output_dir, PathBuf::from("/srv/out"));
        assert_eq!(config.vault.snapshot_subdir, "snapshot");
        assert_eq!(config.mixer.mode, BlendMode::Shuffle);
        assert_eq!(config.mixer.seed, 0);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tools.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ToolsConfig::load(&path).unwrap_err();
        assert!(matches!(err, ToolsError::Config(_)));
    }
}
