use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::checksum::DigestAlgorithm;
use crate::job::{DEFAULT_BACKPRESSURE_MULTIPLIER, DEFAULT_CHUNK_SIZE};

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_multiplier() -> u64 {
    DEFAULT_BACKPRESSURE_MULTIPLIER
}

/// Global configuration loaded from `~/.config/blocksig/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureConfig {
    /// Size of each hashed block in bytes (the last block may be shorter).
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: u64,
    /// Worker thread count. None = available parallelism minus one.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Chunks of read-ahead allowed per worker before the reader waits.
    #[serde(default = "default_multiplier")]
    pub backpressure_multiplier: u64,
    /// Block digest: "md5" (default) or "sha256".
    #[serde(default)]
    pub algorithm: DigestAlgorithm,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            workers: None,
            backpressure_multiplier: DEFAULT_BACKPRESSURE_MULTIPLIER,
            algorithm: DigestAlgorithm::Md5,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("blocksig")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SignatureConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SignatureConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Parse a config file at `path`.
pub fn load_from_path(path: &Path) -> Result<SignatureConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SignatureConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = SignatureConfig::default();
        assert_eq!(cfg.chunk_size_bytes, 1_048_576);
        assert_eq!(cfg.workers, None);
        assert_eq!(cfg.backpressure_multiplier, 2);
        assert_eq!(cfg.algorithm, DigestAlgorithm::Md5);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = SignatureConfig {
            workers: Some(3),
            algorithm: DigestAlgorithm::Sha256,
            ..SignatureConfig::default()
        };
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: SignatureConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_uses_defaults() {
        let toml = r#"
            chunk_size_bytes = 4096
            algorithm = "sha256"
        "#;
        let cfg: SignatureConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.chunk_size_bytes, 4096);
        assert_eq!(cfg.algorithm, DigestAlgorithm::Sha256);
        assert_eq!(cfg.backpressure_multiplier, 2);
        assert!(cfg.workers.is_none());
    }

    #[test]
    fn config_rejects_unknown_algorithm() {
        assert!(toml::from_str::<SignatureConfig>(r#"algorithm = "crc32""#).is_err());
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "workers = 6\nbackpressure_multiplier = 4\n").unwrap();
        let cfg = load_from_path(&path).unwrap();
        assert_eq!(cfg.workers, Some(6));
        assert_eq!(cfg.backpressure_multiplier, 4);
        assert_eq!(cfg.chunk_size_bytes, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn load_from_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from_path(&dir.path().join("nope.toml")).is_err());
    }
}
