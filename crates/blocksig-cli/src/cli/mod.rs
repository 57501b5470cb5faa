//! CLI for blocksig.

use anyhow::{bail, Context, Result};
use blocksig_core::checksum::DigestAlgorithm;
use blocksig_core::config::{self, SignatureConfig};
use blocksig_core::run;
use blocksig_core::RunOutcome;
use clap::Parser;
use std::path::PathBuf;

/// Compute the per-block signature of a file: one hex digest per line, in file order.
#[derive(Debug, Parser)]
#[command(name = "blocksig")]
#[command(about = "Per-block file signatures computed in parallel", long_about = None)]
pub struct Cli {
    /// File to sign.
    pub source: PathBuf,

    /// Where to write the signature (one digest per line).
    pub destination: PathBuf,

    /// Block size in bytes (default from config, 1048576).
    #[arg(long, short = 'b', value_name = "BYTES", value_parser = clap::value_parser!(u64).range(1..))]
    pub block_size: Option<u64>,

    /// Block digest: md5 or sha256 (default from config, md5).
    #[arg(long, short = 'a', value_name = "ALGO")]
    pub algorithm: Option<DigestAlgorithm>,

    /// Worker threads (default: available parallelism minus one).
    #[arg(long, short = 'j', value_name = "N")]
    pub workers: Option<usize>,

    /// Ignore ~/.config/blocksig/config.toml and use built-in defaults.
    #[arg(long)]
    pub no_config: bool,
}

impl Cli {
    pub fn run_from_args() -> Result<()> {
        Cli::parse().run()
    }

    /// Overlay command-line flags on the loaded config.
    pub fn apply(&self, mut cfg: SignatureConfig) -> SignatureConfig {
        if let Some(block_size) = self.block_size {
            cfg.chunk_size_bytes = block_size;
        }
        if let Some(algorithm) = self.algorithm {
            cfg.algorithm = algorithm;
        }
        if self.workers.is_some() {
            cfg.workers = self.workers;
        }
        cfg
    }

    fn load_config(&self) -> SignatureConfig {
        if self.no_config {
            return SignatureConfig::default();
        }
        match config::load_or_init() {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!("config unavailable, using defaults: {:#}", err);
                SignatureConfig::default()
            }
        }
    }

    pub fn run(&self) -> Result<()> {
        let cfg = self.apply(self.load_config());
        tracing::debug!("effective config: {:?}", cfg);

        let outcome = run::sign_file(&self.source, &self.destination, &cfg)
            .with_context(|| format!("cannot sign {}", self.source.display()))?;
        match outcome {
            RunOutcome::Finished => {
                println!("Signature saved to: {}", self.destination.display());
                Ok(())
            }
            RunOutcome::PersistenceFailed(err) => {
                // The calculation itself completed; only the write failed.
                tracing::error!(
                    destination = %self.destination.display(),
                    "signature computed but not saved: {}",
                    err
                );
                eprintln!(
                    "Signature computed but not saved to {}: {}",
                    self.destination.display(),
                    err
                );
                Ok(())
            }
            RunOutcome::Aborted(Some(err)) => {
                bail!("failed to complete signature calculation: {}", err)
            }
            RunOutcome::Aborted(None) => bail!("signature calculation stopped"),
        }
    }
}

#[cfg(test)]
mod tests;
