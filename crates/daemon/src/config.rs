//! Server configuration loaded from `resona.toml`.
//!
//! Every field has a default so the server starts from an empty file (or no
//! file at all). CLI flags override the file for the handful of knobs an
//! operator changes per run.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration for the audio job server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Port the HTTP surface binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Debug mode: artifacts are generated but never forwarded to the
    /// persistence service.
    #[serde(default)]
    pub debug: bool,

    /// Program invoked once per generation call.
    #[serde(default = "default_runner")]
    pub runner: PathBuf,

    /// Trained model checkpoint; the server refuses to start without it.
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,

    /// Model configuration file for the runner.
    #[serde(default = "default_model_config_path")]
    pub model_config_path: PathBuf,

    /// Directory receiving generated `.wav` artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Base URL of the persistence service (`{endpoint}/save/audio`).
    #[serde(default = "default_persister_endpoint")]
    pub persister_endpoint: String,

    /// Base URL of the remote log sink (`{endpoint}/log`).
    #[serde(default = "default_logger_endpoint")]
    pub logger_endpoint: String,

    /// Whether to ship log lines to the remote sink at all.
    #[serde(default)]
    pub remote_logging: bool,

    /// Number of concurrent generation slots.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Pause between consecutive dispatches on a slot, in milliseconds.
    #[serde(default)]
    pub dispatch_delay_ms: u64,

    /// Deadline around one generation call, in seconds. Zero disables it.
    #[serde(default = "default_synthesis_timeout_secs")]
    pub synthesis_timeout_secs: u64,

    /// How long finished jobs and their artifacts are kept, in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// How often the reaper sweeps, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_port() -> u16 {
    8001
}

fn default_runner() -> PathBuf {
    PathBuf::from("./bin/resona-runner")
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("./data/checkpoints/trained.ckpt")
}

fn default_model_config_path() -> PathBuf {
    PathBuf::from("./data/checkpoints/model.yaml")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_persister_endpoint() -> String {
    "http://localhost:8000".to_string()
}

fn default_logger_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_pool_size() -> usize {
    1
}

fn default_synthesis_timeout_secs() -> u64 {
    600
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            debug: false,
            runner: default_runner(),
            checkpoint_path: default_checkpoint_path(),
            model_config_path: default_model_config_path(),
            output_dir: default_output_dir(),
            persister_endpoint: default_persister_endpoint(),
            logger_endpoint: default_logger_endpoint(),
            remote_logging: false,
            pool_size: default_pool_size(),
            dispatch_delay_ms: 0,
            synthesis_timeout_secs: default_synthesis_timeout_secs(),
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl ServerConfig {
    /// Load the configuration from a TOML file, falling back to defaults
    /// when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<ServerConfig>(&contents)
                .with_context(|| format!("invalid config in {}", path.display()))?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot possibly run.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            anyhow::bail!("pool_size must be at least 1");
        }
        if self.ttl_secs == 0 {
            anyhow::bail!("ttl_secs must be positive");
        }
        if self.sweep_interval_secs == 0 {
            anyhow::bail!("sweep_interval_secs must be positive");
        }
        Ok(())
    }

    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
