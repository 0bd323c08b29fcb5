use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::http::HttpOptions;
use crate::queue::{Confirmation, QueuePolicy};

/// Download queue parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Retries after the first failed attempt before a task is failed permanently.
    pub max_retries: u32,
    /// Pause between two consecutive downloads, in milliseconds.
    pub inter_task_delay_ms: u64,
    /// Extra delay per retry already spent, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Upper bound on the extra retry delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Period of the idle watchdog that re-triggers stranded work.
    pub watchdog_secs: u64,
    /// When a started download counts as done: "on_start" or "on_event".
    #[serde(default)]
    pub confirmation: Confirmation,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            inter_task_delay_ms: 1000,
            retry_backoff_ms: 2000,
            max_backoff_ms: 30_000,
            watchdog_secs: 60,
            confirmation: Confirmation::OnStart,
        }
    }
}

impl From<&QueueConfig> for QueuePolicy {
    fn from(cfg: &QueueConfig) -> Self {
        QueuePolicy {
            max_retries: cfg.max_retries,
            inter_task_delay: Duration::from_millis(cfg.inter_task_delay_ms),
            retry_backoff: Duration::from_millis(cfg.retry_backoff_ms),
            max_backoff: Duration::from_millis(cfg.max_backoff_ms),
            watchdog_period: Duration::from_secs(cfg.watchdog_secs.max(1)),
            confirmation: cfg.confirmation,
        }
    }
}

/// Global configuration loaded from `~/.config/cwdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CwdlConfig {
    /// Where downloaded files are written (None = current directory).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Delay between consecutive resolutions of a batch, in milliseconds.
    pub batch_stagger_ms: u64,
    /// Cookie string sent with probe and download requests.
    #[serde(default)]
    pub cookie: Option<String>,
    /// User-Agent override for probe and download requests.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Overall probe deadline in seconds (None = network stack default).
    #[serde(default)]
    pub probe_timeout_secs: Option<u64>,
    /// Overall per-file download deadline in seconds (None = network stack default).
    #[serde(default)]
    pub download_timeout_secs: Option<u64>,
    /// Optional queue section; if missing, built-in defaults are used.
    #[serde(default)]
    pub queue: Option<QueueConfig>,
}

impl Default for CwdlConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            batch_stagger_ms: 1500,
            cookie: None,
            user_agent: None,
            probe_timeout_secs: None,
            download_timeout_secs: None,
            queue: None,
        }
    }
}

impl CwdlConfig {
    pub fn queue_policy(&self) -> QueuePolicy {
        self.queue
            .as_ref()
            .map(QueuePolicy::from)
            .unwrap_or_default()
    }

    pub fn batch_stagger(&self) -> Duration {
        Duration::from_millis(self.batch_stagger_ms)
    }

    /// HTTP options for the redirect probe.
    pub fn probe_options(&self) -> HttpOptions {
        HttpOptions {
            cookie: self.cookie.clone(),
            user_agent: self.user_agent.clone(),
            timeout: self.probe_timeout_secs.map(Duration::from_secs),
        }
    }

    /// HTTP options for file transfers.
    pub fn download_options(&self) -> HttpOptions {
        HttpOptions {
            cookie: self.cookie.clone(),
            user_agent: self.user_agent.clone(),
            timeout: self.download_timeout_secs.map(Duration::from_secs),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cwdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CwdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CwdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: CwdlConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = CwdlConfig::default();
        assert_eq!(cfg.batch_stagger_ms, 1500);
        assert!(cfg.download_dir.is_none());
        assert!(cfg.queue.is_none());
        let policy = cfg.queue_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.inter_task_delay, Duration::from_secs(1));
        assert_eq!(policy.watchdog_period, Duration::from_secs(60));
        assert_eq!(policy.confirmation, Confirmation::OnStart);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = CwdlConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: CwdlConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.batch_stagger_ms, cfg.batch_stagger_ms);
        assert!(parsed.cookie.is_none());
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            batch_stagger_ms = 500
            download_dir = "/tmp/slides"
            cookie = "session=abc"
            probe_timeout_secs = 20
        "#;
        let cfg: CwdlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.batch_stagger(), Duration::from_millis(500));
        assert_eq!(cfg.download_dir.as_deref(), Some(std::path::Path::new("/tmp/slides")));
        let probe = cfg.probe_options();
        assert_eq!(probe.cookie.as_deref(), Some("session=abc"));
        assert_eq!(probe.timeout, Some(Duration::from_secs(20)));
        assert!(cfg.download_options().timeout.is_none());
    }

    #[test]
    fn config_toml_queue_section() {
        let toml = r#"
            batch_stagger_ms = 1500

            [queue]
            max_retries = 5
            inter_task_delay_ms = 250
            retry_backoff_ms = 1000
            max_backoff_ms = 4000
            watchdog_secs = 30
            confirmation = "on_event"
        "#;
        let cfg: CwdlConfig = toml::from_str(toml).unwrap();
        let policy = cfg.queue_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.inter_task_delay, Duration::from_millis(250));
        assert_eq!(policy.retry_backoff, Duration::from_secs(1));
        assert_eq!(policy.max_backoff, Duration::from_secs(4));
        assert_eq!(policy.watchdog_period, Duration::from_secs(30));
        assert_eq!(policy.confirmation, Confirmation::OnEvent);
    }

    #[test]
    fn queue_section_confirmation_defaults_to_on_start() {
        let toml = r#"
            batch_stagger_ms = 1500

            [queue]
            max_retries = 3
            inter_task_delay_ms = 1000
            retry_backoff_ms = 2000
            max_backoff_ms = 30000
            watchdog_secs = 60
        "#;
        let cfg: CwdlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.queue_policy().confirmation, Confirmation::OnStart);
    }
}
