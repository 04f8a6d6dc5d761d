//! ValText configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/valtext/config.toml`
//! - Windows: `%APPDATA%/valtext/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use valtext_client_log::{DEFAULT_LOG_PATTERN, LogPattern};
use valtext_file_ops::{LanguageStore, LocalizationSwapper, default_store_path};
use valtext_protocol::{Language, Role};
use valtext_riot::{RiotPaths, default_install_root, default_log_dir, local_app_data};

/// Bounds for `poll_interval_ms`.
const POLL_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 100..=5000;

/// Pause between the up-to-date notice and the text swap, so the client can
/// finish writing its own files.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// On-disk configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Language of on-screen text.
    #[serde(default = "default_text_language")]
    pub text_language: Language,

    /// Language of spoken dialogue.
    #[serde(default = "default_voice_language")]
    pub voice_language: Language,

    /// Directory containing `Riot Client` and `VALORANT`.
    #[serde(default = "default_install_root")]
    pub install_root: PathBuf,

    /// Reference asset store.
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Directory the Riot Client writes its logs to.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// File name pattern of client logs.
    #[serde(default = "default_log_pattern")]
    pub log_pattern: String,

    /// Log poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Seconds to wait after starting the client before watching its logs.
    #[serde(default = "default_client_grace_secs")]
    pub client_grace_secs: u64,

    /// Seconds to keep the confirmation on screen before exiting.
    #[serde(default = "default_exit_delay_secs")]
    pub exit_delay_secs: u64,
}

fn default_text_language() -> Language {
    Language::English
}

fn default_voice_language() -> Language {
    Language::Japanese
}

fn default_store_dir() -> PathBuf {
    default_store_path(&local_app_data())
}

fn default_log_pattern() -> String {
    DEFAULT_LOG_PATTERN.into()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_client_grace_secs() -> u64 {
    5
}

fn default_exit_delay_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            text_language: default_text_language(),
            voice_language: default_voice_language(),
            install_root: default_install_root(),
            store_dir: default_store_dir(),
            log_dir: default_log_dir(),
            log_pattern: default_log_pattern(),
            poll_interval_ms: default_poll_interval_ms(),
            client_grace_secs: default_client_grace_secs(),
            exit_delay_secs: default_exit_delay_secs(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads configuration from `path`, writing defaults there if missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Applies one-run language overrides from the command line.
    pub fn with_overrides(mut self, text: Option<Language>, voice: Option<Language>) -> Self {
        if let Some(text) = text {
            self.text_language = text;
        }
        if let Some(voice) = voice {
            self.voice_language = voice;
        }
        self
    }

    /// Resolves the immutable run settings.
    pub fn settings(&self) -> Settings {
        let clamped = self
            .poll_interval_ms
            .clamp(*POLL_INTERVAL_RANGE.start(), *POLL_INTERVAL_RANGE.end());
        if clamped != self.poll_interval_ms {
            tracing::warn!(
                configured = self.poll_interval_ms,
                used = clamped,
                "poll_interval_ms out of range, clamped"
            );
        }

        Settings {
            text: self.text_language,
            voice: self.voice_language,
            riot: RiotPaths::with_root(&self.install_root),
            store: LanguageStore::new(&self.store_dir),
            log_dir: self.log_dir.clone(),
            log_pattern: LogPattern::new(&self.log_pattern),
            poll_interval: Duration::from_millis(clamped),
            client_grace: Duration::from_secs(self.client_grace_secs),
            settle_delay: SETTLE_DELAY,
            exit_delay: Duration::from_secs(self.exit_delay_secs),
        }
    }
}

/// Resolved settings for one run. Built once and passed by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub text: Language,
    pub voice: Language,
    pub riot: RiotPaths,
    pub store: LanguageStore,
    pub log_dir: PathBuf,
    pub log_pattern: LogPattern,
    pub poll_interval: Duration,
    pub client_grace: Duration,
    pub settle_delay: Duration,
    pub exit_delay: Duration,
}

impl Settings {
    /// Active language of `role`.
    pub fn language(&self, role: Role) -> Language {
        match role {
            Role::Text => self.text,
            Role::Voice => self.voice,
        }
    }

    /// Swapper writing into the game's live asset directory.
    pub fn swapper(&self) -> LocalizationSwapper {
        LocalizationSwapper::new(self.store.clone(), self.riot.paks_dir(), self.text, self.voice)
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("valtext").join("config.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("valtext")
            .join("config.toml"))
    }
}
