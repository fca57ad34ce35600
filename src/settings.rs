//! Settings file and command line overrides

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use logscope_client::ConnectionConfig;
use logscope_logs::{FilterSet, HighlightRule, StoreLimits};
use logscope_tui::LogView;

const CONFIG_DIR: &str = "logscope";
const CONFIG_FILENAME: &str = "config.toml";

/// `[connection]` section
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub server: Option<String>,
    pub token: Option<String>,
    pub user: Option<String>,
    pub reconnect_delay_ms: Option<u64>,
}

/// One `[[views]]` entry
#[derive(Debug, Deserialize)]
pub struct ViewSettings {
    pub name: String,
    #[serde(default)]
    pub filter: FilterSet,
}

/// Contents of `config.toml`
///
/// Filter and highlight rules are validated while deserializing, so a bad
/// regex or color fails the whole load.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub connection: ConnectionSettings,
    pub limits: StoreLimits,
    pub views: Vec<ViewSettings>,
    pub highlights: Vec<HighlightRule>,
}

/// Values given on the command line; each one beats the file
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub server: Option<String>,
    pub token: Option<String>,
    pub user: Option<String>,
    pub reconnect_delay_ms: Option<u64>,
    pub buffer_size: Option<usize>,
    pub initial_load: Option<usize>,
    pub max_rows: Option<usize>,
}

/// Where settings come from, kept so they can be read again at runtime
#[derive(Clone, Debug, Default)]
pub struct SettingsSource {
    pub path: Option<PathBuf>,
    pub overrides: Overrides,
}

impl SettingsSource {
    pub fn new(path: Option<PathBuf>, overrides: Overrides) -> Self {
        Self { path, overrides }
    }

    /// Read the file and apply the command line on top
    pub fn load(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.path.as_deref())?;
        settings.apply(self.overrides.clone());
        Ok(settings)
    }
}

impl Settings {
    /// `<config dir>/logscope/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join(CONFIG_DIR).join(CONFIG_FILENAME))
    }

    /// Load from `path`, or from the default location when `None`
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path),
                Some(path) => {
                    debug!(path = %path.display(), "No config file, using defaults");
                    Ok(Self::default())
                }
                None => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        let connection = &mut self.connection;
        connection.server = overrides.server.or(connection.server.take());
        connection.token = overrides.token.or(connection.token.take());
        connection.user = overrides.user.or(connection.user.take());
        connection.reconnect_delay_ms = overrides
            .reconnect_delay_ms
            .or(connection.reconnect_delay_ms);

        if let Some(n) = overrides.buffer_size {
            self.limits.max_buffer_entries = n;
        }
        if let Some(n) = overrides.initial_load {
            self.limits.initial_load_limit = n;
        }
        if let Some(n) = overrides.max_rows {
            self.limits.max_grid_rows = n;
        }
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        let connection = &self.connection;
        let mut config = ConnectionConfig::default();
        if let Some(server) = &connection.server {
            config.server = server.clone();
        }
        if let Some(token) = &connection.token {
            config.token = token.clone();
        }
        if let Some(user) = &connection.user {
            config.user = user.clone();
        }
        if let Some(ms) = connection.reconnect_delay_ms {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        config
    }

    /// Configured views; empty means the UI picks its defaults
    pub fn take_views(&mut self) -> Vec<LogView> {
        self.views
            .drain(..)
            .map(|view| LogView::new(view.name, view.filter))
            .collect()
    }
}
