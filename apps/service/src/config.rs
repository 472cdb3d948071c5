use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitoring::EngineConfig;
use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    ReadFailed { path: path::PathBuf, source: std::io::Error },
    #[error("failed to write config {path}: {source}")]
    WriteFailed { path: path::PathBuf, source: std::io::Error },
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("no config directory: neither XDG_CONFIG_HOME nor HOME is set")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    pub hub: HubConfig,
    pub http: HttpConfig,
    /// Settings seeded into an empty database
    pub defaults: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: path::PathBuf,
    pub max_connections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Messages buffered per sink before it is disconnected
    pub sink_buffer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: path::PathBuf::from("echowatch.db"), max_connections: 8 }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { sink_buffer: 256 }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 8080 }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/echowatch/config.toml or
/// $HOME/.config/...)
pub fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("echowatch/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path.display())?;
        write_1(f, "Max Connections", &self.database.max_connections)?;
        write_title_1(f, "Engine")?;
        write_1(f, "Probe Workers", &self.engine.probe_workers)?;
        write_1(f, "Shutdown Grace (s)", &self.engine.shutdown_grace_secs)?;
        write_title_1(f, "Hub")?;
        write_1(f, "Sink Buffer", &self.hub.sink_buffer)?;
        write_title_1(f, "HTTP")?;
        write_1(f, "Bind Address", &self.http.bind)?;
        write_1(f, "Port", &self.http.port)?;
        write_title_1(f, "Default Probe Settings")?;
        write_1(f, "Ping Interval (s)", &self.defaults.ping_interval_sec)?;
        write_1(f, "ICMP Payload Size", &self.defaults.icmp_payload_size)?;
        write_1(f, "Ping Timeout (s)", &self.defaults.ping_timeout_sec)?;
        write_1(f, "Auto Refresh (s)", &self.defaults.auto_refresh_sec)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/echowatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
            toml::from_str::<Self>(raw_string.as_str())?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::WriteFailed { path: path.to_path_buf(), source })?;
        }

        fs::write(path, config_str)
            .map_err(|source| ConfigError::WriteFailed { path: path.to_path_buf(), source })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.probe_workers == 0 {
            return Err(ConfigError::Invalid("engine.probe_workers must be at least 1".into()));
        }
        if self.hub.sink_buffer == 0 {
            return Err(ConfigError::Invalid("hub.sink_buffer must be at least 1".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be at least 1".into()));
        }
        self.defaults
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("defaults: {e}")))
    }

    /// `bind:port` for the HTTP listener
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.http.bind, self.http.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reread = Config::from_config(Some(&path)).unwrap();
        assert_eq!(reread, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[engine]\nprobe_workers = 4\n\n[defaults]\npingIntervalSec = 5\nicmpPayloadSize = 56\npingTimeoutSec = 2\nautoRefreshSec = 10\n",
        )
        .unwrap();

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config.engine.probe_workers, 4);
        assert_eq!(config.engine.shutdown_grace_secs, 5);
        assert_eq!(config.defaults.ping_interval_sec, 5);
        assert_eq!(config.defaults.icmp_payload_size, 56);
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn test_extension_is_normalized() {
        let path = normalize_toml_path(path::Path::new("/tmp/echowatch"));
        assert_eq!(path, path::PathBuf::from("/tmp/echowatch.toml"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engine]\nprobe_workers = 0\n").unwrap();
        assert!(matches!(Config::from_config(Some(&path)), Err(ConfigError::Invalid(_))));

        fs::write(
            &path,
            "[defaults]\npingIntervalSec = 30\nicmpPayloadSize = 56\npingTimeoutSec = 0\nautoRefreshSec = 10\n",
        )
        .unwrap();
        assert!(matches!(Config::from_config(Some(&path)), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engine\n").unwrap();
        assert!(matches!(Config::from_config(Some(&path)), Err(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn test_display_lists_sections() {
        let shown = Config::default().to_string();
        assert!(shown.contains("Engine"));
        assert!(shown.contains("Probe Workers: 16"));
        assert!(shown.contains("Port: 8080"));
    }
}
