use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "flipsync", "flipsync")
}

fn default_data_dir() -> PathBuf {
    if let Some(path) = std::env::var_os("FLIPSYNC_DATA_DIR") {
        return PathBuf::from(path);
    }
    if let Some(dirs) = project_dirs() {
        return dirs.data_dir().to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".flipsync")
}

fn default_daily_notes_dir() -> PathBuf {
    default_data_dir().join("daily")
}

pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("FLIPSYNC_CONFIG") {
        return PathBuf::from(path);
    }
    if let Some(dirs) = project_dirs() {
        return dirs.config_dir().join("config.toml");
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".flipsync-config.toml")
}

/// Where the token from the last successful sign-in is stored.
pub fn token_path() -> PathBuf {
    if let Some(path) = std::env::var_os("FLIPSYNC_TOKEN_FILE") {
        return PathBuf::from(path);
    }
    default_data_dir().join("token.json")
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub account: AccountConfig,
    pub api: ApiConfig,
    pub vault: VaultConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AccountConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newapi.timeflip.io".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct VaultConfig {
    /// Folder holding the daily notes.
    pub daily_notes_dir: PathBuf,
    /// chrono format string producing the note filename stem for a date.
    pub filename_format: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            daily_notes_dir: default_daily_notes_dir(),
            filename_format: "%Y-%m-%d".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    /// Minimum pause between two property writes on the same note.
    pub write_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { write_delay_ms: 100 }
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = config_path();

        let mut config = if let Ok(content) = fs::read_to_string(&config_path) {
            match toml::from_str::<Config>(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to parse config.toml ({config_path:?}), using defaults: {e}");
                    Config::default()
                }
            }
        } else {
            Config::default()
        };

        let changed = config.normalize();

        if changed || !config_path.exists() {
            let _ = config.save_to_path(&config_path);
        }

        config
    }

    pub fn save_to_path(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).unwrap_or_default();
        fs::write(path, content)
    }

    fn normalize(&mut self) -> bool {
        let mut changed = false;

        if self.vault.daily_notes_dir.as_os_str().is_empty() {
            self.vault.daily_notes_dir = default_daily_notes_dir();
            changed = true;
        }

        if self.vault.daily_notes_dir.is_relative() {
            self.vault.daily_notes_dir = default_data_dir().join(&self.vault.daily_notes_dir);
            changed = true;
        }

        if self.vault.filename_format.trim().is_empty() {
            self.vault.filename_format = "%Y-%m-%d".to_string();
            changed = true;
        }

        if self.api.base_url.trim().is_empty() {
            self.api.base_url = ApiConfig::default().base_url;
            changed = true;
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_merges_defaults() {
        let config: Config = toml::from_str("[account]\nemail = \"a@b.example\"\n").expect("parse");
        assert_eq!(config.account.email, "a@b.example");
        assert_eq!(config.api.base_url, "https://newapi.timeflip.io");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.sync.write_delay_ms, 100);
        assert_eq!(config.vault.filename_format, "%Y-%m-%d");
    }

    #[test]
    fn normalize_fills_empty_fields() {
        let mut config = Config::default();
        config.vault.daily_notes_dir = PathBuf::new();
        config.vault.filename_format = "  ".to_string();
        config.api.base_url = String::new();

        assert!(config.normalize());
        assert!(!config.vault.daily_notes_dir.as_os_str().is_empty());
        assert!(config.vault.daily_notes_dir.is_absolute());
        assert_eq!(config.vault.filename_format, "%Y-%m-%d");
        assert_eq!(config.api.base_url, "https://newapi.timeflip.io");
    }

    #[test]
    fn normalize_leaves_complete_config_alone() {
        let mut config = Config::default();
        assert!(!config.normalize());
    }
}
