use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

use crate::models::Config;

/// Commented example configuration written by `config --init`.
pub const EXAMPLE_CONFIG: &str = r#"# Wine Chroot Configuration
# This file configures the wine-chroot tool

[chroot]
name = "debian-amd64"
path = "/srv/debian-amd64"
architecture = "amd64"
debian_version = "trixie"

[wine]
prefix = "/root/.wine" # Path inside chroot
enable_i386 = true

[desktop]
icon_dir = "/home/user/.local/share/icons"
applications_dir = "/home/user/.local/share/applications"
categories = ["Wine", "WindowsApps"]

[execution]
use_pkexec = false # false = sudo (recommended), true = pkexec
preserve_environment = true
x11_forwarding = true
"#;

/// Loads and saves the TOML configuration file.
///
/// Construction never fails: a missing file or a parse error degrades to the
/// built-in defaults with a warning, so every command can run unconfigured.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Config,
    config_path: Option<Utf8PathBuf>,
}

impl ConfigManager {
    /// Default search locations, probed in order when no explicit path is given.
    pub fn default_config_paths() -> Vec<Utf8PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir().and_then(|p| Utf8PathBuf::from_path_buf(p).ok()) {
            paths.push(home.join(".config/wine-chroot.toml"));
            paths.push(home.join(".wine-chroot.toml"));
        }
        paths.push(Utf8PathBuf::from("wine-chroot.toml"));
        paths
    }

    /// Load from `explicit_path`, or from the first existing default location.
    pub fn load(explicit_path: Option<&Utf8Path>) -> Self {
        let config_path = match explicit_path {
            Some(path) => {
                if !path.as_std_path().exists() {
                    tracing::warn!("Config file not found: {}, using defaults", path);
                }
                Some(path.to_path_buf())
            }
            None => Self::default_config_paths()
                .into_iter()
                .find(|p| p.as_std_path().exists()),
        };

        let config = match &config_path {
            Some(path) if path.as_std_path().exists() => Self::parse_file(path),
            _ => Config::default(),
        };

        Self {
            config,
            config_path,
        }
    }

    fn parse_file(path: &Utf8Path) -> Config {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Failed to read config {}: {e}, using defaults", path);
                return Config::default();
            }
        };
        match toml::from_str(&contents) {
            Ok(config) => {
                tracing::debug!("Loaded configuration from {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {e}, using defaults", path);
                Config::default()
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Path the configuration was loaded from, if any file was found.
    pub fn config_path(&self) -> Option<&Utf8Path> {
        self.config_path.as_deref()
    }

    /// Serialize the configuration back to TOML.
    ///
    /// Writes to `path`, or to the loaded location, or to the primary default
    /// location, creating parent directories as needed. Returns the path
    /// written.
    pub fn save(&self, path: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
        let save_path = path
            .map(Utf8Path::to_path_buf)
            .or_else(|| self.config_path.clone())
            .or_else(|| Self::default_config_paths().into_iter().next())
            .context("No configuration path available")?;

        if let Some(parent) = save_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {parent}"))?;
        }

        let toml_string =
            toml::to_string_pretty(&self.config).context("Failed to serialize configuration")?;
        fs::write(&save_path, toml_string)
            .with_context(|| format!("Failed to write config: {save_path}"))?;

        tracing::info!("Configuration saved to {}", save_path);
        Ok(save_path)
    }

    /// Write the commented example configuration to `output_path`.
    pub fn write_example_config(output_path: &Utf8Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {parent}"))?;
        }
        fs::write(output_path, EXAMPLE_CONFIG)
            .with_context(|| format!("Failed to write example config: {output_path}"))?;

        tracing::info!("Created example configuration at {}", output_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap()
    }

    #[test]
    fn test_missing_explicit_path_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp_path(&temp, "nope.toml");
        let manager = ConfigManager::load(Some(&path));

        assert_eq!(manager.config(), &Config::default());
        // Path is remembered so a later save lands there
        assert_eq!(manager.config_path(), Some(path.as_path()));
    }

    #[test]
    fn test_parse_error_degrades_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp_path(&temp, "broken.toml");
        fs::write(&path, "chroot = not valid toml [").unwrap();

        let manager = ConfigManager::load(Some(&path));
        assert_eq!(manager.config(), &Config::default());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp_path(&temp, "wine-chroot.toml");
        fs::write(&path, "[chroot]\nname = \"bookworm\"\n").unwrap();

        let manager = ConfigManager::load(Some(&path));
        assert_eq!(manager.config().chroot.name, "bookworm");
        assert_eq!(manager.config().chroot.debian_version, "trixie");
    }

    #[test]
    fn test_save_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = temp_path(&temp, "sub/dir/wine-chroot.toml");

        let mut manager = ConfigManager::load(Some(&path));
        manager.config.chroot.name = "saved".to_string();
        let written = manager.save(None).unwrap();
        assert_eq!(written, path);

        let reloaded = ConfigManager::load(Some(&path));
        assert_eq!(reloaded.config().chroot.name, "saved");
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config.chroot.name, "debian-amd64");
        assert!(config.wine.enable_i386);
        assert!(!config.execution.use_pkexec);
    }

    #[test]
    fn test_write_example_config() {
        let temp = TempDir::new().unwrap();
        let path = temp_path(&temp, "example/wine-chroot.toml");

        ConfigManager::write_example_config(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[chroot]"));
        assert!(contents.contains("[execution]"));
    }
}
