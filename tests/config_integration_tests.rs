//! Integration tests for configuration file handling.
//!
//! These tests verify:
//! - The full load / edit / save / reload cycle
//! - Degradation to defaults on unreadable input
//! - The generated example file round-trips through the loader

use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;

use wine_chroot::models::Config;
use wine_chroot::ConfigManager;

fn config_path(temp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join("wine-chroot.toml")).unwrap()
}

#[test]
fn test_full_configuration_cycle() {
    let temp = TempDir::new().unwrap();
    let path = config_path(&temp);

    fs::write(
        &path,
        r#"
[chroot]
name = "bookworm-wine"
debian_version = "bookworm"

[execution]
use_pkexec = true
"#,
    )
    .unwrap();

    let manager = ConfigManager::load(Some(&path));
    let config = manager.config();

    // Explicit values win, everything else stays default
    assert_eq!(config.chroot.name, "bookworm-wine");
    assert_eq!(config.chroot.debian_version, "bookworm");
    assert_eq!(config.privilege_tool(), "pkexec");
    assert_eq!(config.chroot.architecture, "amd64");
    assert!(config.wine.enable_i386);

    let written = manager.save(None).unwrap();
    assert_eq!(written, path);

    let reloaded = ConfigManager::load(Some(&path));
    assert_eq!(reloaded.config(), config);
}

#[test]
fn test_garbage_file_degrades_to_defaults() {
    let temp = TempDir::new().unwrap();
    let path = config_path(&temp);
    fs::write(&path, "this is { not toml").unwrap();

    let manager = ConfigManager::load(Some(&path));
    assert_eq!(manager.config(), &Config::default());
}

#[test]
fn test_example_config_loads_cleanly() {
    let temp = TempDir::new().unwrap();
    let path = config_path(&temp);

    ConfigManager::write_example_config(&path).unwrap();
    let manager = ConfigManager::load(Some(&path));

    let config = manager.config();
    assert_eq!(config.chroot.name, "debian-amd64");
    assert_eq!(config.chroot.path, Utf8PathBuf::from("/srv/debian-amd64"));
    assert_eq!(config.desktop.categories, vec!["Wine", "WindowsApps"]);
}

#[test]
fn test_save_creates_parent_directories() {
    let temp = TempDir::new().unwrap();
    let nested =
        Utf8PathBuf::from_path_buf(temp.path().join("deep/nested/wine-chroot.toml")).unwrap();

    let manager = ConfigManager::load(Some(&nested));
    let written = manager.save(None).unwrap();

    assert_eq!(written, nested);
    assert!(nested.as_std_path().exists());
}
