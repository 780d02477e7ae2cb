//! Integration tests for ConfigManager and the settings file
//!
//! These tests verify:
//! - Directory creation and settings file location
//! - Defaults for missing and partial files
//! - Settings driving the rest of the core (undo depth, startup tools)

use camino::Utf8PathBuf;
use seg3d::config::SETTINGS_FILE;
use seg3d::{ConfigManager, Settings, ToolKind};
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

fn no_env() -> Option<config::Map<String, String>> {
    Some(config::Map::new())
}

#[test]
fn test_create_config_manager_creates_directory() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("Seg3D Data");

    let manager = ConfigManager::new(&nested).unwrap();
    assert!(nested.exists());
    assert_eq!(manager.config_dir(), &nested);
    assert_eq!(manager.settings_path(), nested.join(SETTINGS_FILE));
}

#[test]
fn test_partial_settings_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        manager.settings_path(),
        "undo_depth: 7\nstartup_tools:\n  - painttool\n",
    )
    .unwrap();

    let settings = manager.load_settings_with_env(no_env()).unwrap();
    assert_eq!(settings.undo_depth, 7);
    assert_eq!(settings.startup_tools, vec!["painttool".to_string()]);
    assert_eq!(settings.log_dir, Settings::default().log_dir);

    // Tool names in the file are matched case-insensitively
    let kinds: Vec<ToolKind> = settings
        .startup_tools
        .iter()
        .map(|name| name.parse().unwrap())
        .collect();
    assert_eq!(kinds, vec![ToolKind::PaintTool]);
}

#[test]
fn test_invalid_settings_file_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(manager.settings_path(), "undo_depth: lots\n").unwrap();

    let error = manager.load_settings_with_env(no_env()).unwrap_err();
    assert!(error.to_string().contains("Failed to parse settings"));
}

#[test]
fn test_saved_settings_are_yaml() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    manager.save_settings(&Settings::default()).unwrap();
    let contents = fs::read_to_string(manager.settings_path()).unwrap();

    assert!(contents.contains("undo_depth: 50"));
    assert!(contents.contains("- MaskDataFilter"));
}
