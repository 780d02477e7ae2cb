use serde::{Deserialize, Serialize};

/// Application settings from `Seg3D Settings.yaml`
///
/// Every field has a default, so a missing or partial file still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory for rolling log files
    pub log_dir: String,

    /// File name prefix of the log files
    pub log_prefix: String,

    pub debug_mode: bool,

    /// Mirror log output to the console
    pub console_logging: bool,

    /// Number of undo steps kept
    pub undo_depth: usize,

    /// Tool types opened when the application starts
    pub startup_tools: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            log_prefix: "seg3d".to_string(),
            debug_mode: false,
            console_logging: true,
            undo_depth: 50,
            startup_tools: vec!["MaskDataFilter".to_string(), "PaintTool".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let settings: Settings = serde_yaml_ng::from_str("undo_depth: 5\ndebug_mode: true\n").unwrap();

        assert_eq!(settings.undo_depth, 5);
        assert!(settings.debug_mode);
        assert_eq!(settings.log_prefix, "seg3d");
        assert_eq!(settings.startup_tools.len(), 2);
    }
}
