//! Registry configuration

use std::path::PathBuf;

/// Default debounce for theme file changes, in milliseconds
const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Configuration for a [`Themes`](crate::Themes) registry
#[derive(Debug, Clone)]
pub struct Options {
    /// Directory holding one sub-directory per theme
    pub themes_path: PathBuf,
    /// Watch the active theme and recompile when its templates change
    pub dev_mode: bool,
    /// Quiet period before a burst of file changes triggers a rebuild
    pub debounce_ms: u64,
    /// Templates every theme must provide
    pub mandatory_templates: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            themes_path: PathBuf::from("themes"),
            dev_mode: false,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            mandatory_templates: vec!["index".to_string(), "post".to_string()],
        }
    }
}
