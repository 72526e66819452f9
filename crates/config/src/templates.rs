use serde::{Deserialize, Serialize};

/// File globs resolved at load time into template definitions available
/// to notifier rendering. Notification rendering is currently fixed
/// (not template-driven), so this just tracks which files were
/// configured, letting a config document round-trip and reload warn
/// about missing globs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default)]
    pub files: Vec<String>,
}
