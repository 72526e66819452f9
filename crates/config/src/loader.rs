use std::path::Path;

use tracing::info;

use crate::document::RelayConfig;
use crate::error::ConfigError;

/// Load a config document from `path`, or fall back to an all-defaults
/// document (an empty route pointing at no receivers still parses --
/// validation against it will fail the moment a receiver is required,
/// which is the caller's job, not the loader's) if the file is absent.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] if the file exists but can't be read,
/// or the parse/validation errors [`RelayConfig::parse`] produces.
pub fn load(path: &str) -> Result<RelayConfig, ConfigError> {
    if Path::new(path).exists() {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_string(), source })?;
        RelayConfig::parse(&contents)
    } else {
        info!(%path, "config file not found, using defaults");
        RelayConfig::parse(DEFAULT_DOCUMENT)
    }
}

/// An all-defaults document: one receiver with no integrations, catching
/// every alert. Enough to boot against, not enough to notify anyone --
/// callers should treat an unmodified default as "not yet configured".
const DEFAULT_DOCUMENT: &str = r#"
[route]
receiver = "default"

[[receivers]]
name = "default"
"#;
