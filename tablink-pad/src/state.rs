//! Small persisted state that outlives a run.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Remembered between runs so the host address need not be retyped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadState {
    /// Last peer a handshake succeeded with.
    pub last_peer: Option<String>,
}

impl PadState {
    /// Read the state file; a missing or unreadable file is empty state.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("ignoring corrupt state file {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}
