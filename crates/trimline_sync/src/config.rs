use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Where and how often edits are persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub base_url: String,
    pub media_id: String,
    pub request_timeout_ms: u64,
    /// Quiet period after the last change before an auto-save fires.
    pub autosave_debounce_ms: u64,
    /// Delay before the one-off save that seeds "last saved" on load.
    pub initial_save_delay_ms: u64,
    /// How long an explicit save pretends to work when the server is unreachable.
    pub soft_failure_delay_ms: u64,
    pub redirect_countdown_secs: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            media_id: String::new(),
            request_timeout_ms: 10_000,
            autosave_debounce_ms: 1000,
            initial_save_delay_ms: 500,
            soft_failure_delay_ms: 1500,
            redirect_countdown_secs: 3,
        }
    }
}

impl SyncConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn initial_save_delay(&self) -> Duration {
        Duration::from_millis(self.initial_save_delay_ms)
    }

    pub fn soft_failure_delay(&self) -> Duration {
        Duration::from_millis(self.soft_failure_delay_ms)
    }

    /// `{base_url}/api/v1/media/{media_id}/{action}`
    pub fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/api/v1/media/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.media_id,
            action
        )
    }
}
