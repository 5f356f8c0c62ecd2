use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Positions closer than this to a segment edge count as on the edge.
pub const EDGE_TOLERANCE: f64 = 0.001;
/// Distance to a stop time at which the monitor treats the boundary as reached.
pub const BOUNDARY_EPSILON: f64 = 0.05;
/// Smallest gap size ever reported by the resolver.
pub const MIN_GAP_SPACE: f64 = 0.1;
/// A gap must be at least this long to offer "new segment here".
pub const MIN_GAP_FOR_NEW_SEGMENT: f64 = 0.5;
pub const MIN_SEGMENT_DURATION: f64 = 0.5;
pub const SNAP_THRESHOLD: f64 = 0.3;
/// Hold-to-repeat never fires faster than this.
pub const MIN_HOLD_REPEAT_INTERVAL_MS: u64 = 1;

// ---------------------------------------------------------------------------
// EditorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub edge_tolerance: f64,
    pub boundary_epsilon: f64,
    pub min_gap_space: f64,
    pub min_gap_for_new_segment: f64,
    pub min_segment_duration: f64,
    pub snap_threshold: f64,
    /// Step applied by one fine-adjust press.
    pub nudge_step: f64,
    /// Re-assert schedule after a boundary snap, relative to the snap.
    pub correction_delays_ms: Vec<u64>,
    pub hold_initial_delay_ms: u64,
    pub hold_repeat_interval_ms: u64,
    pub history_max_size: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            edge_tolerance: EDGE_TOLERANCE,
            boundary_epsilon: BOUNDARY_EPSILON,
            min_gap_space: MIN_GAP_SPACE,
            min_gap_for_new_segment: MIN_GAP_FOR_NEW_SEGMENT,
            min_segment_duration: MIN_SEGMENT_DURATION,
            snap_threshold: SNAP_THRESHOLD,
            nudge_step: 0.1,
            correction_delays_ms: vec![50, 100, 200],
            hold_initial_delay_ms: 400,
            hold_repeat_interval_ms: 100,
            history_max_size: 100,
        }
    }
}

impl EditorConfig {
    /// Load from a JSON file. Missing keys fall back to the defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: EditorConfig = serde_json::from_str(&data)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn correction_delays(&self) -> Vec<Duration> {
        self.correction_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }

    pub fn hold_initial_delay(&self) -> Duration {
        Duration::from_millis(self.hold_initial_delay_ms)
    }

    pub fn hold_repeat_interval(&self) -> Duration {
        Duration::from_millis(self.hold_repeat_interval_ms.max(MIN_HOLD_REPEAT_INTERVAL_MS))
    }
}
