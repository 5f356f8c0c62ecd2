use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type SegmentId = i64;

/// Id carried by the transient cutaway segment the playback gate builds for gaps.
pub const VIRTUAL_SEGMENT_ID: SegmentId = -999;

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: SegmentId,
    pub name: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub thumbnail: String,
}

impl Segment {
    pub fn new(id: SegmentId, name: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            id,
            name: name.into(),
            start_time,
            end_time,
            thumbnail: String::new(),
        }
    }

    /// A gap materialized as a segment so the gate can monitor it like one.
    pub fn virtual_cutaway(start_time: f64, end_time: f64) -> Self {
        Self::new(VIRTUAL_SEGMENT_ID, "Cutaway", start_time, end_time)
    }

    pub fn is_virtual(&self) -> bool {
        self.id < 0
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Strict overlap: touching edges do not count.
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    /// Inclusive containment, widened by `tolerance` on both edges.
    pub fn contains(&self, position: f64, tolerance: f64) -> bool {
        (self.start_time <= position && position <= self.end_time)
            || (position - self.start_time).abs() < tolerance
            || (position - self.end_time).abs() < tolerance
    }
}

/// Timeline order: start time first, id breaks ties.
pub fn timeline_order(a: &Segment, b: &Segment) -> Ordering {
    a.start_time
        .total_cmp(&b.start_time)
        .then_with(|| a.id.cmp(&b.id))
}

/// Borrowed view of `segments` in timeline order.
pub fn sorted_refs(segments: &[Segment]) -> Vec<&Segment> {
    let mut refs: Vec<&Segment> = segments.iter().collect();
    refs.sort_by(|a, b| timeline_order(a, b));
    refs
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Segment(Segment),
    Gap { available_space: f64 },
}

impl Classification {
    pub fn segment(&self) -> Option<&Segment> {
        match self {
            Classification::Segment(segment) => Some(segment),
            Classification::Gap { .. } => None,
        }
    }

    pub fn segment_id(&self) -> Option<SegmentId> {
        self.segment().map(|s| s.id)
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Classification::Gap { .. })
    }
}

// ---------------------------------------------------------------------------
// HistoryAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    AdjustTrimStart,
    AdjustTrimEnd,
    AdjustSegmentStart,
    AdjustSegmentEnd,
    CreateSegment,
    DeleteSegment,
    SplitSegment,
    LoadSegments,
    Undo,
    Redo,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::AdjustTrimStart => "adjust_trim_start",
            HistoryAction::AdjustTrimEnd => "adjust_trim_end",
            HistoryAction::AdjustSegmentStart => "adjust_segment_start",
            HistoryAction::AdjustSegmentEnd => "adjust_segment_end",
            HistoryAction::CreateSegment => "create_segment",
            HistoryAction::DeleteSegment => "delete_segment",
            HistoryAction::SplitSegment => "split_segment",
            HistoryAction::LoadSegments => "load_segments",
            HistoryAction::Undo => "undo",
            HistoryAction::Redo => "redo",
        }
    }
}

// ---------------------------------------------------------------------------
// ReplaceOptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOptions {
    pub record_history: bool,
    pub action: Option<HistoryAction>,
    pub from_auto_save: bool,
}

impl ReplaceOptions {
    /// Intermediate state of a gesture; never recorded.
    pub fn transient(action: HistoryAction) -> Self {
        Self {
            record_history: false,
            action: Some(action),
            from_auto_save: false,
        }
    }

    pub fn recorded(action: HistoryAction) -> Self {
        Self {
            record_history: true,
            action: Some(action),
            from_auto_save: false,
        }
    }

    /// Programmatic load that must not feed back into auto-save.
    pub fn loaded() -> Self {
        Self {
            record_history: false,
            action: Some(HistoryAction::LoadSegments),
            from_auto_save: true,
        }
    }

    /// Whether this replacement should reach the persistence layer.
    pub fn triggers_save(&self) -> bool {
        self.record_history && !self.from_auto_save
    }
}

// ---------------------------------------------------------------------------
// PlaybackSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackMode {
    #[default]
    Normal,
    /// Play every segment in order, jumping over the gaps between them.
    SegmentsQueue,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    pub active_segment_id: Option<SegmentId>,
    pub is_playing_segment: bool,
    pub continue_past_boundary: bool,
    pub selected_segment_id: Option<SegmentId>,
    pub last_seeked_position: Option<f64>,
    pub queue_index: Option<usize>,
}

impl PlaybackSession {
    /// Session state after a boundary stop without the override.
    pub fn end_at_boundary(&mut self) {
        self.active_segment_id = None;
        self.is_playing_segment = false;
        self.continue_past_boundary = false;
        self.queue_index = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
