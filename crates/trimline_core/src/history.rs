use crate::error::{CoreError, Result};
use crate::types::*;

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    action: HistoryAction,
    segments: Vec<Segment>,
}

/// Undo/redo over whole-list snapshots.
///
/// `committed` is the list as of the last recorded change. Gesture
/// intermediates never touch it, so undoing a drag returns to the pre-drag
/// state rather than the last pointer move.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    committed: Vec<Segment>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            committed: Vec::new(),
            max_size,
        }
    }

    /// Start over from `segments` (a load), forgetting both stacks.
    pub fn reset(&mut self, segments: &[Segment]) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.committed = segments.to_vec();
    }

    /// Record a committed change. Clears the redo stack.
    pub fn record(&mut self, action: HistoryAction, segments: &[Segment]) {
        let previous = std::mem::replace(&mut self.committed, segments.to_vec());
        self.undo_stack.push(Snapshot {
            action,
            segments: previous,
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
    }

    /// Step back. Returns the list to restore.
    pub fn undo(&mut self) -> Result<Vec<Segment>> {
        let snapshot = self.undo_stack.pop().ok_or(CoreError::NothingToUndo)?;
        let current = std::mem::replace(&mut self.committed, snapshot.segments);
        self.redo_stack.push(Snapshot {
            action: snapshot.action,
            segments: current,
        });
        Ok(self.committed.clone())
    }

    /// Step forward again. Returns the list to restore.
    pub fn redo(&mut self) -> Result<Vec<Segment>> {
        let snapshot = self.redo_stack.pop().ok_or(CoreError::NothingToRedo)?;
        let current = std::mem::replace(&mut self.committed, snapshot.segments);
        self.undo_stack.push(Snapshot {
            action: snapshot.action,
            segments: current,
        });
        Ok(self.committed.clone())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|s| s.action.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|s| s.action.as_str())
    }

    pub fn committed(&self) -> &[Segment] {
        &self.committed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn one(end: f64) -> Vec<Segment> {
        vec![Segment::new(1, "a", 0.0, end)]
    }

    #[test]
    fn record_undo_redo() {
        let mut history = History::new(100);
        history.reset(&one(10.0));
        history.record(HistoryAction::AdjustSegmentEnd, &one(8.0));
        assert!(history.can_undo());
        assert_eq!(history.undo_description(), Some("adjust_segment_end"));

        let restored = history.undo().unwrap();
        assert_eq!(restored[0].end_time, 10.0);
        assert!(history.can_redo());
        assert_eq!(history.redo_description(), Some("adjust_segment_end"));

        let again = history.redo().unwrap();
        assert_eq!(again[0].end_time, 8.0);
        assert!(!history.can_redo());
    }

    // -----------------------------------------------------------------------
    // New change after undo drops the redo branch
    // -----------------------------------------------------------------------

    #[test]
    fn new_record_clears_redo() {
        let mut history = History::new(100);
        history.reset(&one(10.0));
        history.record(HistoryAction::AdjustSegmentEnd, &one(8.0));
        history.undo().unwrap();
        assert!(history.can_redo());

        history.record(HistoryAction::AdjustSegmentEnd, &one(6.0));
        assert!(!history.can_redo());
        assert_eq!(history.committed()[0].end_time, 6.0);
    }

    #[test]
    fn undo_empty_history_errors() {
        let mut history = History::new(100);
        assert!(matches!(history.undo().unwrap_err(), CoreError::NothingToUndo));
    }

    #[test]
    fn redo_empty_stack_errors() {
        let mut history = History::new(100);
        assert!(matches!(history.redo().unwrap_err(), CoreError::NothingToRedo));
    }

    #[test]
    fn max_size_drops_oldest() {
        let mut history = History::new(2);
        history.reset(&one(10.0));
        history.record(HistoryAction::AdjustSegmentEnd, &one(9.0));
        history.record(HistoryAction::AdjustSegmentEnd, &one(8.0));
        history.record(HistoryAction::AdjustSegmentEnd, &one(7.0));

        assert_eq!(history.undo().unwrap()[0].end_time, 8.0);
        assert_eq!(history.undo().unwrap()[0].end_time, 9.0);
        assert!(history.undo().is_err());
    }

    #[test]
    fn reset_forgets_stacks() {
        let mut history = History::new(10);
        history.record(HistoryAction::CreateSegment, &one(5.0));
        history.reset(&one(3.0));
        assert!(!history.can_undo());
        assert_eq!(history.committed()[0].end_time, 3.0);
    }
}
