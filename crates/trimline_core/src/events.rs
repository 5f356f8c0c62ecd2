use crate::types::*;
use serde::Serialize;
use std::fmt;

/// Which edge (or the playhead) a drag gesture moves.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "segmentId", rename_all = "camelCase")]
pub enum DragTarget {
    SegmentStart(SegmentId),
    SegmentEnd(SegmentId),
    /// Start of the earliest segment.
    TrimStart,
    /// End of the latest segment.
    TrimEnd,
    Playhead,
}

/// Application-level notifications for sibling UI.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum EditorEvent {
    #[serde(rename_all = "camelCase")]
    SegmentListChanged {
        segments: Vec<Segment>,
        record_history: bool,
        action: Option<HistoryAction>,
        from_auto_save: bool,
    },
    #[serde(rename_all = "camelCase")]
    TrimBoundaryChanged {
        segment_id: SegmentId,
        start_time: f64,
        end_time: f64,
    },
    #[serde(rename_all = "camelCase")]
    DragStarted {
        target: DragTarget,
        segment_id: Option<SegmentId>,
    },
    #[serde(rename_all = "camelCase")]
    DragEnded {
        target: DragTarget,
        segment_id: Option<SegmentId>,
    },
    #[serde(rename_all = "camelCase")]
    SplitRequested { segment_id: SegmentId, time: f64 },
    #[serde(rename_all = "camelCase")]
    DeleteRequested { segment_id: SegmentId },
}

impl EditorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EditorEvent::SegmentListChanged { .. } => "segment-list-changed",
            EditorEvent::TrimBoundaryChanged { .. } => "trim-boundary-changed",
            EditorEvent::DragStarted { .. } => "drag-started",
            EditorEvent::DragEnded { .. } => "drag-ended",
            EditorEvent::SplitRequested { .. } => "split-requested",
            EditorEvent::DeleteRequested { .. } => "delete-requested",
        }
    }
}

type Listener = Box<dyn FnMut(&EditorEvent)>;

/// In-process event bus. Listeners run synchronously on `emit`; events are
/// also queued for hosts that prefer to poll with `drain`.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
    pending: Vec<EditorEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&EditorEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&mut self, event: EditorEvent) {
        tracing::trace!(event = event.name(), "emit");
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
        self.pending.push(event);
    }

    pub fn drain(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.pending)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emit_reaches_listeners_and_queue() {
        let mut bus = EventBus::new();
        let names = Rc::new(RefCell::new(Vec::new()));
        let sink = names.clone();
        bus.subscribe(move |e| sink.borrow_mut().push(e.name()));

        bus.emit(EditorEvent::DeleteRequested { segment_id: 3 });
        bus.emit(EditorEvent::SplitRequested { segment_id: 3, time: 4.5 });

        assert_eq!(*names.borrow(), vec!["delete-requested", "split-requested"]);
        assert_eq!(bus.drain().len(), 2);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn payload_shape() {
        let event = EditorEvent::SplitRequested { segment_id: 7, time: 1.25 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "split-requested");
        assert_eq!(json["payload"]["segmentId"], 7);
        assert_eq!(json["payload"]["time"], 1.25);

        let drag = EditorEvent::DragStarted {
            target: DragTarget::SegmentEnd(7),
            segment_id: Some(7),
        };
        let json = serde_json::to_value(&drag).unwrap();
        assert_eq!(json["type"], "drag-started");
        assert_eq!(json["payload"]["target"]["kind"], "segmentEnd");
        assert_eq!(json["payload"]["target"]["segmentId"], 7);
    }
}
