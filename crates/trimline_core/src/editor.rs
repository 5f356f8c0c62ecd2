use crate::config::EditorConfig;
use crate::controller::{EditContext, InteractionController, PointerKind, TimelineViewport, Tooltip};
use crate::editing;
use crate::error::Result;
use crate::events::{DragTarget, EditorEvent, EventBus};
use crate::gate::{MonitorOutcome, PlaybackGate};
use crate::history::History;
use crate::media::MediaElement;
use crate::store::{SegmentStore, StoreChange};
use crate::timefmt::parse_time_string;
use crate::types::*;
use crate::wire::{self, LoadedSegments};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info};

/// Receives a signal whenever a change should reach the server.
pub trait SaveScheduler {
    fn schedule_save(&self);
}

macro_rules! cx {
    ($editor:ident) => {
        EditContext {
            store: &mut $editor.store,
            gate: &mut $editor.gate,
            media: &mut $editor.media,
            events: &mut $editor.events,
        }
    };
}

/// Owns the editing core and routes every change through it: controller
/// mutation, store notification, gate re-arm, history, events, save signal.
pub struct TrimEditor<M: MediaElement> {
    config: EditorConfig,
    store: SegmentStore,
    gate: PlaybackGate,
    controller: InteractionController,
    history: History,
    events: EventBus,
    media: M,
    changes: Rc<RefCell<VecDeque<StoreChange>>>,
    saver: Option<Box<dyn SaveScheduler>>,
}

impl<M: MediaElement> TrimEditor<M> {
    pub fn new(media: M, config: EditorConfig) -> Self {
        let changes = Rc::new(RefCell::new(VecDeque::new()));
        let mut store = SegmentStore::new();
        let queue = changes.clone();
        store.subscribe(move |change| queue.borrow_mut().push_back(change.clone()));

        Self {
            gate: PlaybackGate::new(&config),
            controller: InteractionController::new(&config),
            history: History::new(config.history_max_size),
            events: EventBus::new(),
            config,
            store,
            media,
            changes,
            saver: None,
        }
    }

    pub fn set_save_scheduler(&mut self, saver: Box<dyn SaveScheduler>) {
        self.saver = Some(saver);
    }

    // ----- Accessors -----

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn segments(&self) -> &[Segment] {
        self.store.get()
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn gate(&self) -> &PlaybackGate {
        &self.gate
    }

    pub fn session(&self) -> &PlaybackSession {
        self.gate.session()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn tooltip(&self) -> &Tooltip {
        self.controller.tooltip()
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    /// Latest segment list, readable from other tasks.
    pub fn mirror(&self) -> watch::Receiver<Vec<Segment>> {
        self.store.mirror()
    }

    pub fn subscribe_events(&mut self, listener: impl FnMut(&EditorEvent) + 'static) {
        self.events.subscribe(listener);
    }

    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.events.drain()
    }

    // ----- Loading -----

    /// Replace everything with server data. Not recorded, never saved back.
    pub fn load(&mut self, loaded: &LoadedSegments) -> usize {
        let segments = wire::from_wire(loaded, self.media.duration());
        self.load_segments(&segments)
    }

    pub fn load_segments(&mut self, segments: &[Segment]) -> usize {
        let mut cx = cx!(self);
        cx.replace(segments, ReplaceOptions::loaded());
        self.flush();
        info!(count = segments.len(), "segments loaded");
        segments.len()
    }

    // ----- Playback -----

    pub fn play(&mut self) -> bool {
        self.gate.play(&mut self.media, self.store.get())
    }

    pub fn play_from_beginning(&mut self) -> bool {
        self.gate.play_from_beginning(&mut self.media, self.store.get())
    }

    pub fn pause(&mut self) {
        self.gate.pause(&mut self.media);
    }

    pub fn continue_past_boundary(&mut self) {
        self.gate.continue_past_boundary();
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.gate.set_mode(mode);
    }

    pub fn seek(&mut self, time: f64) -> Classification {
        self.gate.seek(&mut self.media, time, self.store.get())
    }

    /// Free-text "go to time". Malformed input is ignored.
    pub fn go_to_time(&mut self, input: &str) -> Option<Classification> {
        match parse_time_string(input) {
            Ok(time) => Some(self.click_at(time)),
            Err(err) => {
                debug!(input, %err, "ignoring go-to-time input");
                None
            }
        }
    }

    pub fn on_time_update(&mut self, now: Instant) -> MonitorOutcome {
        self.gate.on_time_update(&mut self.media, self.store.get(), now)
    }

    /// Service every deadline the core owns: boundary re-asserts and
    /// hold-to-repeat.
    pub fn on_timer(&mut self, now: Instant) {
        self.gate.on_timer(&mut self.media, now);
        if self.controller.is_holding() {
            let mut cx = cx!(self);
            self.controller.service_hold(&mut cx, now);
            self.flush();
        }
    }

    // ----- Gestures -----

    pub fn timeline_click(&mut self, viewport: &TimelineViewport, x: f64) -> Classification {
        let mut cx = cx!(self);
        let class = self.controller.timeline_click(&mut cx, viewport, x);
        self.flush();
        class
    }

    pub fn click_at(&mut self, time: f64) -> Classification {
        let mut cx = cx!(self);
        let class = self.controller.click_at(&mut cx, time);
        self.flush();
        class
    }

    /// Dismiss the click tooltip (pointer left the timeline, Escape).
    pub fn hide_tooltip(&mut self) {
        self.controller.hide_tooltip();
    }

    pub fn begin_drag(&mut self, target: DragTarget, kind: PointerKind) -> bool {
        let mut cx = cx!(self);
        let started = self.controller.begin_drag(&mut cx, target, kind);
        self.flush();
        started
    }

    pub fn drag_move(&mut self, viewport: &TimelineViewport, x: f64) -> bool {
        let mut cx = cx!(self);
        let moved = self.controller.drag_move(&mut cx, viewport, x);
        self.flush();
        moved
    }

    pub fn drag_move_to(&mut self, time: f64) -> bool {
        let mut cx = cx!(self);
        let moved = self.controller.drag_move_to(&mut cx, time);
        self.flush();
        moved
    }

    pub fn end_drag(&mut self) -> bool {
        let mut cx = cx!(self);
        let committed = self.controller.end_drag(&mut cx);
        self.flush();
        committed
    }

    pub fn cancel_drag(&mut self) -> bool {
        let mut cx = cx!(self);
        let committed = self.controller.cancel_drag(&mut cx);
        self.flush();
        committed
    }

    pub fn nudge(&mut self, target: DragTarget, delta: f64) -> bool {
        let mut cx = cx!(self);
        let moved = self.controller.nudge(&mut cx, target, delta);
        self.flush();
        moved
    }

    pub fn begin_hold(&mut self, target: DragTarget, delta: f64, now: Instant) -> bool {
        let mut cx = cx!(self);
        let started = self.controller.begin_hold(&mut cx, target, delta, now);
        self.flush();
        started
    }

    pub fn end_hold(&mut self) -> bool {
        let mut cx = cx!(self);
        let committed = self.controller.end_hold(&mut cx);
        self.flush();
        committed
    }

    // ----- Editing -----

    pub fn create_segment_in_gap(&mut self, time: f64) -> Result<SegmentId> {
        let mut cx = cx!(self);
        let created = self.controller.create_segment_in_gap(&mut cx, time);
        self.flush();
        created
    }

    /// Announce and perform a split. Returns the id of the right half.
    pub fn request_split(&mut self, segment_id: SegmentId, time: f64) -> Result<SegmentId> {
        let mut cx = cx!(self);
        self.controller.request_split(&mut cx, segment_id, time);
        self.split_segment(segment_id, time)
    }

    pub fn split_segment(&mut self, segment_id: SegmentId, time: f64) -> Result<SegmentId> {
        let (updated, left, right) = editing::split_at(
            self.store.get(),
            segment_id,
            time,
            self.config.min_segment_duration,
        )?;
        let mut cx = cx!(self);
        cx.replace(&updated, ReplaceOptions::recorded(HistoryAction::SplitSegment));
        cx.gate.select(Some(left));
        self.flush();
        debug!(segment_id, time, right, "segment split");
        Ok(right)
    }

    pub fn delete_segment(&mut self, segment_id: SegmentId) -> Result<()> {
        let mut cx = cx!(self);
        let deleted = self.controller.delete_segment(&mut cx, segment_id);
        self.flush();
        deleted
    }

    pub fn undo(&mut self) -> Result<()> {
        let restored = self.history.undo()?;
        self.restore(&restored, HistoryAction::Undo);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        let restored = self.history.redo()?;
        self.restore(&restored, HistoryAction::Redo);
        Ok(())
    }

    fn restore(&mut self, segments: &[Segment], action: HistoryAction) {
        let mut cx = cx!(self);
        cx.replace(segments, ReplaceOptions::transient(action));
        self.flush();
    }

    /// Drop gesture state and stop playback.
    pub fn dispose(&mut self) {
        self.controller.dispose();
        self.gate.pause(&mut self.media);
    }

    // ----- Change propagation -----

    /// Turn queued store notifications into history entries, events and
    /// save signals.
    fn flush(&mut self) {
        loop {
            let Some(change) = self.changes.borrow_mut().pop_front() else {
                break;
            };
            let options = change.options;

            match options.action {
                Some(action) if options.record_history => {
                    self.history.record(action, &change.segments);
                }
                Some(HistoryAction::LoadSegments) => self.history.reset(&change.segments),
                _ => {}
            }

            let restored = matches!(options.action, Some(HistoryAction::Undo | HistoryAction::Redo));
            if options.triggers_save() || restored {
                if let Some(saver) = &self.saver {
                    saver.schedule_save();
                }
            }

            self.controller
                .refresh_tooltip(&change.segments, self.media.duration());
            self.events.emit(EditorEvent::SegmentListChanged {
                segments: change.segments,
                record_history: options.record_history,
                action: options.action,
                from_auto_save: options.from_auto_save,
            });
        }
    }
}

impl<M: MediaElement + std::fmt::Debug> std::fmt::Debug for TrimEditor<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrimEditor")
            .field("store", &self.store)
            .field("gate", &self.gate)
            .field("media", &self.media)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
