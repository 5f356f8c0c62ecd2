//! Pointer and touch gestures on the timeline.
//!
//! Every mutation the controller originates is clamped so segments never
//! overlap and never shrink below the minimum duration. Intermediate gesture
//! states reach the store as transient replacements; only the release is
//! recorded in history.

use crate::config::EditorConfig;
use crate::editing;
use crate::error::{CoreError, Result};
use crate::events::{DragTarget, EditorEvent, EventBus};
use crate::gate::PlaybackGate;
use crate::media::MediaElement;
use crate::resolver::BoundaryResolver;
use crate::snapping::{clamp_between, find_snap_point};
use crate::store::SegmentStore;
use crate::types::*;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

// ---------------------------------------------------------------------------
// Viewport and gesture plumbing
// ---------------------------------------------------------------------------

/// Geometry needed to turn a pointer X into a time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineViewport {
    pub left: f64,
    pub visible_width: f64,
    pub scroll_left: f64,
    pub zoom: f64,
}

impl TimelineViewport {
    pub fn time_at(&self, x: f64, duration: f64) -> f64 {
        let width = self.visible_width * self.zoom;
        if width <= 0.0 || duration <= 0.0 {
            return 0.0;
        }
        let time = (x - self.left + self.scroll_left) / width * duration;
        clamp_between(time, 0.0, duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureListener {
    PointerMove,
    PointerUp,
    TouchMove,
    TouchEnd,
    TouchCancel,
}

impl PointerKind {
    fn listeners(self) -> &'static [GestureListener] {
        match self {
            PointerKind::Mouse => &[GestureListener::PointerMove, GestureListener::PointerUp],
            PointerKind::Touch => &[
                GestureListener::TouchMove,
                GestureListener::TouchEnd,
                GestureListener::TouchCancel,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Tooltip {
    Hidden,
    #[serde(rename_all = "camelCase")]
    Segment { segment_id: SegmentId, time: f64 },
    #[serde(rename_all = "camelCase")]
    Gap {
        time: f64,
        available_space: f64,
        can_create: bool,
    },
}

/// Borrowed view of everything a gesture touches.
pub struct EditContext<'a, M: MediaElement + ?Sized> {
    pub store: &'a mut SegmentStore,
    pub gate: &'a mut PlaybackGate,
    pub media: &'a mut M,
    pub events: &'a mut EventBus,
}

impl<M: MediaElement + ?Sized> EditContext<'_, M> {
    /// Replace the store contents and let the gate react to the new list.
    pub fn replace(&mut self, segments: &[Segment], options: ReplaceOptions) {
        self.store.replace_all(segments, options);
        self.gate.on_segments_changed(&mut *self.media, self.store.get());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    End,
}

fn edge_of(target: DragTarget) -> Option<Edge> {
    match target {
        DragTarget::SegmentStart(_) | DragTarget::TrimStart => Some(Edge::Start),
        DragTarget::SegmentEnd(_) | DragTarget::TrimEnd => Some(Edge::End),
        DragTarget::Playhead => None,
    }
}

fn action_of(target: DragTarget) -> Option<HistoryAction> {
    match target {
        DragTarget::SegmentStart(_) => Some(HistoryAction::AdjustSegmentStart),
        DragTarget::SegmentEnd(_) => Some(HistoryAction::AdjustSegmentEnd),
        DragTarget::TrimStart => Some(HistoryAction::AdjustTrimStart),
        DragTarget::TrimEnd => Some(HistoryAction::AdjustTrimEnd),
        DragTarget::Playhead => None,
    }
}

/// Snapshot taken when a gesture starts.
#[derive(Debug, Clone, PartialEq)]
struct GestureState {
    target: DragTarget,
    segment_id: Option<SegmentId>,
    original: Option<(f64, f64)>,
    last_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
struct HoldState {
    gesture: GestureState,
    delta: f64,
    next_fire: Instant,
}

// ---------------------------------------------------------------------------
// InteractionController
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InteractionController {
    resolver: BoundaryResolver,
    min_segment_duration: f64,
    snap_threshold: f64,
    nudge_step: f64,
    hold_initial_delay: Duration,
    hold_repeat_interval: Duration,
    drag: Option<GestureState>,
    hold: Option<HoldState>,
    listeners: Vec<GestureListener>,
    tooltip: Tooltip,
}

impl InteractionController {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            resolver: BoundaryResolver::from_config(config),
            min_segment_duration: config.min_segment_duration,
            snap_threshold: config.snap_threshold,
            nudge_step: config.nudge_step,
            hold_initial_delay: config.hold_initial_delay(),
            hold_repeat_interval: config.hold_repeat_interval(),
            drag: None,
            hold: None,
            listeners: Vec::new(),
            tooltip: Tooltip::Hidden,
        }
    }

    pub fn tooltip(&self) -> &Tooltip {
        &self.tooltip
    }

    pub fn hide_tooltip(&mut self) {
        self.tooltip = Tooltip::Hidden;
    }

    /// Listeners currently registered for an in-flight gesture.
    pub fn listeners(&self) -> &[GestureListener] {
        &self.listeners
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn drag_target(&self) -> Option<DragTarget> {
        self.drag.as_ref().map(|d| d.target)
    }

    pub fn nudge_step(&self) -> f64 {
        self.nudge_step
    }

    // -----------------------------------------------------------------------
    // Clicks and tooltip
    // -----------------------------------------------------------------------

    pub fn timeline_click<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        viewport: &TimelineViewport,
        x: f64,
    ) -> Classification {
        let time = viewport.time_at(x, cx.media.duration());
        self.click_at(cx, time)
    }

    /// Seek to `time`, classify it and show the matching tooltip. Playback
    /// that was running resumes from the new position.
    pub fn click_at<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        time: f64,
    ) -> Classification {
        let was_playing = cx.gate.is_playing();
        if was_playing {
            cx.gate.pause(&mut *cx.media);
        }
        let class = cx.gate.seek(&mut *cx.media, time, cx.store.get());
        let landed = cx.media.current_time();
        self.tooltip = self.tooltip_for(landed, &class);
        if was_playing {
            cx.gate.play(&mut *cx.media, cx.store.get());
        }
        class
    }

    /// Re-classify the tooltip's position against the current list.
    pub fn refresh_tooltip(&mut self, segments: &[Segment], duration: f64) {
        let time = match self.tooltip {
            Tooltip::Hidden => return,
            Tooltip::Segment { time, .. } | Tooltip::Gap { time, .. } => time,
        };
        let class = self.resolver.classify(time, segments, duration);
        self.tooltip = self.tooltip_for(time, &class);
    }

    fn tooltip_for(&self, time: f64, class: &Classification) -> Tooltip {
        match class {
            Classification::Segment(segment) => Tooltip::Segment {
                segment_id: segment.id,
                time,
            },
            Classification::Gap { available_space } => Tooltip::Gap {
                time,
                available_space: *available_space,
                can_create: self.resolver.is_useful_gap(*available_space),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Drag protocol
    // -----------------------------------------------------------------------

    /// Start a drag. Returns false when the target does not resolve to a
    /// segment (trim handles on an empty timeline, a stale id).
    pub fn begin_drag<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        target: DragTarget,
        kind: PointerKind,
    ) -> bool {
        if self.drag.is_some() {
            self.end_drag(cx);
        }
        let Some(gesture) = self.snapshot(target, cx.store.get()) else {
            debug!(?target, "drag target does not resolve");
            return false;
        };

        self.listeners = kind.listeners().to_vec();
        if let Some(id) = gesture.segment_id {
            cx.gate.select(Some(id));
        }
        cx.events.emit(EditorEvent::DragStarted {
            target,
            segment_id: gesture.segment_id,
        });
        debug!(?target, segment_id = ?gesture.segment_id, "drag started");
        self.drag = Some(gesture);
        true
    }

    pub fn drag_move<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        viewport: &TimelineViewport,
        x: f64,
    ) -> bool {
        let time = viewport.time_at(x, cx.media.duration());
        self.drag_move_to(cx, time)
    }

    /// Move the dragged edge (or the playhead) toward `time`.
    pub fn drag_move_to<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        time: f64,
    ) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        drag.last_time = Some(time);
        let (target, segment_id) = (drag.target, drag.segment_id);

        match (edge_of(target), segment_id, action_of(target)) {
            (Some(edge), Some(id), Some(action)) => self
                .apply_edge(cx, id, edge, time, true, ReplaceOptions::transient(action))
                .is_some(),
            _ => {
                let class = cx.gate.seek(&mut *cx.media, time, cx.store.get());
                let landed = cx.media.current_time();
                self.tooltip = self.tooltip_for(landed, &class);
                true
            }
        }
    }

    /// Release. Commits the edge as one recorded change when it moved.
    pub fn end_drag<M: MediaElement + ?Sized>(&mut self, cx: &mut EditContext<'_, M>) -> bool {
        self.listeners.clear();
        let Some(drag) = self.drag.take() else {
            return false;
        };
        let committed = self.commit_gesture(cx, &drag);
        cx.events.emit(EditorEvent::DragEnded {
            target: drag.target,
            segment_id: drag.segment_id,
        });
        debug!(target = ?drag.target, committed, "drag ended");
        committed
    }

    /// Touch cancel and lost pointer capture. Applies the last known position
    /// exactly like a release.
    pub fn cancel_drag<M: MediaElement + ?Sized>(&mut self, cx: &mut EditContext<'_, M>) -> bool {
        self.end_drag(cx)
    }

    fn snapshot(&self, target: DragTarget, segments: &[Segment]) -> Option<GestureState> {
        let segment_id = match target {
            DragTarget::SegmentStart(id) | DragTarget::SegmentEnd(id) => {
                Some(segments.iter().find(|s| s.id == id)?.id)
            }
            DragTarget::TrimStart => Some(sorted_refs(segments).first()?.id),
            DragTarget::TrimEnd => Some(
                segments
                    .iter()
                    .max_by(|a, b| a.end_time.total_cmp(&b.end_time).then_with(|| a.id.cmp(&b.id)))?
                    .id,
            ),
            DragTarget::Playhead => None,
        };
        let original = segment_id
            .and_then(|id| segments.iter().find(|s| s.id == id))
            .map(|s| (s.start_time, s.end_time));
        Some(GestureState {
            target,
            segment_id,
            original,
            last_time: None,
        })
    }

    /// Record the gesture's final bounds if they differ from the snapshot,
    /// then drop the active segment if the playhead ended up outside it.
    fn commit_gesture<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        gesture: &GestureState,
    ) -> bool {
        let (Some(id), Some(action)) = (gesture.segment_id, action_of(gesture.target)) else {
            return false;
        };
        let Some(current) = cx.store.find(id).map(|s| (s.start_time, s.end_time)) else {
            return false;
        };
        if gesture.original == Some(current) {
            return false;
        }

        let segments = cx.store.get().to_vec();
        cx.replace(&segments, ReplaceOptions::recorded(action));
        cx.gate.release_if_outside(&mut *cx.media, id, cx.store.get());
        self.refresh_tooltip(cx.store.get(), cx.media.duration());
        true
    }

    /// The new value for one edge of `id`: snapped to the neighbour's
    /// adjacent edge, clamped against that neighbour and the minimum
    /// duration. The neighbour wins when the two limits cross.
    fn constrained_edge(
        &self,
        segments: &[Segment],
        id: SegmentId,
        edge: Edge,
        proposed: f64,
        duration: f64,
        snap: bool,
    ) -> Option<f64> {
        let segment = segments.iter().find(|s| s.id == id)?;
        let tolerance = self.resolver.edge_tolerance;
        let others = segments.iter().filter(|s| s.id != id);

        let value = match edge {
            Edge::Start => {
                let neighbour = others
                    .filter(|s| s.end_time <= segment.start_time + tolerance)
                    .map(|s| s.end_time)
                    .fold(None, |acc: Option<f64>, end| Some(acc.map_or(end, |a| a.max(end))));
                let lo = neighbour.unwrap_or(0.0);
                let hi = segment.end_time - self.min_segment_duration;
                let snapped = match neighbour {
                    Some(edge) if snap => find_snap_point(proposed, &[edge], self.snap_threshold),
                    _ => proposed,
                };
                clamp_between(snapped, lo, hi)
            }
            Edge::End => {
                let neighbour = others
                    .filter(|s| s.start_time >= segment.end_time - tolerance)
                    .map(|s| s.start_time)
                    .fold(None, |acc: Option<f64>, start| Some(acc.map_or(start, |a| a.min(start))));
                let hi = neighbour.unwrap_or(duration);
                let lo = segment.start_time + self.min_segment_duration;
                let snapped = match neighbour {
                    Some(edge) if snap => find_snap_point(proposed, &[edge], self.snap_threshold),
                    _ => proposed,
                };
                snapped.max(lo).min(hi)
            }
        };
        Some(value)
    }

    fn apply_edge<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        id: SegmentId,
        edge: Edge,
        proposed: f64,
        snap: bool,
        options: ReplaceOptions,
    ) -> Option<(f64, f64)> {
        let duration = cx.media.duration();
        let value = self.constrained_edge(cx.store.get(), id, edge, proposed, duration, snap)?;

        let mut updated = cx.store.get().to_vec();
        let segment = updated.iter_mut().find(|s| s.id == id)?;
        match edge {
            Edge::Start => segment.start_time = value,
            Edge::End => segment.end_time = value,
        }
        let (start_time, end_time) = (segment.start_time, segment.end_time);

        cx.replace(&updated, options);
        cx.events.emit(EditorEvent::TrimBoundaryChanged {
            segment_id: id,
            start_time,
            end_time,
        });
        Some((start_time, end_time))
    }

    // -----------------------------------------------------------------------
    // Creation, split, delete
    // -----------------------------------------------------------------------

    /// Fill the gap at `time` with a new segment reaching to the next segment
    /// (or the end of media). Returns the new id.
    pub fn create_segment_in_gap<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        time: f64,
    ) -> Result<SegmentId> {
        let duration = cx.media.duration();
        let segments = cx.store.get();
        let available_space = match self.resolver.classify(time, segments, duration) {
            Classification::Gap { available_space } => available_space,
            Classification::Segment(segment) => {
                return Err(CoreError::InvalidOperation(format!(
                    "{:.3} is inside segment {}",
                    time, segment.id
                )));
            }
        };
        if !self.resolver.is_useful_gap(available_space) {
            return Err(CoreError::InvalidOperation(format!(
                "gap of {available_space:.3}s is too small for a segment"
            )));
        }

        let id = editing::next_segment_id(segments);
        let name = format!("Segment {}", segments.len() + 1);
        let end = (time + available_space).min(duration);
        let updated = editing::insert_segment(segments, Segment::new(id, name, time, end))?;

        cx.replace(&updated, ReplaceOptions::recorded(HistoryAction::CreateSegment));
        cx.gate.select(Some(id));
        self.tooltip = Tooltip::Segment { segment_id: id, time };
        debug!(id, start = time, end, "segment created in gap");
        Ok(id)
    }

    /// Ask the editor to split `segment_id` at `time`. The tooltip stays open.
    pub fn request_split<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        segment_id: SegmentId,
        time: f64,
    ) -> bool {
        if cx.store.find(segment_id).is_none() {
            return false;
        }
        cx.events.emit(EditorEvent::SplitRequested { segment_id, time });
        true
    }

    /// Remove a segment. Removing the last one leaves a single segment
    /// spanning the whole media, selected.
    pub fn delete_segment<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        segment_id: SegmentId,
    ) -> Result<()> {
        let (mut remaining, removed) = editing::remove_segment(cx.store.get(), segment_id)?;
        cx.events.emit(EditorEvent::DeleteRequested { segment_id });

        let mut select = None;
        if remaining.is_empty() {
            let id = editing::next_segment_id(std::slice::from_ref(&removed));
            remaining.push(Segment::new(id, "Segment 1", 0.0, cx.media.duration()));
            select = Some(id);
        }

        cx.replace(&remaining, ReplaceOptions::recorded(HistoryAction::DeleteSegment));
        if select.is_some() {
            cx.gate.select(select);
        }
        self.refresh_tooltip(cx.store.get(), cx.media.duration());
        debug!(segment_id, replaced = select.is_some(), "segment deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Fine adjustment
    // -----------------------------------------------------------------------

    /// Move an edge (or the playhead) by `delta` seconds as one recorded step.
    pub fn nudge<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        target: DragTarget,
        delta: f64,
    ) -> bool {
        let Some(gesture) = self.snapshot(target, cx.store.get()) else {
            return false;
        };
        if !self.step(cx, &gesture, delta) {
            return false;
        }
        self.commit_gesture(cx, &gesture)
    }

    /// Press-and-hold: one step now, then repeats serviced by `service_hold`.
    pub fn begin_hold<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        target: DragTarget,
        delta: f64,
        now: Instant,
    ) -> bool {
        self.end_hold(cx);
        let Some(gesture) = self.snapshot(target, cx.store.get()) else {
            return false;
        };
        self.step(cx, &gesture, delta);
        self.hold = Some(HoldState {
            gesture,
            delta,
            next_fire: now + self.hold_initial_delay,
        });
        true
    }

    /// Apply every repeat due by `now`. Returns how many fired.
    pub fn service_hold<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        now: Instant,
    ) -> usize {
        let Some(mut hold) = self.hold.take() else {
            return 0;
        };
        let mut fired = 0;
        while hold.next_fire <= now {
            self.step(cx, &hold.gesture, hold.delta);
            hold.next_fire += self.hold_repeat_interval;
            fired += 1;
        }
        self.hold = Some(hold);
        fired
    }

    /// Release the hold, recording the accumulated change once.
    pub fn end_hold<M: MediaElement + ?Sized>(&mut self, cx: &mut EditContext<'_, M>) -> bool {
        match self.hold.take() {
            Some(hold) => self.commit_gesture(cx, &hold.gesture),
            None => false,
        }
    }

    pub fn is_holding(&self) -> bool {
        self.hold.is_some()
    }

    /// One transient step. Snapping only pulls toward a neighbour, so an
    /// edge can be nudged away from an adjacent segment.
    fn step<M: MediaElement + ?Sized>(
        &mut self,
        cx: &mut EditContext<'_, M>,
        gesture: &GestureState,
        delta: f64,
    ) -> bool {
        match (edge_of(gesture.target), gesture.segment_id, action_of(gesture.target)) {
            (Some(edge), Some(id), Some(action)) => {
                let Some(segment) = cx.store.find(id) else {
                    return false;
                };
                let current = match edge {
                    Edge::Start => segment.start_time,
                    Edge::End => segment.end_time,
                };
                let toward_neighbour = match edge {
                    Edge::Start => delta < 0.0,
                    Edge::End => delta > 0.0,
                };
                self.apply_edge(
                    cx,
                    id,
                    edge,
                    current + delta,
                    toward_neighbour,
                    ReplaceOptions::transient(action),
                )
                .is_some()
            }
            _ => {
                let position = cx.media.current_time();
                cx.gate.seek(&mut *cx.media, position + delta, cx.store.get());
                true
            }
        }
    }

    /// Drop all gesture state and listeners without committing.
    pub fn dispose(&mut self) {
        self.drag = None;
        self.hold = None;
        self.listeners.clear();
        self.tooltip = Tooltip::Hidden;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
