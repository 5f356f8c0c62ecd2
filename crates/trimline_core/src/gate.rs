//! Boundary-aware playback.
//!
//! The gate wraps the media element's play/pause/seek. Before playback starts
//! it computes a stop time (the end of the segment under the playhead, or the
//! start of the next segment when playing a gap) and the time-update monitor
//! pauses and snaps the element to that boundary. It is the only component
//! that writes the element's position while a session is live.

use crate::config::EditorConfig;
use crate::media::MediaElement;
use crate::resolver::BoundaryResolver;
use crate::snapping::clamp_between;
use crate::types::*;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Synchronous re-writes attempted when the element ignores a position write.
const IMMEDIATE_REASSERTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateState {
    Idle,
    PlayingBounded { stop_time: f64 },
    /// Override active: `boundary` is crossed without stopping.
    PlayingUnbounded { boundary: f64 },
}

/// What a time update did.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorOutcome {
    Continue,
    BoundaryStop {
        stop_time: f64,
        selected: Option<SegmentId>,
    },
    /// Reached a segment end where another segment begins; kept playing.
    Chained {
        segment_id: SegmentId,
        stop_time: f64,
    },
    QueueAdvanced {
        index: usize,
        segment_id: SegmentId,
    },
    /// Crossed the overridden boundary and armed against the next one.
    Rearmed { stop_time: f64 },
}

#[derive(Debug, Clone, PartialEq)]
struct PlaybackPlan {
    stop_time: f64,
    active: Option<SegmentId>,
    cutaway: Option<Segment>,
}

#[derive(Debug, Clone)]
struct Correction {
    target: f64,
    due: VecDeque<Instant>,
}

#[derive(Debug, Clone)]
pub struct PlaybackGate {
    resolver: BoundaryResolver,
    boundary_epsilon: f64,
    correction_delays: Vec<Duration>,
    state: GateState,
    mode: PlaybackMode,
    session: PlaybackSession,
    cutaway: Option<Segment>,
    correction: Option<Correction>,
}

impl PlaybackGate {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            resolver: BoundaryResolver::from_config(config),
            boundary_epsilon: config.boundary_epsilon,
            correction_delays: config.correction_delays(),
            state: GateState::Idle,
            mode: PlaybackMode::Normal,
            session: PlaybackSession::default(),
            cutaway: None,
            correction: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// The virtual segment spanning the gap being played, if any.
    pub fn cutaway(&self) -> Option<&Segment> {
        self.cutaway.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.state != GateState::Idle
    }

    pub fn has_pending_correction(&self) -> bool {
        self.correction.is_some()
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        if self.mode != mode {
            debug!(?mode, "playback mode changed");
            self.mode = mode;
            self.session.queue_index = None;
        }
    }

    pub fn select(&mut self, segment_id: Option<SegmentId>) {
        self.session.selected_segment_id = segment_id;
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Start playback from the current position. Returns whether the element
    /// is now playing.
    pub fn play<M: MediaElement + ?Sized>(&mut self, media: &mut M, segments: &[Segment]) -> bool {
        self.correction = None;
        let position = media.current_time();
        let duration = media.duration();

        match self.mode {
            PlaybackMode::Normal => {
                let plan = self.plan(position, segments, duration, None);
                if plan.stop_time >= duration - self.boundary_epsilon
                    && plan.stop_time - position <= self.boundary_epsilon
                {
                    debug!(position, "at end of media, nothing to play");
                    return false;
                }
                self.arm(plan, position);
            }
            PlaybackMode::SegmentsQueue => {
                if !self.arm_queue(media, segments) {
                    debug!(position, "no segment left to queue");
                    return false;
                }
            }
        }

        match media.play() {
            Ok(()) => {
                self.session.is_playing_segment = true;
                debug!(position, state = ?self.state, "playback armed");
                true
            }
            Err(err) => {
                debug!(%err, "play() rejected");
                self.reset_to_idle();
                false
            }
        }
    }

    /// Seek to zero and play.
    pub fn play_from_beginning<M: MediaElement + ?Sized>(
        &mut self,
        media: &mut M,
        segments: &[Segment],
    ) -> bool {
        self.seek(media, 0.0, segments);
        self.play(media, segments)
    }

    /// Let playback run through the boundary it is currently heading for.
    /// When idle, applies to the next `play`.
    pub fn continue_past_boundary(&mut self) {
        self.session.continue_past_boundary = true;
        if let GateState::PlayingBounded { stop_time } = self.state {
            self.state = GateState::PlayingUnbounded { boundary: stop_time };
        }
    }

    /// Explicit pause. Keeps the active segment so a resume continues it.
    pub fn pause<M: MediaElement + ?Sized>(&mut self, media: &mut M) {
        media.pause();
        self.correction = None;
        self.reset_to_idle();
    }

    /// The single seek entry point. Clamps to the media, updates the
    /// selection and, while playing, re-plans from the new position.
    pub fn seek<M: MediaElement + ?Sized>(
        &mut self,
        media: &mut M,
        time: f64,
        segments: &[Segment],
    ) -> Classification {
        let duration = media.duration();
        let target = clamp_between(time, 0.0, duration.max(0.0));
        self.correction = None;
        media.set_current_time(target);
        self.session.last_seeked_position = Some(target);

        let class = self.resolver.classify(target, segments, duration);
        self.session.selected_segment_id = class.segment_id();

        if self.is_playing() {
            self.rearm_from_position(media, segments);
        } else {
            self.session.active_segment_id = class.segment_id();
            self.session.queue_index = None;
        }
        class
    }

    // -----------------------------------------------------------------------
    // Monitor
    // -----------------------------------------------------------------------

    /// Called on every media time update.
    pub fn on_time_update<M: MediaElement + ?Sized>(
        &mut self,
        media: &mut M,
        segments: &[Segment],
        now: Instant,
    ) -> MonitorOutcome {
        let position = media.current_time();
        match self.state {
            GateState::Idle => MonitorOutcome::Continue,
            GateState::PlayingUnbounded { boundary } => {
                if position <= boundary {
                    return MonitorOutcome::Continue;
                }
                self.session.continue_past_boundary = false;
                let plan = self.plan(position, segments, media.duration(), Some(boundary));
                let stop_time = plan.stop_time;
                self.arm(plan, position);
                debug!(boundary, stop_time, "crossed boundary, re-armed");
                MonitorOutcome::Rearmed { stop_time }
            }
            GateState::PlayingBounded { stop_time } => {
                if stop_time - position > self.boundary_epsilon {
                    return MonitorOutcome::Continue;
                }
                self.reach_boundary(media, segments, stop_time, now)
            }
        }
    }

    /// Run deferred position re-asserts that are due. Returns whether any
    /// write was needed.
    pub fn on_timer<M: MediaElement + ?Sized>(&mut self, media: &mut M, now: Instant) -> bool {
        let tolerance = self.resolver.edge_tolerance;
        let Some(correction) = self.correction.as_mut() else {
            return false;
        };

        let mut reasserted = false;
        while correction.due.front().is_some_and(|due| *due <= now) {
            correction.due.pop_front();
            if (media.current_time() - correction.target).abs() > tolerance {
                trace!(target = correction.target, "re-asserting boundary position");
                media.set_current_time(correction.target);
                reasserted = true;
            }
        }
        if correction.due.is_empty() {
            self.correction = None;
        }
        reasserted
    }

    /// React to a store replacement made while a session may be live.
    /// Returns true if the edit forced a pause.
    pub fn on_segments_changed<M: MediaElement + ?Sized>(
        &mut self,
        media: &mut M,
        segments: &[Segment],
    ) -> bool {
        let exists = |id: SegmentId| segments.iter().any(|s| s.id == id);
        if self.session.selected_segment_id.is_some_and(|id| !exists(id)) {
            self.session.selected_segment_id = None;
        }
        if !self.is_playing() {
            if self.session.active_segment_id.is_some_and(|id| !exists(id)) {
                self.session.active_segment_id = None;
            }
            return false;
        }

        let position = media.current_time();
        let duration = media.duration();
        let Some(active_id) = self.session.active_segment_id else {
            if self.cutaway.is_some() {
                let plan = self.plan(position, segments, duration, None);
                self.arm(plan, position);
            }
            return false;
        };

        let Some(segment) = segments.iter().find(|s| s.id == active_id) else {
            self.session.active_segment_id = None;
            self.session.queue_index = None;
            self.cutaway = None;
            if self.mode == PlaybackMode::SegmentsQueue {
                debug!(active_id, position, "active segment vanished, moving to next queued segment");
                if !self.arm_queue(media, segments) {
                    media.pause();
                    self.reset_to_idle();
                    return true;
                }
                return false;
            }
            debug!(active_id, "active segment vanished, playing to end of media");
            self.state = GateState::PlayingBounded { stop_time: duration };
            return false;
        };

        let tolerance = self.resolver.edge_tolerance;
        if position < segment.start_time - tolerance || position > segment.end_time + tolerance {
            let clamped = if position < segment.start_time {
                segment.start_time
            } else {
                segment.end_time
            };
            media.pause();
            media.set_current_time(clamped);
            self.reset_to_idle();
            debug!(active_id, position, clamped, "edit left playhead outside active segment");
            return true;
        }

        let end = segment.end_time;
        self.state = if self.session.continue_past_boundary {
            GateState::PlayingUnbounded { boundary: end }
        } else {
            GateState::PlayingBounded { stop_time: end }
        };
        if self.mode == PlaybackMode::SegmentsQueue {
            self.session.queue_index = sorted_refs(segments).iter().position(|s| s.id == active_id);
        }
        false
    }

    /// After a resize: if the playhead is no longer inside `segment_id` and
    /// that segment was active, stop and clear it. Returns true if cleared.
    pub fn release_if_outside<M: MediaElement + ?Sized>(
        &mut self,
        media: &mut M,
        segment_id: SegmentId,
        segments: &[Segment],
    ) -> bool {
        if self.session.active_segment_id != Some(segment_id) {
            return false;
        }
        let Some(segment) = segments.iter().find(|s| s.id == segment_id) else {
            return false;
        };
        if segment.contains(media.current_time(), self.resolver.edge_tolerance) {
            return false;
        }
        if self.is_playing() {
            media.pause();
            self.reset_to_idle();
        }
        self.session.active_segment_id = None;
        true
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn reset_to_idle(&mut self) {
        self.state = GateState::Idle;
        self.session.is_playing_segment = false;
        self.session.continue_past_boundary = false;
        self.cutaway = None;
    }

    /// Stop time for playback starting at `position`. With `crossed`, segments
    /// ending at or before that boundary are ignored so playback moves on.
    fn plan(
        &self,
        position: f64,
        segments: &[Segment],
        duration: f64,
        crossed: Option<f64>,
    ) -> PlaybackPlan {
        let tolerance = self.resolver.edge_tolerance;
        let candidates: Vec<Segment> = match crossed {
            Some(boundary) => segments
                .iter()
                .filter(|s| s.end_time > boundary + tolerance)
                .cloned()
                .collect(),
            None => segments.to_vec(),
        };

        match self.resolver.classify(position, &candidates, duration) {
            Classification::Segment(segment) => PlaybackPlan {
                stop_time: segment.end_time,
                active: Some(segment.id),
                cutaway: None,
            },
            Classification::Gap { .. } => {
                let (gap_start, gap_end) = self.resolver.gap_bounds(position, &candidates, duration);
                let gap_start = crossed.map_or(gap_start, |b| gap_start.max(b)).min(position);
                PlaybackPlan {
                    stop_time: gap_end,
                    active: None,
                    cutaway: Some(Segment::virtual_cutaway(gap_start, gap_end)),
                }
            }
        }
    }

    fn arm(&mut self, plan: PlaybackPlan, position: f64) {
        self.session.active_segment_id = plan.active;
        if plan.active.is_some() {
            self.session.selected_segment_id = plan.active;
        }
        self.cutaway = plan.cutaway;

        if self.session.continue_past_boundary || plan.stop_time - position <= self.boundary_epsilon {
            self.session.continue_past_boundary = true;
            self.state = GateState::PlayingUnbounded {
                boundary: plan.stop_time,
            };
        } else {
            self.state = GateState::PlayingBounded {
                stop_time: plan.stop_time,
            };
        }
    }

    fn rearm_from_position<M: MediaElement + ?Sized>(&mut self, media: &mut M, segments: &[Segment]) {
        let position = media.current_time();
        self.session.continue_past_boundary = false;
        match self.mode {
            PlaybackMode::Normal => {
                let plan = self.plan(position, segments, media.duration(), None);
                self.arm(plan, position);
            }
            PlaybackMode::SegmentsQueue => {
                if !self.arm_queue(media, segments) {
                    media.pause();
                    self.reset_to_idle();
                }
            }
        }
    }

    /// Queue mode: pick the segment under (or after) the playhead, jumping
    /// over a gap if needed.
    fn arm_queue<M: MediaElement + ?Sized>(&mut self, media: &mut M, segments: &[Segment]) -> bool {
        let sorted = sorted_refs(segments);
        let position = media.current_time();
        let tolerance = self.resolver.edge_tolerance;

        let index = sorted
            .iter()
            .position(|s| {
                s.contains(position, tolerance) && s.end_time - position > self.boundary_epsilon
            })
            .or_else(|| sorted.iter().position(|s| s.start_time > position));
        let Some(index) = index else {
            self.session.queue_index = None;
            return false;
        };

        let segment = sorted[index];
        if position < segment.start_time - tolerance {
            media.set_current_time(segment.start_time);
        }
        self.session.queue_index = Some(index);
        self.session.active_segment_id = Some(segment.id);
        self.session.selected_segment_id = Some(segment.id);
        self.cutaway = None;
        self.state = GateState::PlayingBounded {
            stop_time: segment.end_time,
        };
        true
    }

    fn advance_queue<M: MediaElement + ?Sized>(
        &mut self,
        media: &mut M,
        segments: &[Segment],
        stop_time: f64,
    ) -> Option<MonitorOutcome> {
        let sorted = sorted_refs(segments);
        let tolerance = self.resolver.edge_tolerance;
        let current = self
            .session
            .active_segment_id
            .and_then(|id| sorted.iter().position(|s| s.id == id))
            .or(self.session.queue_index);
        // Without a current entry, resume with whatever starts at or after the stop.
        let index = match current {
            Some(i) => i + 1,
            None => sorted
                .iter()
                .position(|s| s.start_time >= stop_time - tolerance)?,
        };
        let next = sorted.get(index)?;
        let (segment_id, start, end) = (next.id, next.start_time, next.end_time);

        media.set_current_time(start);
        self.session.queue_index = Some(index);
        self.session.active_segment_id = Some(segment_id);
        self.session.selected_segment_id = Some(segment_id);
        self.state = GateState::PlayingBounded { stop_time: end };
        debug!(index, segment_id, "queue advanced");
        Some(MonitorOutcome::QueueAdvanced { index, segment_id })
    }

    /// A segment other than `current` beginning exactly at `time`.
    fn segment_starting_at<'a>(
        &self,
        time: f64,
        segments: &'a [Segment],
        current: Option<SegmentId>,
    ) -> Option<&'a Segment> {
        let tolerance = self.resolver.edge_tolerance;
        sorted_refs(segments).into_iter().find(|s| {
            Some(s.id) != current
                && (s.start_time - time).abs() < tolerance
                && s.end_time > time + tolerance
        })
    }

    fn reach_boundary<M: MediaElement + ?Sized>(
        &mut self,
        media: &mut M,
        segments: &[Segment],
        stop_time: f64,
        now: Instant,
    ) -> MonitorOutcome {
        match self.mode {
            PlaybackMode::SegmentsQueue => {
                if let Some(outcome) = self.advance_queue(media, segments, stop_time) {
                    return outcome;
                }
            }
            PlaybackMode::Normal => {
                if let Some(current) = self.session.active_segment_id {
                    if let Some(next) = self.segment_starting_at(stop_time, segments, Some(current)) {
                        let (segment_id, next_stop) = (next.id, next.end_time);
                        self.session.active_segment_id = Some(segment_id);
                        self.session.selected_segment_id = Some(segment_id);
                        self.state = GateState::PlayingBounded { stop_time: next_stop };
                        debug!(segment_id, "chained into adjacent segment");
                        return MonitorOutcome::Chained {
                            segment_id,
                            stop_time: next_stop,
                        };
                    }
                }
            }
        }

        media.pause();
        self.snap_to(media, stop_time, now);

        let selected = self
            .resolver
            .classify(stop_time, segments, media.duration())
            .segment_id();
        let starting_here = self.segment_starting_at(stop_time, segments, None).map(|s| s.id);

        self.session.end_at_boundary();
        self.session.active_segment_id = starting_here;
        self.session.selected_segment_id = selected;
        self.cutaway = None;
        self.state = GateState::Idle;
        debug!(stop_time, ?selected, "boundary stop");
        MonitorOutcome::BoundaryStop { stop_time, selected }
    }

    /// Write `target`, verify, and schedule deferred re-asserts.
    fn snap_to<M: MediaElement + ?Sized>(&mut self, media: &mut M, target: f64, now: Instant) {
        let tolerance = self.resolver.edge_tolerance;
        media.set_current_time(target);
        for _ in 0..IMMEDIATE_REASSERTS {
            if (media.current_time() - target).abs() <= tolerance {
                break;
            }
            trace!(target, "position write ignored, writing again");
            media.set_current_time(target);
        }
        self.correction = Some(Correction {
            target,
            due: self.correction_delays.iter().map(|d| now + *d).collect(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
