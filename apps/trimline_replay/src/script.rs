//! Gesture scripts: a JSON list of steps replayed against the editor and a
//! simulated media element.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use trimline_core::controller::PointerKind;
use trimline_core::events::DragTarget;
use trimline_core::gate::MonitorOutcome;
use trimline_core::media::{MediaElement, SimulatedMedia};
use trimline_core::types::{PlaybackMode, PlaybackSession};
use trimline_core::wire::{self, LoadedSegments, WireSegment};
use trimline_core::{SegmentId, TrimEditor};
use trimline_sync::persistence::TrimPersistence;
use trimline_sync::save_flow::{DialogState, SaveFlow, SaveKind};
use trimline_sync::thumbnails;

/// Interval between simulated `timeupdate` events.
const DEFAULT_TICK: f64 = 0.25;

fn default_duration() -> f64 {
    60.0
}

fn default_tick() -> f64 {
    DEFAULT_TICK
}

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default)]
    pub load: LoadedSegments,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handle {
    Start,
    End,
    TrimStart,
    TrimEnd,
    Playhead,
}

/// Segments are addressed by their index in timeline order, since loaded
/// segments get fresh ids.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Click {
        time: f64,
    },
    GoTo {
        input: String,
    },
    Play,
    PlayFromBeginning,
    Pause,
    ContinuePastBoundary,
    Mode {
        mode: PlaybackMode,
    },
    Advance {
        seconds: f64,
        #[serde(default = "default_tick")]
        tick: f64,
    },
    Drag {
        handle: Handle,
        #[serde(default)]
        segment: Option<usize>,
        to: Vec<f64>,
        #[serde(default)]
        cancel: bool,
    },
    Nudge {
        handle: Handle,
        #[serde(default)]
        segment: Option<usize>,
        delta: f64,
    },
    Hold {
        handle: Handle,
        #[serde(default)]
        segment: Option<usize>,
        delta: f64,
        ms: u64,
    },
    Create {
        time: f64,
    },
    Split {
        segment: usize,
        time: f64,
    },
    Delete {
        segment: usize,
    },
    Undo,
    Redo,
    Save {
        kind: SaveKind,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub segments: Vec<WireSegment>,
    pub position: f64,
    pub session: PlaybackSession,
    pub events: BTreeMap<&'static str, usize>,
    pub boundary_stops: usize,
    pub dialog: Option<DialogState>,
}

pub struct Replay {
    editor: TrimEditor<SimulatedMedia>,
    clock: Instant,
    events: BTreeMap<&'static str, usize>,
    boundary_stops: usize,
    dialog: Option<DialogState>,
}

impl Replay {
    pub fn new(editor: TrimEditor<SimulatedMedia>) -> Self {
        Self {
            editor,
            clock: Instant::now(),
            events: BTreeMap::new(),
            boundary_stops: 0,
            dialog: None,
        }
    }

    pub fn editor(&self) -> &TrimEditor<SimulatedMedia> {
        &self.editor
    }

    /// Load the script's segments (with placeholder thumbnails) and replay
    /// every step. Explicit saves need `flow`; without it they are skipped.
    pub async fn run<P: TrimPersistence>(
        &mut self,
        script: &Script,
        flow: Option<&SaveFlow<P>>,
    ) -> anyhow::Result<()> {
        let loaded = wire::from_wire(&script.load, self.editor.media().duration());
        self.editor.load_segments(&thumbnails::with_placeholders(&loaded));
        self.collect_events();

        for (index, step) in script.steps.iter().enumerate() {
            tracing::debug!(index, ?step, "step");
            match step {
                Step::Save { kind } => match flow {
                    Some(flow) => {
                        let state = flow.run(*kind, self.editor.segments()).await;
                        self.dialog = Some(state);
                    }
                    None => tracing::warn!(index, "explicit save skipped, no server configured"),
                },
                other => self
                    .apply(other)
                    .with_context(|| format!("step {index} ({other:?}) failed"))?,
            }
            self.collect_events();
        }
        Ok(())
    }

    fn apply(&mut self, step: &Step) -> anyhow::Result<()> {
        match step {
            Step::Click { time } => {
                self.editor.click_at(*time);
            }
            Step::GoTo { input } => {
                self.editor.go_to_time(input);
            }
            Step::Play => {
                self.editor.play();
            }
            Step::PlayFromBeginning => {
                self.editor.play_from_beginning();
            }
            Step::Pause => self.editor.pause(),
            Step::ContinuePastBoundary => self.editor.continue_past_boundary(),
            Step::Mode { mode } => self.editor.set_mode(*mode),
            Step::Advance { seconds, tick } => self.advance(*seconds, *tick),
            Step::Drag {
                handle,
                segment,
                to,
                cancel,
            } => {
                let target = self.target(*handle, *segment)?;
                if !self.editor.begin_drag(target, PointerKind::Mouse) {
                    return Err(anyhow!("nothing to drag for {handle:?}"));
                }
                for time in to {
                    self.editor.drag_move_to(*time);
                }
                if *cancel {
                    self.editor.cancel_drag();
                } else {
                    self.editor.end_drag();
                }
            }
            Step::Nudge {
                handle,
                segment,
                delta,
            } => {
                let target = self.target(*handle, *segment)?;
                self.editor.nudge(target, *delta);
            }
            Step::Hold {
                handle,
                segment,
                delta,
                ms,
            } => {
                let target = self.target(*handle, *segment)?;
                self.editor.begin_hold(target, *delta, self.clock);
                let end = self.clock + Duration::from_millis(*ms);
                while self.clock < end {
                    self.clock += Duration::from_millis(50);
                    self.editor.on_timer(self.clock);
                }
                self.editor.end_hold();
            }
            Step::Create { time } => {
                self.editor.create_segment_in_gap(*time)?;
            }
            Step::Split { segment, time } => {
                let id = self.segment_id(*segment)?;
                self.editor.request_split(id, *time)?;
            }
            Step::Delete { segment } => {
                let id = self.segment_id(*segment)?;
                self.editor.delete_segment(id)?;
            }
            Step::Undo => self.editor.undo()?,
            Step::Redo => self.editor.redo()?,
            Step::Save { .. } => {}
        }
        Ok(())
    }

    /// Let simulated time pass, firing time updates and timers.
    fn advance(&mut self, seconds: f64, tick: f64) {
        let tick = if tick > 0.0 { tick } else { DEFAULT_TICK };
        let mut elapsed = 0.0;
        while elapsed < seconds {
            let dt = tick.min(seconds - elapsed);
            elapsed += dt;
            self.clock += Duration::from_secs_f64(dt);
            self.editor.media_mut().advance(dt);
            if let MonitorOutcome::BoundaryStop { .. } = self.editor.on_time_update(self.clock) {
                self.boundary_stops += 1;
            }
            self.editor.on_timer(self.clock);
        }
    }

    fn segment_id(&self, index: usize) -> anyhow::Result<SegmentId> {
        self.editor
            .store()
            .sorted()
            .get(index)
            .map(|s| s.id)
            .ok_or_else(|| anyhow!("no segment at index {index}"))
    }

    fn target(&self, handle: Handle, segment: Option<usize>) -> anyhow::Result<DragTarget> {
        let id = || {
            segment
                .ok_or_else(|| anyhow!("{handle:?} needs a segment index"))
                .and_then(|i| self.segment_id(i))
        };
        Ok(match handle {
            Handle::Start => DragTarget::SegmentStart(id()?),
            Handle::End => DragTarget::SegmentEnd(id()?),
            Handle::TrimStart => DragTarget::TrimStart,
            Handle::TrimEnd => DragTarget::TrimEnd,
            Handle::Playhead => DragTarget::Playhead,
        })
    }

    fn collect_events(&mut self) {
        for event in self.editor.drain_events() {
            *self.events.entry(event.name()).or_default() += 1;
        }
    }

    pub fn report(&self) -> Report {
        Report {
            segments: wire::to_wire(self.editor.segments()),
            position: self.editor.media().current_time(),
            session: self.editor.session().clone(),
            events: self.events.clone(),
            boundary_stops: self.boundary_stops,
            dialog: self.dialog.clone(),
        }
    }
}
