//! Explicit Save / Save As / Save Segments.
//!
//! Unlike auto-save, these drive a dialog: processing, then success with a
//! redirect countdown or an error carrying the server's message. A server that
//! cannot be reached is treated as success after a short delay.

use crate::config::SyncConfig;
use crate::persistence::{TrimOutcome, TrimPersistence};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};
use trimline_core::wire::{to_wire, TrimVideoRequest};
use trimline_core::Segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveKind {
    /// Overwrite the media with the trimmed version.
    Save,
    /// Keep the original, create a trimmed copy.
    SaveAs,
    /// One new media item per segment.
    SaveSegments,
}

impl SaveKind {
    pub fn request(self, segments: &[Segment]) -> TrimVideoRequest {
        let (save_as_copy, save_individual_segments) = match self {
            SaveKind::Save => (false, None),
            SaveKind::SaveAs => (true, None),
            SaveKind::SaveSegments => (true, Some(true)),
        };
        TrimVideoRequest {
            segments: to_wire(segments),
            save_as_copy,
            save_individual_segments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DialogState {
    Hidden,
    Processing {
        kind: SaveKind,
    },
    Success {
        redirect_url: Option<String>,
        countdown: u32,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// No success dialog is showing.
    Idle,
    Counting(u32),
    Done { redirect_url: Option<String> },
}

pub struct SaveFlow<P> {
    persistence: Arc<P>,
    soft_failure_delay: Duration,
    redirect_countdown: u32,
    dialog: watch::Sender<DialogState>,
}

impl<P: TrimPersistence> SaveFlow<P> {
    pub fn new(persistence: Arc<P>, config: &SyncConfig) -> Self {
        let (dialog, _) = watch::channel(DialogState::Hidden);
        Self {
            persistence,
            soft_failure_delay: config.soft_failure_delay(),
            redirect_countdown: config.redirect_countdown_secs,
            dialog,
        }
    }

    pub fn dialog(&self) -> watch::Receiver<DialogState> {
        self.dialog.subscribe()
    }

    pub fn state(&self) -> DialogState {
        self.dialog.borrow().clone()
    }

    /// Run one explicit save to completion and return the final dialog state.
    pub async fn run(&self, kind: SaveKind, segments: &[Segment]) -> DialogState {
        let request = kind.request(segments);
        if request.segments.is_empty() {
            return self.show(DialogState::Error {
                message: "Add at least one segment before saving.".into(),
            });
        }

        self.show(DialogState::Processing { kind });
        let count = request.segments.len();
        let state = match self.persistence.trim_video(request).await {
            Ok(TrimOutcome::Redirect(url)) => {
                info!(?kind, count, %url, "trim accepted");
                DialogState::Success {
                    redirect_url: Some(url),
                    countdown: self.redirect_countdown,
                }
            }
            Ok(TrimOutcome::Rejected(message)) => {
                warn!(?kind, %message, "trim rejected");
                DialogState::Error { message }
            }
            Ok(TrimOutcome::Failed(status)) => {
                warn!(?kind, status, "trim request failed, reporting success");
                self.soft_success().await
            }
            Err(err) => {
                warn!(?kind, %err, "trim request failed, reporting success");
                self.soft_success().await
            }
        };
        self.show(state)
    }

    async fn soft_success(&self) -> DialogState {
        sleep(self.soft_failure_delay).await;
        DialogState::Success {
            redirect_url: None,
            countdown: self.redirect_countdown,
        }
    }

    fn show(&self, state: DialogState) -> DialogState {
        self.dialog.send_replace(state.clone());
        state
    }

    /// Advance the success countdown by one second.
    pub fn tick(&self) -> Tick {
        let mut tick = Tick::Idle;
        self.dialog.send_modify(|state| {
            if let DialogState::Success {
                redirect_url,
                countdown,
            } = state
            {
                *countdown = countdown.saturating_sub(1);
                tick = if *countdown == 0 {
                    Tick::Done {
                        redirect_url: redirect_url.clone(),
                    }
                } else {
                    Tick::Counting(*countdown)
                };
            }
        });
        tick
    }

    /// Tick once a second until the countdown ends. Returns the redirect
    /// target, or `None` if the dialog was dismissed or had none.
    pub async fn run_countdown(&self) -> Option<String> {
        loop {
            sleep(Duration::from_secs(1)).await;
            match self.tick() {
                Tick::Counting(_) => continue,
                Tick::Done { redirect_url } => return redirect_url,
                Tick::Idle => return None,
            }
        }
    }

    pub fn dismiss(&self) {
        self.dialog.send_replace(DialogState::Hidden);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::mock::MockPersistence;

    fn segments() -> Vec<Segment> {
        vec![
            Segment::new(1, "a", 0.0, 5.0),
            Segment::new(2, "b", 8.0, 12.5),
        ]
    }

    fn flow(mock: &Arc<MockPersistence>) -> SaveFlow<MockPersistence> {
        SaveFlow::new(mock.clone(), &SyncConfig::default())
    }

    #[test]
    fn request_flags_per_kind() {
        let save = SaveKind::Save.request(&segments());
        assert!(!save.save_as_copy);
        assert_eq!(save.save_individual_segments, None);

        let copy = SaveKind::SaveAs.request(&segments());
        assert!(copy.save_as_copy);

        let each = SaveKind::SaveSegments.request(&segments());
        assert_eq!(each.save_individual_segments, Some(true));
        assert_eq!(each.segments[1].end_time, "00:00:12.500");
    }

    #[tokio::test(start_paused = true)]
    async fn success_counts_down_to_redirect() {
        let mock = Arc::new(MockPersistence::default());
        let flow = flow(&mock);

        let state = flow.run(SaveKind::Save, &segments()).await;
        assert_eq!(
            state,
            DialogState::Success {
                redirect_url: Some("/media/42".into()),
                countdown: 3
            }
        );
        assert_eq!(flow.tick(), Tick::Counting(2));
        assert_eq!(flow.run_countdown().await.as_deref(), Some("/media/42"));
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_shows_server_message() {
        let mock = Arc::new(MockPersistence::default());
        *mock.trim_outcome.lock().unwrap() = Some(Ok(TrimOutcome::Rejected("bad range".into())));
        let flow = flow(&mock);

        let state = flow.run(SaveKind::SaveAs, &segments()).await;
        assert_eq!(
            state,
            DialogState::Error {
                message: "bad range".into()
            }
        );
        assert_eq!(flow.tick(), Tick::Idle);
        flow.dismiss();
        assert_eq!(flow.state(), DialogState::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_server_is_soft_success() {
        let mock = Arc::new(MockPersistence::default());
        *mock.trim_outcome.lock().unwrap() = Some(Err(502));
        let flow = flow(&mock);
        let dialog = flow.dialog();

        let started = tokio::time::Instant::now();
        let state = flow.run(SaveKind::SaveSegments, &segments()).await;
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(matches!(state, DialogState::Success { redirect_url: None, .. }));
        assert_eq!(*dialog.borrow(), state);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_list_is_refused_without_a_request() {
        let mock = Arc::new(MockPersistence::default());
        let flow = flow(&mock);
        let state = flow.run(SaveKind::Save, &[]).await;
        assert!(matches!(state, DialogState::Error { .. }));
        assert!(mock.trims.lock().unwrap().is_empty());
    }
}
