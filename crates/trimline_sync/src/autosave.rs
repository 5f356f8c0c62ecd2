//! Debounced background saves.
//!
//! A tokio task owns the timers. The editor signals through an
//! [`AutoSaveHandle`]; the task reads the segment list from the store's
//! watch mirror only when a save actually fires.

use crate::config::SyncConfig;
use crate::persistence::{SaveOutcome, TrimPersistence};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, error, info};
use trimline_core::wire::{to_wire, SaveTrimRequest};
use trimline_core::{SaveScheduler, Segment};

/// What the "last saved" indicator shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveStatus {
    pub last_saved_at: Option<String>,
    pub saves: u64,
    pub failures: u64,
    pub in_flight: bool,
}

/// Cheap sender half handed to the editor.
#[derive(Debug, Clone)]
pub struct AutoSaveHandle {
    signals: mpsc::UnboundedSender<()>,
}

impl SaveScheduler for AutoSaveHandle {
    fn schedule_save(&self) {
        if self.signals.send(()).is_err() {
            debug!("auto-save task gone, dropping save signal");
        }
    }
}

/// Running auto-save task. Dropping it cancels any pending timer.
#[derive(Debug)]
pub struct AutoSave {
    handle: AutoSaveHandle,
    status: watch::Receiver<SaveStatus>,
    task: JoinHandle<()>,
}

impl AutoSave {
    pub fn spawn<P: TrimPersistence>(
        persistence: Arc<P>,
        segments: watch::Receiver<Vec<Segment>>,
        config: &SyncConfig,
    ) -> Self {
        let (signals, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::default());
        let task = tokio::spawn(run(
            persistence,
            segments,
            rx,
            status_tx,
            config.autosave_debounce(),
            config.initial_save_delay(),
        ));
        Self {
            handle: AutoSaveHandle { signals },
            status,
            task,
        }
    }

    pub fn handle(&self) -> AutoSaveHandle {
        self.handle.clone()
    }

    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for AutoSave {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<P: TrimPersistence>(
    persistence: Arc<P>,
    segments: watch::Receiver<Vec<Segment>>,
    mut signals: mpsc::UnboundedReceiver<()>,
    status: watch::Sender<SaveStatus>,
    debounce: Duration,
    initial_delay: Duration,
) {
    let initial = sleep(initial_delay);
    tokio::pin!(initial);
    let mut initial_pending = true;
    let mut attempted = false;
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Some(()) => deadline = Some(Instant::now() + debounce),
                None => break,
            },
            _ = &mut initial, if initial_pending => {
                initial_pending = false;
                let has_segments = !segments.borrow().is_empty();
                if has_segments && !attempted && deadline.is_none() {
                    debug!("initial save");
                    attempted = true;
                    perform_save(persistence.as_ref(), &segments, &status).await;
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                attempted = true;
                perform_save(persistence.as_ref(), &segments, &status).await;
            }
        }
    }
}

/// Save whatever the store holds right now. Failures are logged and counted,
/// never retried.
async fn perform_save<P: TrimPersistence>(
    persistence: &P,
    segments: &watch::Receiver<Vec<Segment>>,
    status: &watch::Sender<SaveStatus>,
) {
    let request = SaveTrimRequest {
        segments: to_wire(&segments.borrow()),
    };
    let count = request.segments.len();
    status.send_modify(|s| s.in_flight = true);

    match persistence.save_trim(request).await {
        Ok(SaveOutcome::Saved { updated_at }) => {
            let stamp = updated_at.unwrap_or_else(|| chrono::Utc::now().to_rfc3339());
            info!(count, updated_at = %stamp, "segments saved");
            status.send_modify(|s| {
                s.last_saved_at = Some(stamp);
                s.saves += 1;
                s.in_flight = false;
            });
        }
        Ok(SaveOutcome::Unavailable) => {
            debug!("save endpoint not available, keeping local state");
            status.send_modify(|s| {
                s.last_saved_at = Some(chrono::Utc::now().to_rfc3339());
                s.saves += 1;
                s.in_flight = false;
            });
        }
        Err(err) => {
            error!(%err, count, "auto-save failed");
            status.send_modify(|s| {
                s.failures += 1;
                s.in_flight = false;
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::mock::MockPersistence;

    fn segments() -> Vec<Segment> {
        vec![Segment::new(1, "a", 0.0, 10.0)]
    }

    fn spawn(
        initial: Vec<Segment>,
    ) -> (AutoSave, Arc<MockPersistence>, watch::Sender<Vec<Segment>>) {
        let mock = Arc::new(MockPersistence::default());
        let (tx, rx) = watch::channel(initial);
        let autosave = AutoSave::spawn(mock.clone(), rx, &SyncConfig::default());
        (autosave, mock, tx)
    }

    async fn wait(ms: u64) {
        sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn bursts_collapse_into_one_save() {
        let (autosave, mock, _tx) = spawn(segments());
        let handle = autosave.handle();

        handle.schedule_save();
        wait(500).await;
        handle.schedule_save();
        wait(400).await;
        handle.schedule_save();

        wait(900).await;
        assert_eq!(mock.save_count(), 0);
        wait(200).await;
        assert_eq!(mock.save_count(), 1);

        wait(5000).await;
        assert_eq!(mock.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn save_reads_segments_at_fire_time() {
        let (autosave, mock, tx) = spawn(segments());
        autosave.handle().schedule_save();
        wait(300).await;
        tx.send_replace(vec![
            Segment::new(1, "a", 0.0, 4.0),
            Segment::new(2, "b", 6.0, 8.0),
        ]);

        wait(1000).await;
        let saves = mock.saves.lock().unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].segments.len(), 2);
        assert_eq!(saves[0].segments[0].end_time, "00:00:04.000");
    }

    #[tokio::test(start_paused = true)]
    async fn initial_save_fires_once_when_segments_exist() {
        let (autosave, mock, _tx) = spawn(segments());
        wait(600).await;
        assert_eq!(mock.save_count(), 1);
        let status = autosave.status().borrow().clone();
        assert_eq!(status.saves, 1);
        assert_eq!(status.last_saved_at.as_deref(), Some("2024-05-01T10:00:00Z"));

        wait(5000).await;
        assert_eq!(mock.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_initial_save_for_empty_list() {
        let (_autosave, mock, _tx) = spawn(Vec::new());
        wait(3000).await;
        assert_eq!(mock.save_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_counted_not_retried() {
        let (autosave, mock, _tx) = spawn(Vec::new());
        *mock.save_status.lock().unwrap() = Some(500);
        autosave.handle().schedule_save();

        wait(5000).await;
        assert_eq!(mock.save_count(), 1);
        let status = autosave.status().borrow().clone();
        assert_eq!(status.failures, 1);
        assert_eq!(status.saves, 0);
        assert!(!status.in_flight);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_endpoint_counts_as_saved() {
        let (autosave, mock, _tx) = spawn(Vec::new());
        *mock.save_status.lock().unwrap() = Some(404);
        autosave.handle().schedule_save();

        wait(1500).await;
        let status = autosave.status().borrow().clone();
        assert_eq!(status.saves, 1);
        assert_eq!(status.failures, 0);
        assert!(status.last_saved_at.is_some());
        assert_eq!(mock.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_save() {
        let (autosave, mock, _tx) = spawn(Vec::new());
        let handle = autosave.handle();
        handle.schedule_save();
        wait(100).await;
        autosave.shutdown();

        wait(3000).await;
        assert_eq!(mock.save_count(), 0);
        handle.schedule_save();
    }
}
