//! The media API as seen by the editor.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use tracing::debug;
use trimline_core::wire::{SaveTrimRequest, SaveTrimResponse, TrimVideoRequest, TrimVideoResponse};
use ureq::Agent;

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved { updated_at: Option<String> },
    /// The server has no save endpoint yet (404). Local state stands.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrimOutcome {
    Redirect(String),
    Rejected(String),
    /// Any other status.
    Failed(u16),
}

pub trait TrimPersistence: Send + Sync + 'static {
    fn save_trim(&self, request: SaveTrimRequest) -> impl Future<Output = Result<SaveOutcome>> + Send;

    fn trim_video(&self, request: TrimVideoRequest) -> impl Future<Output = Result<TrimOutcome>> + Send;
}

// ---------------------------------------------------------------------------
// HttpPersistence
// ---------------------------------------------------------------------------

/// Blocking ureq client driven from the tokio blocking pool.
#[derive(Debug, Clone)]
pub struct HttpPersistence {
    agent: Agent,
    config: SyncConfig,
}

impl HttpPersistence {
    pub fn new(config: &SyncConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.request_timeout()))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            config: config.clone(),
        }
    }

    async fn post<B, R>(&self, action: &str, body: B) -> Result<(u16, Option<R>)>
    where
        B: Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = self.config.endpoint(action);
        tokio::task::spawn_blocking(move || post_json(&agent, &url, &body))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
    }
}

fn post_json<B: Serialize, R: DeserializeOwned>(
    agent: &Agent,
    url: &str,
    body: &B,
) -> Result<(u16, Option<R>)> {
    let mut response = agent.post(url).send_json(body)?;
    let status = response.status().as_u16();
    debug!(url, status, "POST");
    // Error bodies are optional; a missing or non-JSON body is not fatal.
    let parsed = response.body_mut().read_json::<R>().ok();
    Ok((status, parsed))
}

/// A save only counts once the body says `"status": "success"`.
fn save_outcome(status: u16, body: Option<SaveTrimResponse>) -> Result<SaveOutcome> {
    match status {
        200..=299 => match body {
            Some(body) if body.status == "success" => Ok(SaveOutcome::Saved {
                updated_at: body.updated_at,
            }),
            Some(body) => Err(SyncError::NotSaved(body.status)),
            None => Err(SyncError::NotSaved(String::new())),
        },
        404 => Ok(SaveOutcome::Unavailable),
        other => Err(SyncError::Status(other)),
    }
}

impl TrimPersistence for HttpPersistence {
    async fn save_trim(&self, request: SaveTrimRequest) -> Result<SaveOutcome> {
        let (status, body) = self.post::<_, SaveTrimResponse>("save_trim", request).await?;
        save_outcome(status, body)
    }

    async fn trim_video(&self, request: TrimVideoRequest) -> Result<TrimOutcome> {
        let (status, body) = self.post::<_, TrimVideoResponse>("trim_video", request).await?;
        let outcome = match status {
            200..=299 => match body.and_then(|b| b.url_redirect) {
                Some(url) => TrimOutcome::Redirect(url),
                None => TrimOutcome::Failed(status),
            },
            400 => TrimOutcome::Rejected(
                body.and_then(|b| b.error)
                    .unwrap_or_else(|| "the server rejected the trim request".into()),
            ),
            other => TrimOutcome::Failed(other),
        };
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Scripted in-memory API. Records every request it receives.
    #[derive(Debug, Default)]
    pub struct MockPersistence {
        pub saves: Mutex<Vec<SaveTrimRequest>>,
        pub trims: Mutex<Vec<TrimVideoRequest>>,
        pub save_status: Mutex<Option<u16>>,
        pub trim_outcome: Mutex<Option<std::result::Result<TrimOutcome, u16>>>,
    }

    impl MockPersistence {
        pub fn save_count(&self) -> usize {
            self.saves.lock().unwrap().len()
        }
    }

    impl TrimPersistence for MockPersistence {
        async fn save_trim(&self, request: SaveTrimRequest) -> Result<SaveOutcome> {
            self.saves.lock().unwrap().push(request);
            let status = *self.save_status.lock().unwrap();
            match status {
                None => Ok(SaveOutcome::Saved {
                    updated_at: Some("2024-05-01T10:00:00Z".into()),
                }),
                Some(404) => Ok(SaveOutcome::Unavailable),
                Some(other) => Err(SyncError::Status(other)),
            }
        }

        async fn trim_video(&self, request: TrimVideoRequest) -> Result<TrimOutcome> {
            self.trims.lock().unwrap().push(request);
            let scripted = self.trim_outcome.lock().unwrap().clone();
            match scripted {
                None => Ok(TrimOutcome::Redirect("/media/42".into())),
                Some(Ok(outcome)) => Ok(outcome),
                Some(Err(status)) => Err(SyncError::Status(status)),
            }
        }
    }
}
