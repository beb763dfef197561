//! Periodic refresh of a single weather provider.
//!
//! The coordinator is the only writer of its state. Sensors read through
//! [`CoordinatorHandle`]s, which see the last good snapshot until the next
//! successful poll replaces it.

use crate::error::{UpdateFailed, WeatherError};
use crate::weather::provider::{Snapshot, WeatherProvider};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
struct CoordinatorState {
    snapshot: Option<Arc<Snapshot>>,
    last_update_success: bool,
    last_error: Option<String>,
    last_updated: Option<DateTime<Utc>>,
}

pub struct DataUpdateCoordinator {
    name: String,
    provider: Arc<dyn WeatherProvider>,
    update_interval: Duration,
    state: watch::Sender<CoordinatorState>,
}

impl DataUpdateCoordinator {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn WeatherProvider>,
        update_interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(CoordinatorState::default());
        Self {
            name: name.into(),
            provider,
            update_interval,
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn subscribe(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            state: self.state.subscribe(),
        }
    }

    /// Initial fetch; setup must not complete without data.
    pub async fn first_refresh(&self) -> Result<(), WeatherError> {
        self.refresh()
            .await
            .map_err(|source| WeatherError::NotReady {
                name: self.name.clone(),
                source,
            })
    }

    pub async fn refresh(&self) -> Result<(), UpdateFailed> {
        match self.fetch().await {
            Ok(snapshot) => {
                let was_failing = {
                    let state = self.state.borrow();
                    state.last_updated.is_some() && !state.last_update_success
                };
                if was_failing {
                    info!(coordinator = %self.name, "Fetching data recovered");
                }
                debug!(
                    coordinator = %self.name,
                    fields = snapshot.len(),
                    "Finished fetching data"
                );
                self.state.send_modify(|state| {
                    state.snapshot = Some(Arc::new(snapshot));
                    state.last_update_success = true;
                    state.last_error = None;
                    state.last_updated = Some(Utc::now());
                });
                Ok(())
            }
            Err(err) => {
                let was_succeeding = self.state.borrow().last_update_success;
                if was_succeeding {
                    warn!(coordinator = %self.name, error = %err, "Update failed");
                } else {
                    debug!(coordinator = %self.name, error = %err, "Update still failing");
                }
                self.state.send_modify(|state| {
                    state.last_update_success = false;
                    state.last_error = Some(err.user_message());
                    state.last_updated = Some(Utc::now());
                });
                Err(err)
            }
        }
    }

    async fn fetch(&self) -> Result<Snapshot, UpdateFailed> {
        let provider = Arc::clone(&self.provider);
        let snapshot = tokio::task::spawn_blocking(move || provider.fetch())
            .await
            .map_err(|e| UpdateFailed::Worker(e.to_string()))??;
        Ok(snapshot)
    }

    /// Polls forever. The next sleep starts only once the previous refresh
    /// has finished.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(self.update_interval).await;
                // Failure is already recorded on the state.
                let _ = self.refresh().await;
            }
        })
    }
}

/// Read-only view of a coordinator's state.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    state: watch::Receiver<CoordinatorState>,
}

impl CoordinatorHandle {
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.borrow().snapshot.clone()
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        self.state
            .borrow()
            .snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.get(field).cloned())
    }

    pub fn last_update_success(&self) -> bool {
        self.state.borrow().last_update_success
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().last_updated
    }

    /// Waits for the next refresh, successful or not. Returns `false` once
    /// the coordinator is gone.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }
}
