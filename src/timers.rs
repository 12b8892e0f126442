//! Per-site time budgets.
//!
//! Users can assign a domain a daily reading budget. When navigation lands
//! on a budgeted domain the background service starts a countdown; shortly
//! before exhaustion it dispatches a [`ShowWarning`](crate::actions::Action)
//! to the page surface and, once the budget runs out, a `ClosePage`.
//! Leaving the page (or an explicit stop) cancels the countdown.

use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::actions::{Action, ActionDispatcher};
use crate::storage::{SharedStore, StoreError};

const TIMER_KEY_PREFIX: &str = "timer:";

/// The domain a budget applies to, derived from a full page URL.
///
/// Returns `None` for URLs without a host (e.g. `about:blank`).
#[must_use]
pub fn domain_of(page_url: &str) -> Option<String> {
    url::Url::parse(page_url)
        .ok()?
        .host_str()
        .map(str::to_string)
}

/// Seconds before exhaustion at which the warning fires. Budgets shorter
/// than twice this warn at their halfway point instead.
pub const WARNING_LEAD_SECS: u64 = 60;

/// A persisted per-domain budget, in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerForDomain {
    pub domain: String,
    pub time: u64,
}

/// Errors from timer persistence.
#[derive(Debug, Error)]
pub enum TimerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("stored timer for {domain} is malformed: {source}")]
    Malformed {
        domain: String,
        source: serde_json::Error,
    },
}

/// CRUD over persisted domain budgets.
///
/// Each domain lives under its own `timer:<domain>` key so the flat
/// key-value namespace stays enumerable by the settings surface.
#[derive(Clone)]
pub struct TimerStore {
    store: SharedStore,
}

impl TimerStore {
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn key(domain: &str) -> String {
        format!("{TIMER_KEY_PREFIX}{domain}")
    }

    pub async fn set(&self, timer: &TimerForDomain) -> Result<(), TimerError> {
        let value = serde_json::to_value(timer).map_err(|source| TimerError::Malformed {
            domain: timer.domain.clone(),
            source,
        })?;
        self.store.set(&Self::key(&timer.domain), value).await?;
        Ok(())
    }

    pub async fn get(&self, domain: &str) -> Result<Option<TimerForDomain>, TimerError> {
        match self.store.get(&Self::key(domain)).await? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| TimerError::Malformed {
                    domain: domain.to_string(),
                    source,
                }),
        }
    }

    pub async fn remove(&self, domain: &str) -> Result<(), TimerError> {
        self.store.remove(&Self::key(domain)).await?;
        Ok(())
    }

    /// All persisted budgets, in key order.
    pub async fn all(&self) -> Result<Vec<TimerForDomain>, TimerError> {
        let mut timers = Vec::new();
        for (key, value) in self.store.get_all().await? {
            let Some(domain) = key.strip_prefix(TIMER_KEY_PREFIX) else {
                continue;
            };
            let timer = serde_json::from_value(value).map_err(|source| TimerError::Malformed {
                domain: domain.to_string(),
                source,
            })?;
            timers.push(timer);
        }
        Ok(timers)
    }
}

struct RunningTimer {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Background countdown service.
///
/// One countdown may run per domain; re-navigation restarts it from the
/// full budget. Dropping the service aborts any countdown still running.
pub struct SiteTimerService {
    timers: TimerStore,
    dispatcher: ActionDispatcher,
    running: Mutex<FxHashMap<String, RunningTimer>>,
}

impl SiteTimerService {
    #[must_use]
    pub fn new(timers: TimerStore, dispatcher: ActionDispatcher) -> Self {
        Self {
            timers,
            dispatcher,
            running: Mutex::new(FxHashMap::default()),
        }
    }

    /// React to navigation onto `domain`.
    ///
    /// Starts (or restarts) the countdown when a budget exists; does nothing
    /// otherwise. Returns whether a countdown is now running.
    pub async fn on_navigation(&self, domain: &str) -> Result<bool, TimerError> {
        let Some(budget) = self.timers.get(domain).await? else {
            return Ok(false);
        };

        self.stop(domain);
        self.dispatcher.dispatch(Action::StartTimer {
            domain: domain.to_string(),
            time: budget.time,
        });

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let dispatcher = self.dispatcher.clone();
        let task_domain = domain.to_string();
        let total = budget.time;

        let handle = tokio::spawn(async move {
            let lead = WARNING_LEAD_SECS.min(total / 2);
            let until_warning = Duration::from_secs(total - lead);

            tokio::select! {
                _ = task_cancel.cancelled() => return,
                _ = tokio::time::sleep(until_warning) => {}
            }
            dispatcher.dispatch(Action::ShowWarning {
                domain: task_domain.clone(),
                remaining: lead,
            });

            tokio::select! {
                _ = task_cancel.cancelled() => return,
                _ = tokio::time::sleep(Duration::from_secs(lead)) => {}
            }
            tracing::info!(domain = %task_domain, "site time budget exhausted");
            dispatcher.dispatch(Action::ClosePage);
        });

        self.running
            .lock()
            .insert(domain.to_string(), RunningTimer { cancel, handle });
        Ok(true)
    }

    /// Cancel the countdown for `domain`, if one is running.
    ///
    /// Safe to call for domains with no countdown; also dispatches the
    /// `stopTimer` notification so page surfaces can clear their overlays.
    pub fn stop(&self, domain: &str) {
        if let Some(running) = self.running.lock().remove(domain) {
            running.cancel.cancel();
            self.dispatcher.dispatch(Action::StopTimer {
                domain: domain.to_string(),
            });
        }
    }

    /// Whether a countdown is currently running for `domain`.
    #[must_use]
    pub fn is_running(&self, domain: &str) -> bool {
        self.running.lock().contains_key(domain)
    }
}

impl Drop for SiteTimerService {
    fn drop(&mut self) {
        for (_, running) in self.running.lock().drain() {
            running.cancel.cancel();
            running.handle.abort();
        }
    }
}
