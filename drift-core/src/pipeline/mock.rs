use crate::error::{QueryError, TriggerError};
use crate::models::{PredictionEvent, TrainingMetricRecord};
use crate::pipeline::traits::{Clock, EventSource, MetricsSource, RetrainTrigger};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Dry-run trigger: logs the cause and reports success.
pub struct LogOnlyTrigger;

#[async_trait]
impl RetrainTrigger for LogOnlyTrigger {
    async fn trigger(&self, cause: &str) -> Result<(), TriggerError> {
        info!(%cause, "dry run: retraining would be triggered");
        Ok(())
    }
}

/// Stand-in used when no trigger token is configured.
pub struct UnconfiguredTrigger;

#[async_trait]
impl RetrainTrigger for UnconfiguredTrigger {
    async fn trigger(&self, _cause: &str) -> Result<(), TriggerError> {
        Err(TriggerError::MissingCredential)
    }
}

/// Records every cause it receives; answers with a configurable HTTP status.
#[derive(Default)]
pub struct RecordingTrigger {
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<u16>>,
}

impl RecordingTrigger {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(status: u16) -> Self {
        let trigger = Self::default();
        trigger.set_failure(Some(status));
        trigger
    }

    pub fn set_failure(&self, status: Option<u16>) {
        *lock(&self.failure) = status;
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl RetrainTrigger for RecordingTrigger {
    async fn trigger(&self, cause: &str) -> Result<(), TriggerError> {
        lock(&self.calls).push(cause.to_string());
        match *lock(&self.failure) {
            Some(status) => Err(TriggerError::Status {
                status,
                body: "recording trigger failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Serves a fixed batch of events, or fails every query when `events` is `None`.
#[derive(Default)]
pub struct StaticEventSource {
    events: Option<Vec<PredictionEvent>>,
    windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
}

impl StaticEventSource {
    pub fn new(events: Vec<PredictionEvent>) -> Self {
        Self {
            events: Some(events),
            windows: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Windows requested so far, oldest first.
    pub fn windows(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        lock(&self.windows).clone()
    }
}

#[async_trait]
impl EventSource for StaticEventSource {
    async fn query(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<PredictionEvent>, QueryError> {
        lock(&self.windows).push((window_start, window_end));
        self.events
            .clone()
            .ok_or_else(|| QueryError::Malformed("static event source is unavailable".to_string()))
    }
}

/// Serves fixed training records, or fails when `records` is `None`.
#[derive(Default)]
pub struct StaticMetricsSource {
    records: Option<Vec<TrainingMetricRecord>>,
}

impl StaticMetricsSource {
    pub fn new(records: Vec<TrainingMetricRecord>) -> Self {
        Self {
            records: Some(records),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsSource for StaticMetricsSource {
    async fn latest_per_model(&self) -> Result<Vec<TrainingMetricRecord>, QueryError> {
        self.records
            .clone()
            .ok_or_else(|| {
                QueryError::Malformed("static metrics source is unavailable".to_string())
            })
    }
}

/// Settable clock; clones share the same instant.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = lock(&self.now);
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *lock(&self.now) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}
