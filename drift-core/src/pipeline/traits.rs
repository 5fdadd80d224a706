use crate::error::{QueryError, TriggerError};
use crate::models::{PredictionEvent, TrainingMetricRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read side of the prediction event log.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Prediction events with `window_start <= timestamp < window_end`,
    /// at most the configured maximum.
    async fn query(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<PredictionEvent>, QueryError>;
}

/// External job that retrains and redeploys the model.
#[async_trait]
pub trait RetrainTrigger: Send + Sync {
    async fn trigger(&self, cause: &str) -> Result<(), TriggerError>;
}

/// Read side of the training metrics log.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// The newest evaluation record of every model the store knows about.
    async fn latest_per_model(&self) -> Result<Vec<TrainingMetricRecord>, QueryError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
