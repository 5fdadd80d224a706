use crate::error::QueryError;
use crate::models::{ModelSelection, Score, TrainingMetricRecord};
use crate::pipeline::traits::MetricsSource;
use crate::selector::index::LatestRecordIndex;
use tracing::{debug, info, warn};

/// Picks the serving model from the latest evaluation of each candidate.
///
/// Read-only: one selector can be shared by any number of callers.
pub struct BestModelSelector<M: MetricsSource> {
    source: M,
}

impl<M: MetricsSource> BestModelSelector<M> {
    pub fn new(source: M) -> Self {
        Self { source }
    }

    /// Best candidate, propagating store failures.
    pub async fn try_select(
        &self,
        allowed: &[String],
    ) -> Result<Option<ModelSelection>, QueryError> {
        let records = self.source.latest_per_model().await?;
        Ok(pick_best(records, allowed))
    }

    /// Best candidate; a store failure is logged and treated as "no candidate".
    pub async fn select(&self, allowed: &[String]) -> Option<ModelSelection> {
        match self.try_select(allowed).await {
            Ok(selection) => selection,
            Err(err) => {
                warn!(error = %err, "training metrics unavailable, no model selected");
                None
            }
        }
    }

    /// Name of the best candidate, or `default` when none qualifies.
    pub async fn select_or(&self, allowed: &[String], default: Option<String>) -> Option<String> {
        match self.select(allowed).await {
            Some(selection) => Some(selection.model_name),
            None => {
                info!(default = ?default, "falling back to default model");
                default
            }
        }
    }
}

/// Highest `(f1, accuracy)` among the newest record of each allowed model.
///
/// Equal scores resolve to the alphabetically first model name.
pub fn pick_best<I>(records: I, allowed: &[String]) -> Option<ModelSelection>
where
    I: IntoIterator<Item = TrainingMetricRecord>,
{
    let index = LatestRecordIndex::from_records(records);
    let mut best: Option<ModelSelection> = None;
    // The index iterates names in ascending order, so a strict comparison keeps the first on ties.
    for record in index.select(allowed) {
        let score = Score::of(&record.metrics);
        debug!(model = %record.model_name, f1 = score.f1, accuracy = score.accuracy, "candidate");
        match &best {
            Some(current) if score <= current.score => {}
            _ => {
                best = Some(ModelSelection {
                    model_name: record.model_name.clone(),
                    score,
                })
            }
        }
    }
    best
}
