use crate::models::metrics::MetricSet;
use serde::Serialize;
use std::cmp::Ordering;

/// Ranking key of a candidate: f1 first, accuracy breaks ties.
/// Missing metrics score as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Score {
    pub f1: f64,
    pub accuracy: f64,
}

impl Score {
    pub fn of(metrics: &MetricSet) -> Self {
        Self {
            f1: metrics.f1().unwrap_or(0.0),
            accuracy: metrics.accuracy().unwrap_or(0.0),
        }
    }

    pub fn as_tuple(&self) -> (f64, f64) {
        (self.f1, self.accuracy)
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f1
            .total_cmp(&other.f1)
            .then_with(|| self.accuracy.total_cmp(&other.accuracy))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelSelection {
    pub model_name: String,
    pub score: Score,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f1_dominates_accuracy() {
        let a = Score { f1: 0.80, accuracy: 0.90 };
        let b = Score { f1: 0.85, accuracy: 0.70 };
        assert!(b > a);

        let c = Score { f1: 0.80, accuracy: 0.95 };
        assert!(c > a);
    }

    #[test]
    fn missing_metrics_score_zero() {
        let score = Score::of(&MetricSet::from_pairs([("loss", 0.1)]));
        assert_eq!(score.as_tuple(), (0.0, 0.0));
    }
}
