use crate::models::event::{label_text, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Most `metrics` wrappers that are peeled off before giving up.
pub const MAX_METRIC_NESTING: usize = 8;

const F1_KEYS: [&str; 2] = ["f1", "eval_f1"];
const ACCURACY_KEYS: [&str; 2] = ["accuracy", "eval_accuracy"];

/// Flat numeric view of a training run's evaluation metrics.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MetricSet {
    values: BTreeMap<String, f64>,
}

impl MetricSet {
    /// Resolve a possibly nested `metrics` payload.
    ///
    /// The training job wraps its evaluation output as
    /// `{"status": ..., "metrics": {...}}`, so the payload is unwrapped until
    /// an object carrying score keys or only flat values is reached. Anything
    /// that never resolves yields an empty set.
    pub fn from_payload(payload: &Value) -> Self {
        let Some(flat) = resolve_flat(payload) else {
            return Self::default();
        };
        let values = flat
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_f64()
                    .filter(|v| v.is_finite())
                    .map(|v| (key.clone(), v))
            })
            .collect();
        Self { values }
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .filter(|(_, v)| v.is_finite())
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn f1(&self) -> Option<f64> {
        F1_KEYS.iter().find_map(|k| self.get(k))
    }

    pub fn accuracy(&self) -> Option<f64> {
        ACCURACY_KEYS.iter().find_map(|k| self.get(k))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn has_score_key(map: &Map<String, Value>) -> bool {
    F1_KEYS
        .iter()
        .chain(ACCURACY_KEYS.iter())
        .any(|k| map.get(*k).is_some_and(Value::is_number))
}

fn resolve_flat(payload: &Value) -> Option<&Map<String, Value>> {
    let mut current = payload.as_object()?;
    for _ in 0..=MAX_METRIC_NESTING {
        if has_score_key(current) {
            return Some(current);
        }
        match current.get("metrics").and_then(Value::as_object) {
            Some(inner) => current = inner,
            None => return Some(current),
        }
    }
    None
}

/// Latest-known evaluation result for one trained candidate.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainingMetricRecord {
    pub model_name: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub metrics: MetricSet,
}

impl TrainingMetricRecord {
    pub fn new(model_name: impl Into<String>, metrics: MetricSet) -> Self {
        Self {
            model_name: model_name.into(),
            timestamp: None,
            metrics,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Wire shape of a `training_metrics` document.
#[derive(Debug, Default, Deserialize)]
pub struct RawTrainingMetricRecord {
    #[serde(default)]
    pub model_name: Option<Value>,
    /// Training logs identify the model by its checkpoint.
    #[serde(default)]
    pub model_checkpoint: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default, rename = "@timestamp")]
    pub indexed_at: Option<Value>,
    #[serde(default)]
    pub metrics: Option<Value>,
}

impl RawTrainingMetricRecord {
    /// Convert, using `group_key` when the document itself names no model.
    /// Returns `None` when no model identity can be found at all.
    pub fn into_record(self, group_key: Option<&str>) -> Option<TrainingMetricRecord> {
        let model_name = self
            .model_name
            .as_ref()
            .and_then(label_text)
            .or_else(|| self.model_checkpoint.as_ref().and_then(label_text))
            .or_else(|| group_key.map(str::to_string))?;
        let timestamp = self
            .timestamp
            .as_ref()
            .and_then(parse_timestamp)
            .or_else(|| self.indexed_at.as_ref().and_then(parse_timestamp));
        let metrics = self
            .metrics
            .as_ref()
            .map(MetricSet::from_payload)
            .unwrap_or_default();
        Some(TrainingMetricRecord {
            model_name,
            timestamp,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_metrics_are_read_directly() {
        let set = MetricSet::from_payload(&json!({ "f1": 0.8, "accuracy": 0.9, "loss": 0.2 }));
        assert_eq!(set.f1(), Some(0.8));
        assert_eq!(set.accuracy(), Some(0.9));
        assert_eq!(set.get("loss"), Some(0.2));
    }

    #[test]
    fn doubly_nested_metrics_are_unwrapped() {
        let payload = json!({
            "status": "completed",
            "metrics": { "eval_f1": 0.81, "eval_accuracy": 0.93, "epoch": 3 }
        });
        let set = MetricSet::from_payload(&payload);
        assert_eq!(set.f1(), Some(0.81));
        assert_eq!(set.accuracy(), Some(0.93));
        assert_eq!(set.get("epoch"), Some(3.0));
    }

    #[test]
    fn deepest_allowed_nesting_still_resolves() {
        let mut payload = json!({ "status": "completed", "f1": 0.5 });
        for _ in 0..MAX_METRIC_NESTING {
            payload = json!({ "metrics": payload });
        }
        assert_eq!(MetricSet::from_payload(&payload).f1(), Some(0.5));
    }

    #[test]
    fn unresolved_nesting_scores_as_absent() {
        let mut payload = json!({ "f1": 0.5 });
        for _ in 0..MAX_METRIC_NESTING + 1 {
            payload = json!({ "metrics": payload });
        }
        let set = MetricSet::from_payload(&payload);
        assert!(set.is_empty());
        assert_eq!(set.f1(), None);

        assert!(MetricSet::from_payload(&json!("0.9")).is_empty());
        assert_eq!(MetricSet::from_payload(&json!({ "f1": "high" })).f1(), None);
    }

    #[test]
    fn record_falls_back_to_checkpoint_then_group_key() {
        let raw: RawTrainingMetricRecord = serde_json::from_value(json!({
            "model_checkpoint": "bert-base-uncased",
            "timestamp": "2024-03-01T00:00:00Z",
            "metrics": { "f1": 0.7 }
        }))
        .unwrap();
        let record = raw.into_record(Some("bucket")).unwrap();
        assert_eq!(record.model_name, "bert-base-uncased");
        assert!(record.timestamp.is_some());

        let anonymous = RawTrainingMetricRecord::default();
        assert_eq!(
            anonymous.into_record(Some("bucket")).unwrap().model_name,
            "bucket"
        );
        assert!(RawTrainingMetricRecord::default().into_record(None).is_none());
    }
}
