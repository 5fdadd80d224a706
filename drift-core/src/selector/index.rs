use crate::models::TrainingMetricRecord;
use std::collections::BTreeMap;

/// Newest training record per model name.
///
/// A record replaces the held one only when it is strictly newer; undated
/// records lose against dated ones and equal timestamps keep the first seen.
#[derive(Default, Debug)]
pub struct LatestRecordIndex {
    by_model: BTreeMap<String, TrainingMetricRecord>,
}

impl LatestRecordIndex {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = TrainingMetricRecord>,
    {
        let mut index = Self::default();
        for record in records {
            index.insert(record);
        }
        index
    }

    pub fn insert(&mut self, record: TrainingMetricRecord) {
        match self.by_model.get(&record.model_name) {
            Some(held) if record.timestamp <= held.timestamp => {}
            _ => {
                self.by_model.insert(record.model_name.clone(), record);
            }
        }
    }

    /// Records whose model is in `allowed`, or all of them when `allowed` is empty.
    pub fn select(&self, allowed: &[String]) -> Vec<&TrainingMetricRecord> {
        self.by_model
            .values()
            .filter(|r| allowed.is_empty() || allowed.iter().any(|a| a == &r.model_name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_model.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_model.is_empty()
    }
}
