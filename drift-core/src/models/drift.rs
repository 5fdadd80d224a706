use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Empirical label frequencies over one lookback window.
///
/// Labels iterate in ascending order so every consumer, including the skew
/// tie-break, sees the same sequence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    proportions: BTreeMap<String, f64>,
    sample_count: usize,
}

impl Distribution {
    /// Build from raw per-label counts. A zero total yields an empty distribution.
    pub fn from_counts(counts: BTreeMap<String, usize>) -> Self {
        let total: usize = counts.values().sum();
        if total == 0 {
            return Self::default();
        }
        let proportions = counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(label, count)| (label, count as f64 / total as f64))
            .collect();
        Self {
            proportions,
            sample_count: total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.proportions.is_empty()
    }

    /// Number of labeled samples the proportions were computed from.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn proportion(&self, label: &str) -> Option<f64> {
        self.proportions.get(label).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.proportions.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.proportions.len()
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(empty)");
        }
        let parts: Vec<String> = self
            .iter()
            .map(|(label, p)| format!("{label}={:.1}%", p * 100.0))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftVerdict {
    pub is_skewed: bool,
    pub dominant_label: Option<String>,
    pub proportion: f64,
    pub sample_count: usize,
}

impl DriftVerdict {
    pub fn none() -> Self {
        Self {
            is_skewed: false,
            dominant_label: None,
            proportion: 0.0,
            sample_count: 0,
        }
    }
}
