//! Dominant-class skew detection.
//!
//! A window is skewed when a single predicted label
//! reaches the threshold share of all labeled predictions.

use crate::models::{Distribution, DriftVerdict, PredictionEvent};
use std::collections::BTreeMap;

/// Per-label proportions of the events that carry a predicted label.
pub fn calculate_distribution(events: &[PredictionEvent]) -> Distribution {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in events.iter().filter_map(|e| e.predicted_label.as_deref()) {
        *counts.entry(label.to_string()).or_default() += 1;
    }
    Distribution::from_counts(counts)
}

/// Flag the distribution when its largest proportion reaches `threshold`.
///
/// Equal maxima resolve to the smallest label in byte order.
pub fn detect_skew(distribution: &Distribution, threshold: f64) -> DriftVerdict {
    let mut dominant: Option<(&str, f64)> = None;
    for (label, proportion) in distribution.iter() {
        match dominant {
            Some((_, best)) if proportion <= best => {}
            _ => dominant = Some((label, proportion)),
        }
    }
    match dominant {
        Some((label, proportion)) => DriftVerdict {
            is_skewed: proportion >= threshold,
            dominant_label: Some(label.to_string()),
            proportion,
            sample_count: distribution.sample_count(),
        },
        None => DriftVerdict::none(),
    }
}

/// Human readable cause attached to a retraining request.
pub fn drift_reason(verdict: &DriftVerdict, threshold: f64) -> String {
    format!(
        "Class {} accounts for {:.1}% of predictions (threshold: {:.1}%)",
        verdict.dominant_label.as_deref().unwrap_or("<none>"),
        verdict.proportion * 100.0,
        threshold * 100.0
    )
}
