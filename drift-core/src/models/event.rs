use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One inference outcome as logged by the serving component.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PredictionEvent {
    pub timestamp: Option<DateTime<Utc>>,
    pub predicted_label: Option<String>,
    pub true_label: Option<String>,
    pub model_name: Option<String>,
}

impl PredictionEvent {
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            predicted_label: Some(label.into()),
            ..Self::default()
        }
    }
}

/// Wire shape of a prediction document's `_source`.
///
/// Every field is optional and loosely typed; conversion into
/// [`PredictionEvent`] decides what counts as present.
#[derive(Debug, Default, Deserialize)]
pub struct RawPredictionEvent {
    #[serde(default)]
    pub predicted_label: Option<Value>,
    #[serde(default)]
    pub true_label: Option<Value>,
    /// The serving component writes the human readable class under `label`.
    #[serde(default)]
    pub label: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default, rename = "@timestamp")]
    pub indexed_at: Option<Value>,
    #[serde(default)]
    pub model_name: Option<Value>,
}

impl From<RawPredictionEvent> for PredictionEvent {
    fn from(raw: RawPredictionEvent) -> Self {
        let timestamp = raw
            .timestamp
            .as_ref()
            .and_then(parse_timestamp)
            .or_else(|| raw.indexed_at.as_ref().and_then(parse_timestamp));
        let true_label = raw
            .true_label
            .as_ref()
            .and_then(label_text)
            .or_else(|| raw.label.as_ref().and_then(label_text));
        Self {
            timestamp,
            predicted_label: raw.predicted_label.as_ref().and_then(label_text),
            true_label,
            model_name: raw.model_name.as_ref().and_then(label_text),
        }
    }
}

/// Render a label-like JSON value as text.
///
/// Strings are trimmed, numbers keep their decimal form (`1` stays `"1"`);
/// anything else, including blank strings, is treated as absent.
pub fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse an RFC 3339 timestamp, accepting naive ISO-8601 values as UTC.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn convert(source: Value) -> PredictionEvent {
        let raw: RawPredictionEvent = serde_json::from_value(source).unwrap();
        raw.into()
    }

    #[test]
    fn integer_class_ids_become_labels() {
        let event = convert(json!({
            "predicted_label": 3,
            "label": "Promotions",
            "timestamp": "2024-05-01T10:00:00Z",
            "model_name": "tfidf-sklearn"
        }));
        assert_eq!(event.predicted_label.as_deref(), Some("3"));
        assert_eq!(event.true_label.as_deref(), Some("Promotions"));
        assert_eq!(event.model_name.as_deref(), Some("tfidf-sklearn"));
        assert_eq!(
            event.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn missing_or_unusable_fields_are_absent() {
        let event = convert(json!({
            "predicted_label": null,
            "true_label": ["x"],
            "timestamp": "yesterday"
        }));
        assert_eq!(event, PredictionEvent::default());

        let blank = convert(json!({ "predicted_label": "   " }));
        assert!(blank.predicted_label.is_none());
    }

    #[test]
    fn explicit_true_label_wins_over_label() {
        let event = convert(json!({
            "predicted_label": "Spam",
            "true_label": "Ham",
            "label": "Spam"
        }));
        assert_eq!(event.true_label.as_deref(), Some("Ham"));
    }

    #[test]
    fn naive_timestamps_and_index_time_are_accepted() {
        let naive = convert(json!({ "timestamp": "2024-05-01T10:00:00.250000" }));
        assert!(naive.timestamp.is_some());

        let indexed = convert(json!({ "@timestamp": "2024-05-01T10:00:00+02:00" }));
        assert_eq!(
            indexed.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
        );
    }
}
