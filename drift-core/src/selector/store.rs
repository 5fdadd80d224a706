use crate::config::{StoreConfig, DEFAULT_MODEL_BUCKETS};
use crate::error::QueryError;
use crate::models::event::label_text;
use crate::models::{RawTrainingMetricRecord, TrainingMetricRecord};
use crate::pipeline::http::{build_client, endpoint, post_search, BasicAuth, Hits};
use crate::pipeline::traits::MetricsSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

/// Newest `training_metrics` document per model, via a terms + top_hits aggregation.
pub struct ElasticMetricsStore {
    client: Client,
    search_url: Url,
    auth: Option<BasicAuth>,
    buckets: usize,
}

impl ElasticMetricsStore {
    pub fn new(config: &StoreConfig) -> Result<Self, QueryError> {
        let search_url = endpoint(&config.base_url, &[&config.index, "_search"]).map_err(
            |reason| QueryError::InvalidEndpoint {
                endpoint: config.base_url.to_string(),
                reason,
            },
        )?;
        Ok(Self {
            client: build_client(config.timeout).map_err(QueryError::Transport)?,
            search_url,
            auth: BasicAuth::from_parts(config.user.as_deref(), config.password.as_deref()),
            buckets: DEFAULT_MODEL_BUCKETS,
        })
    }

    /// Maximum number of distinct models returned by the aggregation.
    pub fn with_buckets(mut self, buckets: usize) -> Self {
        self.buckets = buckets.max(1);
        self
    }

    pub fn build_query(&self) -> Value {
        json!({
            "size": 0,
            "query": {
                "bool": {
                    "must": [ { "term": { "log_type.keyword": "training_metrics" } } ]
                }
            },
            "aggs": {
                "by_model": {
                    "terms": { "field": "model_name.keyword", "size": self.buckets },
                    "aggs": {
                        "latest": {
                            "top_hits": {
                                "sort": [
                                    { "timestamp": { "order": "desc", "unmapped_type": "date" } }
                                ],
                                "size": 1
                            }
                        }
                    }
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct AggregationResponse {
    aggregations: Option<Aggregations>,
}

#[derive(Debug, Deserialize)]
struct Aggregations {
    by_model: Option<ModelBuckets>,
}

#[derive(Debug, Deserialize)]
struct ModelBuckets {
    #[serde(default)]
    buckets: Vec<ModelBucket>,
}

#[derive(Debug, Deserialize)]
struct ModelBucket {
    #[serde(default)]
    key: Value,
    latest: Option<TopHits>,
}

#[derive(Debug, Deserialize)]
struct TopHits {
    hits: Option<Hits<RawTrainingMetricRecord>>,
}

impl AggregationResponse {
    fn into_records(self) -> Vec<TrainingMetricRecord> {
        let buckets = self
            .aggregations
            .and_then(|a| a.by_model)
            .map(|b| b.buckets)
            .unwrap_or_default();
        buckets
            .into_iter()
            .flat_map(|bucket| {
                let key = label_text(&bucket.key);
                let sources = bucket
                    .latest
                    .and_then(|l| l.hits)
                    .map(|h| h.hits)
                    .unwrap_or_default();
                sources
                    .into_iter()
                    .filter_map(move |hit| hit.source.into_record(key.as_deref()))
            })
            .collect()
    }
}

#[async_trait]
impl MetricsSource for ElasticMetricsStore {
    async fn latest_per_model(&self) -> Result<Vec<TrainingMetricRecord>, QueryError> {
        let response: AggregationResponse =
            post_search(&self.client, &self.search_url, self.auth.as_ref(), &self.build_query())
                .await?;
        let records = response.into_records();
        debug!(models = records.len(), url = %self.search_url, "fetched training metrics");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_groups_by_model_and_keeps_newest_hit() {
        let config = StoreConfig::for_url(Url::parse("http://es:9200").unwrap());
        let store = ElasticMetricsStore::new(&config).unwrap().with_buckets(20);
        let body = store.build_query();
        assert_eq!(body["size"], 0);
        let by_model = &body["aggs"]["by_model"];
        assert_eq!(by_model["terms"]["field"], "model_name.keyword");
        assert_eq!(by_model["terms"]["size"], 20);
        let top = &by_model["aggs"]["latest"]["top_hits"];
        assert_eq!(top["size"], 1);
        assert_eq!(top["sort"][0]["timestamp"]["order"], "desc");
    }

    #[test]
    fn buckets_decode_into_records() {
        let raw = r#"{
            "aggregations": { "by_model": { "buckets": [
                { "key": "tfidf-sklearn", "latest": { "hits": { "hits": [
                    { "_source": { "timestamp": "2024-02-01T00:00:00Z",
                                   "metrics": { "f1": 0.71, "accuracy": 0.8 } } }
                ] } } },
                { "key": "bert-base-uncased", "latest": { "hits": { "hits": [
                    { "_source": { "model_name": "bert-base-uncased",
                                   "metrics": { "status": "completed",
                                                "metrics": { "eval_f1": 0.88 } } } }
                ] } } },
                { "key": "empty" }
            ] } }
        }"#;
        let response: AggregationResponse = serde_json::from_str(raw).unwrap();
        let records = response.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].model_name, "tfidf-sklearn");
        assert_eq!(records[0].metrics.accuracy(), Some(0.8));
        assert_eq!(records[1].metrics.f1(), Some(0.88));
        assert_eq!(records[1].metrics.accuracy(), None);
    }

    #[test]
    fn response_without_aggregations_is_empty() {
        let response: AggregationResponse = serde_json::from_str(r#"{"hits": {}}"#).unwrap();
        assert!(response.into_records().is_empty());
    }
}
