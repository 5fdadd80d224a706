use crate::config::StoreConfig;
use crate::error::QueryError;
use crate::models::{PredictionEvent, RawPredictionEvent};
use crate::pipeline::http::{build_client, endpoint, post_search, BasicAuth, SearchResponse};
use crate::pipeline::traits::EventSource;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

const PROJECTED_FIELDS: [&str; 6] = [
    "predicted_label",
    "true_label",
    "label",
    "timestamp",
    "@timestamp",
    "model_name",
];

/// Time-windowed search over prediction events in an Elasticsearch index.
pub struct ElasticEventStore {
    client: Client,
    search_url: Url,
    auth: Option<BasicAuth>,
    max_results: usize,
}

impl ElasticEventStore {
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
            max_results: config.max_results,
        })
    }

    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    /// Search body for prediction events in `[start, end)`, newest first.
    pub fn build_query(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Value {
        json!({
            "query": {
                "bool": {
                    "must": [
                        { "term": { "log_type.keyword": "inference_event" } },
                        { "term": { "event.keyword": "prediction" } },
                        {
                            "range": {
                                "@timestamp": {
                                    "gte": start.to_rfc3339_opts(SecondsFormat::Millis, true),
                                    "lt": end.to_rfc3339_opts(SecondsFormat::Millis, true)
                                }
                            }
                        }
                    ]
                }
            },
            "sort": [ { "@timestamp": { "order": "desc", "unmapped_type": "date" } } ],
            "size": self.max_results,
            "_source": PROJECTED_FIELDS
        })
    }
}

#[async_trait]
impl EventSource for ElasticEventStore {
    async fn query(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<PredictionEvent>, QueryError> {
        let body = self.build_query(window_start, window_end);
        let response: SearchResponse<RawPredictionEvent> =
            post_search(&self.client, &self.search_url, self.auth.as_ref(), &body).await?;
        let mut events: Vec<PredictionEvent> = response
            .into_sources()
            .into_iter()
            .map(PredictionEvent::from)
            .collect();
        events.truncate(self.max_results);
        debug!(count = events.len(), url = %self.search_url, "fetched prediction events");
        Ok(events)
    }
}
