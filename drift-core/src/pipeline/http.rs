//! Plumbing shared by the HTTP collaborators: client construction, endpoint
//! joining and the `_search` request/response envelope.

use crate::error::{body_excerpt, QueryError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const USER_AGENT: &str = concat!("drift-monitor/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Append path segments to `base`, keeping any path prefix it already has.
pub fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, String> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| "URL cannot carry a path".to_string())?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    url.set_query(None);
    Ok(url)
}

/// Basic-auth credentials attached to store requests.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: Option<String>,
}

impl BasicAuth {
    pub fn from_parts(user: Option<&str>, password: Option<&str>) -> Option<Self> {
        user.map(|user| Self {
            user: user.to_string(),
            password: password.map(str::to_string),
        })
    }
}

/// POST a search body and decode the JSON answer.
pub async fn post_search<T: DeserializeOwned>(
    client: &Client,
    url: &Url,
    auth: Option<&BasicAuth>,
    body: &Value,
) -> Result<T, QueryError> {
    let mut request = client.post(url.clone()).json(body);
    if let Some(auth) = auth {
        request = request.basic_auth(&auth.user, auth.password.as_deref());
    }
    let response = request.send().await.map_err(QueryError::Transport)?;
    let status = response.status();
    let text = response.text().await.map_err(QueryError::Transport)?;
    if !status.is_success() {
        return Err(QueryError::Status {
            status: status.as_u16(),
            body: body_excerpt(&text),
        });
    }
    serde_json::from_str(&text).map_err(|e| QueryError::Malformed(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse<T> {
    pub hits: Option<Hits<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Hits<T> {
    #[serde(default = "Vec::new")]
    pub hits: Vec<Hit<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Hit<T> {
    #[serde(rename = "_source")]
    pub source: T,
}

impl<T> SearchResponse<T> {
    pub fn into_sources(self) -> Vec<T> {
        self.hits
            .map(|h| h.hits.into_iter().map(|hit| hit.source).collect())
            .unwrap_or_default()
    }
}
