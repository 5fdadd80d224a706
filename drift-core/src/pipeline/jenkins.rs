use crate::config::CiConfig;
use crate::error::{body_excerpt, TriggerError};
use crate::pipeline::http::{build_client, endpoint};
use crate::pipeline::traits::RetrainTrigger;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

/// Remote build trigger of a Jenkins job (`/job/<name>/build?token=...`).
pub struct JenkinsTrigger {
    client: Client,
    build_url: Url,
    user: String,
    token: String,
}

impl JenkinsTrigger {
    /// Fails with `MissingCredential` when the config carries no token.
    pub fn new(config: &CiConfig) -> Result<Self, TriggerError> {
        let token = config.token.clone().ok_or(TriggerError::MissingCredential)?;
        let build_url = endpoint(&config.base_url, &["job", &config.job, "build"]).map_err(
            |reason| TriggerError::InvalidEndpoint {
                endpoint: config.base_url.to_string(),
                reason,
            },
        )?;
        Ok(Self {
            client: build_client(config.timeout).map_err(TriggerError::Transport)?,
            build_url,
            user: config.user.clone(),
            token,
        })
    }

    pub fn build_url(&self) -> &Url {
        &self.build_url
    }

    fn request_url(&self, cause: &str) -> Url {
        let mut url = self.build_url.clone();
        url.query_pairs_mut()
            .append_pair("token", &self.token)
            .append_pair("cause", cause);
        url
    }
}

#[async_trait]
impl RetrainTrigger for JenkinsTrigger {
    async fn trigger(&self, cause: &str) -> Result<(), TriggerError> {
        let response = self
            .client
            .post(self.request_url(cause))
            .basic_auth(&self.user, Some(&self.token))
            .send()
            .await
            .map_err(TriggerError::Transport)?;

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(TriggerError::Status {
            status: status.as_u16(),
            body: body_excerpt(&body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::http::fake_server::respond_once;
    use std::time::Duration;

    fn config(base: &str, job: &str) -> CiConfig {
        CiConfig {
            base_url: Url::parse(base).unwrap(),
            job: job.to_string(),
            user: "admin".to_string(),
            token: Some("t0ken".to_string()),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn request_carries_token_and_cause() {
        let ci = config("http://jenkins:8080", "MLOps-Pipeline");
        let trigger = JenkinsTrigger::new(&ci).unwrap();
        assert_eq!(
            trigger.build_url().as_str(),
            "http://jenkins:8080/job/MLOps-Pipeline/build"
        );

        let url = trigger.request_url("Drift detected: Class 1 accounts for 80.0%");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("token".to_string(), "t0ken".to_string()));
        assert_eq!(pairs[1].0, "cause");
        assert_eq!(pairs[1].1, "Drift detected: Class 1 accounts for 80.0%");
    }

    #[test]
    fn missing_token_is_rejected_up_front() {
        let mut ci = config("http://jenkins:8080", "job");
        ci.token = None;
        assert!(matches!(
            JenkinsTrigger::new(&ci),
            Err(TriggerError::MissingCredential)
        ));
    }

    async fn trigger_against(status: u16) -> (Result<(), TriggerError>, String) {
        let (base, server) = respond_once(status, "queued").await;
        let trigger = JenkinsTrigger::new(&config(base.as_str(), "MLOps-Pipeline")).unwrap();
        let result = trigger.trigger("Drift detected: skew").await;
        (result, server.await.unwrap())
    }

    #[tokio::test]
    async fn ok_and_created_count_as_success() {
        for status in [200, 201] {
            let (result, head) = trigger_against(status).await;
            assert!(result.is_ok(), "status {status} should succeed");
            assert!(head.starts_with("post /job/mlops-pipeline/build?token=t0ken&cause="));
            assert!(head.contains("authorization: basic "));
        }
    }

    #[tokio::test]
    async fn other_statuses_are_trigger_errors() {
        for status in [202, 403, 500] {
            let (result, _) = trigger_against(status).await;
            match result {
                Err(TriggerError::Status { status: got, body }) => {
                    assert_eq!(got, status);
                    assert_eq!(body, "queued");
                }
                other => panic!("status {status}: expected status error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn unreachable_ci_is_a_transport_error() {
        let mut ci = config("http://127.0.0.1:9", "job");
        ci.timeout = Duration::from_millis(500);
        let err = JenkinsTrigger::new(&ci).unwrap().trigger("test").await.unwrap_err();
        assert!(matches!(err, TriggerError::Transport(_)));
    }
}
