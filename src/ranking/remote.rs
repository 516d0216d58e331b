//! HTTP client for the remote score endpoint.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Convenient result alias returning [`RemoteError`] failures.
pub type RemoteResult<T> = Result<T, RemoteError>;

const SCORES_PATH: &str = "scores";

/// Failures that can occur while talking to the score endpoint.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build score API client")]
    ClientBuilder {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or no response came back.
    #[error("failed to send score API request to `{path}`")]
    RequestSend {
        /// Request path.
        path: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered with a non-success status.
    #[error("unexpected score API status {status} for `{path}`: {body}")]
    RequestStatus {
        /// Request path.
        path: String,
        /// Status returned by the endpoint.
        status: StatusCode,
        /// Response body, for the log.
        body: String,
    },
    /// Response payload was not the expected JSON list.
    #[error("failed to decode score API response for `{path}`")]
    DecodeResponse {
        /// Request path.
        path: String,
        /// Underlying decode error.
        #[source]
        source: reqwest::Error,
    },
}

/// Payload of `POST /scores`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    /// Player name.
    pub name: String,
    /// Pairs found.
    pub pairs: u32,
    /// Final time in seconds.
    pub seconds: u64,
    /// RFC 3339 timestamp of the round.
    pub played_at: String,
}

/// Remote ranking backend.
pub trait ScoreApi: Send + Sync {
    /// Persist one score.
    fn post_score(&self, submission: ScoreSubmission) -> BoxFuture<'static, RemoteResult<()>>;
    /// Fetch the `limit` best scores, best first, as raw JSON items.
    fn fetch_scores(&self, limit: usize) -> BoxFuture<'static, RemoteResult<Vec<Value>>>;
}

/// [`ScoreApi`] speaking HTTP to a `/scores` endpoint.
#[derive(Clone)]
pub struct HttpScoreApi {
    client: Client,
    base_url: Arc<str>,
}

impl HttpScoreApi {
    /// Build a client for the endpoint rooted at `base_url` (e.g. `https://host/prod`).
    pub fn new(base_url: &str) -> RemoteResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| RemoteError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim().trim_end_matches('/')),
        })
    }

    fn scores_url(&self) -> String {
        format!("{}/{}", self.base_url, SCORES_PATH)
    }
}

async fn error_for_status(path: String, response: reqwest::Response) -> RemoteError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    RemoteError::RequestStatus { path, status, body }
}

impl ScoreApi for HttpScoreApi {
    fn post_score(&self, submission: ScoreSubmission) -> BoxFuture<'static, RemoteResult<()>> {
        let api = self.clone();
        Box::pin(async move {
            let url = api.scores_url();
            let response = api
                .client
                .post(&url)
                .json(&submission)
                .send()
                .await
                .map_err(|source| RemoteError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(error_for_status(url, response).await)
            }
        })
    }

    fn fetch_scores(&self, limit: usize) -> BoxFuture<'static, RemoteResult<Vec<Value>>> {
        let api = self.clone();
        Box::pin(async move {
            let url = api.scores_url();
            let response = api
                .client
                .get(&url)
                .query(&[("limit", limit)])
                .send()
                .await
                .map_err(|source| RemoteError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if !response.status().is_success() {
                return Err(error_for_status(url, response).await);
            }

            response
                .json::<Vec<Value>>()
                .await
                .map_err(|source| RemoteError::DecodeResponse { path: url, source })
        })
    }
}
