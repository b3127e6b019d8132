//! Slack Web API client and the trait the maintainer talks to.
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::config::{Config, DEFAULT_API_BASE};
use crate::model::{AuthIdentity, SlackResponse};
use crate::notify::PostMessage;

pub mod model;

pub use model::{ProfileSetParam, UsersListPage};

const USERS_LIST_LIMIT: u32 = 200;

#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("slack {method} failed: {error}")]
    Api { method: String, error: String },
    #[error("slack {method} returned HTTP {status}: {body}")]
    Status {
        method: String,
        status: StatusCode,
        body: String,
    },
    #[error("slack {method} rate limited (retry after {retry_after:?}s)")]
    RateLimited {
        method: String,
        retry_after: Option<u64>,
    },
}

/// The Slack Web API methods the maintainer relies on.
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn auth_test(&self) -> Result<AuthIdentity>;

    async fn users_list(&self, cursor: Option<&str>) -> Result<UsersListPage>;

    async fn users_profile_set(&self, param: &ProfileSetParam) -> Result<SlackResponse>;

    async fn chat_post_message(&self, message: &PostMessage) -> Result<SlackResponse>;
}

#[derive(Clone)]
pub struct SlackClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    pub fn new(token: String) -> Result<Self> {
        let base_url = Url::parse(DEFAULT_API_BASE).context("invalid default Slack URL")?;
        Self::with_base_url(token, base_url)
    }

    pub fn with_base_url(token: String, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent("slack-bulk-maintainer/0.1")
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::with_base_url(cfg.slack.token.clone(), cfg.api_base_url()?)
    }

    fn endpoint(&self, method: &str) -> Result<Url> {
        self.base_url.join(method).context("invalid Slack base URL")
    }

    /// POST a JSON body to a Web API method.
    pub fn build_request(&self, method: &str, body: &Value) -> Result<reqwest::Request> {
        self.http
            .post(self.endpoint(method)?)
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json; charset=utf-8")
            .json(body)
            .build()
            .context("failed to build Slack request")
    }

    fn build_get(&self, method: &str, query: &[(&str, String)]) -> Result<reqwest::Request> {
        self.http
            .get(self.endpoint(method)?)
            .bearer_auth(&self.token)
            .query(query)
            .build()
            .context("failed to build Slack request")
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T> {
        let body = serde_json::to_value(body).context("failed to encode Slack payload")?;
        debug!(method, payload = %body, "sending slack request");
        let request = self.build_request(method, &body)?;
        self.execute(method, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::Request,
    ) -> Result<T> {
        let res = self
            .http
            .execute(request)
            .await
            .with_context(|| format!("failed to reach Slack ({method})"))?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = res
                .headers()
                .get("Retry-After")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(SlackApiError::RateLimited {
                method: method.to_string(),
                retry_after,
            }
            .into());
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SlackApiError::Status {
                method: method.to_string(),
                status,
                body,
            }
            .into());
        }

        let payload: Value = res
            .json()
            .await
            .with_context(|| format!("invalid Slack response ({method})"))?;
        if !payload.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            let error = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            return Err(SlackApiError::Api {
                method: method.to_string(),
                error,
            }
            .into());
        }
        serde_json::from_value(payload)
            .with_context(|| format!("unexpected Slack response shape ({method})"))
    }
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn auth_test(&self) -> Result<AuthIdentity> {
        self.post("auth.test", &serde_json::json!({})).await
    }

    async fn users_list(&self, cursor: Option<&str>) -> Result<UsersListPage> {
        let mut query = vec![("limit", USERS_LIST_LIMIT.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        let request = self.build_get("users.list", &query)?;
        self.execute("users.list", request).await
    }

    async fn users_profile_set(&self, param: &ProfileSetParam) -> Result<SlackResponse> {
        self.post("users.profile.set", param).await
    }

    async fn chat_post_message(&self, message: &PostMessage) -> Result<SlackResponse> {
        self.post("chat.postMessage", message).await
    }
}
