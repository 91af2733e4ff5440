use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BoardConfig;
use crate::models::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteStoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("rejected with status {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Rejected { status: u16, detail: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReceipt {
    pub message: String,
}

/// The upstream activities API. Implementations keep no local state and never
/// retry: one call is one request.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    async fn list_activities(&self) -> Result<Snapshot, RemoteStoreError>;

    async fn register(&self, activity: &str, email: &str)
        -> Result<MutationReceipt, RemoteStoreError>;

    async fn unregister(
        &self,
        activity: &str,
        email: &str,
    ) -> Result<MutationReceipt, RemoteStoreError>;
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: Url,
    host_header: Option<String>,
}

impl HttpRemoteStore {
    pub fn new(
        base_url: Url,
        host_header: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteStoreError> {
        if base_url.cannot_be_a_base() {
            return Err(RemoteStoreError::Network(format!(
                "{} cannot be used as a base URL",
                base_url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteStoreError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            host_header,
        })
    }

    pub fn from_config(config: &BoardConfig) -> Result<Self, RemoteStoreError> {
        Self::new(
            config.api_url.clone(),
            config.api_host.clone(),
            config.api_timeout,
        )
    }

    fn activities_url(&self) -> Url {
        self.url_for(&["activities"])
    }

    fn signup_url(&self, activity: &str, email: &str) -> Url {
        let mut url = self.url_for(&["activities", activity, "signup"]);
        url.query_pairs_mut().append_pair("email", email);
        url
    }

    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, method: Method, url: &Url) -> Result<reqwest::Response, RemoteStoreError> {
        debug!("{} {}", method, url);
        let mut req = self.client.request(method, url.clone());
        if let Some(host) = &self.host_header {
            req = req.header("Host", host.as_str());
        }
        req.send().await.map_err(|e| {
            warn!("request to {} failed: {}", url, e);
            RemoteStoreError::Network(e.to_string())
        })
    }

    async fn mutate(&self, method: Method, url: Url) -> Result<MutationReceipt, RemoteStoreError> {
        let resp = self.send(method, &url).await?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RemoteStoreError::Network(e.to_string()))?;

        if !status.is_success() {
            let detail = rejection_detail(&bytes);
            warn!(
                "{} rejected with {}: {}",
                url,
                status,
                detail.as_deref().unwrap_or("-")
            );
            return Err(RemoteStoreError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let body: MessageBody = serde_json::from_slice(&bytes).map_err(|e| {
            warn!("{} answered {} with an unreadable body: {}", url, status, e);
            RemoteStoreError::Decode(e.to_string())
        })?;
        Ok(MutationReceipt {
            message: body.message,
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list_activities(&self) -> Result<Snapshot, RemoteStoreError> {
        let url = self.activities_url();
        let resp = self.send(Method::GET, &url).await?;

        let status = resp.status();
        if !status.is_success() {
            warn!("{} answered {}", url, status);
            return Err(RemoteStoreError::Network(format!(
                "unexpected status {} from {}",
                status, url
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RemoteStoreError::Network(e.to_string()))?;
        Snapshot::from_json(&bytes).map_err(|e| {
            warn!("activities payload from {} is malformed: {}", url, e);
            RemoteStoreError::Decode(e.to_string())
        })
    }

    async fn register(
        &self,
        activity: &str,
        email: &str,
    ) -> Result<MutationReceipt, RemoteStoreError> {
        self.mutate(Method::POST, self.signup_url(activity, email))
            .await
    }

    async fn unregister(
        &self,
        activity: &str,
        email: &str,
    ) -> Result<MutationReceipt, RemoteStoreError> {
        self.mutate(Method::DELETE, self.signup_url(activity, email))
            .await
    }
}

// Error bodies are best-effort: only a string `detail` is surfaced.
fn rejection_detail(bytes: &[u8]) -> Option<String> {
    let body: Value = serde_json::from_slice(bytes).ok()?;
    body.get("detail")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> HttpRemoteStore {
        HttpRemoteStore::new(Url::parse(base).unwrap(), None, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn encodes_activity_and_email() {
        let url = store("http://127.0.0.1:8000").signup_url("Chess Club/B", "jane+1@x.com");
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/activities/Chess%20Club%2FB/signup?email=jane%2B1%40x.com"
        );
    }

    #[test]
    fn keeps_base_path_prefix() {
        let url = store("http://127.0.0.1:8000/school/").activities_url();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/school/activities");
    }

    #[test]
    fn rejects_non_base_urls() {
        let err = HttpRemoteStore::new(
            Url::parse("mailto:office@mergington.edu").unwrap(),
            None,
            Duration::from_secs(1),
        )
        .err();
        assert!(matches!(err, Some(RemoteStoreError::Network(_))));
    }

    #[test]
    fn reads_only_string_details() {
        assert_eq!(
            rejection_detail(br#"{"detail": "Student is already signed up"}"#).as_deref(),
            Some("Student is already signed up")
        );
        assert_eq!(rejection_detail(br#"{"detail": [{"loc": ["query"]}]}"#), None);
        assert_eq!(rejection_detail(b"Internal Server Error"), None);
        assert_eq!(rejection_detail(b""), None);
    }
}
