//! HTTP による Resolver 実装
//!
//! - `GET {base}/api/session` (`Authorization: Bearer <token>`) → `{"userId", "userName"}` / 401
//! - `GET {base}/api/events/{event_id}/host` → `{"hostUserId": <int|null>}` / 404

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{
    Credential, EventId, HostResolver, Identity, IdentityResolver, ResolveError, UserId, UserName,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user_id: i64,
    user_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostResponse {
    host_user_id: Option<i64>,
}

/// HttpResolver の構築エラー
#[derive(Debug, Error)]
pub enum HttpResolverError {
    #[error("invalid base URL '{url}': {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// 周辺の Web アプリケーションへ問い合わせる Resolver
pub struct HttpResolver {
    client: Client,
    base_url: Url,
}

impl HttpResolver {
    /// # Arguments
    ///
    /// * `base_url` - 例: `http://127.0.0.1:3000`（パス付きでもよい）
    /// * `timeout` - 1 回の問い合わせにかける最大時間
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, HttpResolverError> {
        let raw = base_url.into();
        let base_url = Url::parse(&raw).map_err(|e| HttpResolverError::BaseUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(HttpResolverError::BaseUrl {
                url: raw,
                reason: "URL cannot carry a path".to_string(),
            });
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// ベース URL の後ろにパスセグメントを追加する。各セグメントはパーセントエンコードされる
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

fn unavailable(e: reqwest::Error) -> ResolveError {
    ResolveError::Unavailable(e.to_string())
}

#[async_trait]
impl IdentityResolver for HttpResolver {
    async fn resolve_identity(&self, credential: &Credential) -> Result<Identity, ResolveError> {
        let response = self
            .client
            .get(self.endpoint(["api", "session"]))
            .bearer_auth(credential.as_str())
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            StatusCode::OK => {
                let session: SessionResponse = response.json().await.map_err(unavailable)?;
                let user_name =
                    UserName::new(session.user_name).map_err(|_| ResolveError::InvalidCredential)?;
                Ok(Identity::new(UserId::new(session.user_id), user_name))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Err(ResolveError::InvalidCredential)
            }
            status => Err(ResolveError::Unavailable(format!(
                "session lookup returned {status}"
            ))),
        }
    }
}

#[async_trait]
impl HostResolver for HttpResolver {
    async fn resolve_host(&self, event_id: &EventId) -> Result<Option<UserId>, ResolveError> {
        let response = self
            .client
            .get(self.endpoint(["api", "events", event_id.as_str(), "host"]))
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            StatusCode::OK => {
                let host: HostResponse = response.json().await.map_err(unavailable)?;
                Ok(host.host_user_id.map(UserId::new))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(ResolveError::Unavailable(format!(
                "host lookup returned {status}"
            ))),
        }
    }
}
