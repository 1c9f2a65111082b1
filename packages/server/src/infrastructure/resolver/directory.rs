//! 静的ディレクトリによる Resolver 実装
//!
//! ```json
//! {
//!   "users":  [{ "token": "t-alice", "userId": 2, "userName": "alice" }],
//!   "events": [{ "eventId": "42", "hostUserId": 1 }]
//! }
//! ```

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{
    Credential, EventId, HostResolver, Identity, IdentityResolver, ResolveError, UserId, UserName,
    ValueObjectError,
};

/// ディレクトリファイルの読み込みエラー
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read directory file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse directory file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid directory entry: {0}")]
    Invalid(#[from] ValueObjectError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserEntry {
    token: String,
    user_id: i64,
    user_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventEntry {
    event_id: String,
    host_user_id: i64,
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    users: Vec<UserEntry>,
    #[serde(default)]
    events: Vec<EventEntry>,
}

/// トークンとイベントホストの静的な対応表
#[derive(Debug, Default)]
pub struct StaticDirectory {
    /// Key: token
    users: HashMap<String, Identity>,
    hosts: HashMap<EventId, UserId>,
}

impl StaticDirectory {
    /// 空のディレクトリ（すべての認証が失敗する）
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        let file: DirectoryFile = serde_json::from_str(json)?;

        let mut directory = Self::default();
        for user in file.users {
            let credential = Credential::new(user.token)?;
            let identity = Identity::new(UserId::new(user.user_id), UserName::new(user.user_name)?);
            directory.users.insert(credential.as_str().to_string(), identity);
        }
        for event in file.events {
            directory
                .hosts
                .insert(EventId::new(event.event_id)?, UserId::new(event.host_user_id));
        }
        Ok(directory)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| DirectoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let directory = Self::from_json(&json)?;
        tracing::info!(
            "Loaded directory '{}' ({} users, {} events)",
            path.display(),
            directory.users.len(),
            directory.hosts.len()
        );
        Ok(directory)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl IdentityResolver for StaticDirectory {
    async fn resolve_identity(&self, credential: &Credential) -> Result<Identity, ResolveError> {
        self.users
            .get(credential.as_str())
            .cloned()
            .ok_or(ResolveError::InvalidCredential)
    }
}

#[async_trait]
impl HostResolver for StaticDirectory {
    async fn resolve_host(&self, event_id: &EventId) -> Result<Option<UserId>, ResolveError> {
        Ok(self.hosts.get(event_id).copied())
    }
}
