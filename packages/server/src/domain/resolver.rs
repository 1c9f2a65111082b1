//! 外部コラボレータのインターフェース
//!
//! - IdentityResolver: セッショントークンからユーザーを特定する
//! - HostResolver: イベントのホストを特定する
//!
//! どちらもタイムアウトは実装側の責務です。

use async_trait::async_trait;

use super::{
    entity::Identity,
    error::ResolveError,
    value_object::{Credential, EventId, UserId},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_identity(&self, credential: &Credential) -> Result<Identity, ResolveError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// ホストが決まっていないイベントでは `Ok(None)`
    async fn resolve_host(&self, event_id: &EventId) -> Result<Option<UserId>, ResolveError>;
}
