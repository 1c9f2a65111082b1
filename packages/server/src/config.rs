//! 起動時の設定（Resolver の選択）

use std::{path::PathBuf, sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    domain::{HostResolver, IdentityResolver},
    infrastructure::resolver::{DirectoryError, HttpResolver, HttpResolverError, StaticDirectory},
};

/// 設定の読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    HttpResolver(#[from] HttpResolverError),
}

/// IdentityResolver / HostResolver の実装の選択
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverConfig {
    /// 静的ディレクトリ（JSON ファイル）
    Directory(PathBuf),
    /// 周辺の Web アプリケーションへの HTTP 問い合わせ
    Http { base_url: String, timeout: Duration },
    /// 何も設定されていない（すべての認証が失敗する）
    Empty,
}

/// 組み立て済みの Resolver
pub struct Resolvers {
    pub identity: Arc<dyn IdentityResolver>,
    pub host: Arc<dyn HostResolver>,
}

impl ResolverConfig {
    pub fn from_args(
        directory: Option<PathBuf>,
        auth_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        match (directory, auth_url) {
            (Some(path), _) => Self::Directory(path),
            (None, Some(base_url)) => Self::Http { base_url, timeout },
            (None, None) => Self::Empty,
        }
    }

    pub fn build(&self) -> Result<Resolvers, ConfigError> {
        match self {
            Self::Directory(path) => Ok(Self::shared(StaticDirectory::load(path)?)),
            Self::Http { base_url, timeout } => {
                tracing::info!(
                    "Resolving identities and hosts via {} (timeout {:?})",
                    base_url,
                    timeout
                );
                Ok(Self::shared(HttpResolver::new(base_url.clone(), *timeout)?))
            }
            Self::Empty => {
                tracing::warn!(
                    "Neither --directory nor --auth-url is set; every connection will fail authentication"
                );
                Ok(Self::shared(StaticDirectory::empty()))
            }
        }
    }

    fn shared<R>(resolver: R) -> Resolvers
    where
        R: IdentityResolver + HostResolver + 'static,
    {
        let resolver = Arc::new(resolver);
        Resolvers {
            identity: resolver.clone(),
            host: resolver,
        }
    }
}
