//! UseCase: 接続時の認証ハンドシェイク
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - AuthenticateUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 認証に失敗した接続がルーム操作に進まないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：有効なトークン
//! - 異常系：トークンなし、無効なトークン、認証サービス停止

use std::sync::Arc;

use crate::domain::{Credential, Identity, IdentityResolver, ResolveError};

use super::error::AuthError;

/// 接続認証のユースケース
pub struct AuthenticateUseCase {
    /// IdentityResolver（外部の認証サービス）
    identity_resolver: Arc<dyn IdentityResolver>,
}

impl AuthenticateUseCase {
    /// 新しい AuthenticateUseCase を作成
    pub fn new(identity_resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { identity_resolver }
    }

    /// 認証を実行
    ///
    /// 接続ごとに 1 回だけ呼ばれ、以後その接続は再認証されない。
    ///
    /// # Arguments
    ///
    /// * `credential` - ハンドシェイクから取り出したトークン（なければ `None`）
    ///
    /// # Returns
    ///
    /// * `Ok(Identity)` - 認証成功
    /// * `Err(AuthError)` - 認証失敗（接続は `auth_error` を送って閉じる）
    pub async fn execute(&self, credential: Option<Credential>) -> Result<Identity, AuthError> {
        let credential = credential.ok_or(AuthError::MissingCredential)?;

        self.identity_resolver
            .resolve_identity(&credential)
            .await
            .map_err(|e| match e {
                ResolveError::InvalidCredential => AuthError::InvalidCredential,
                ResolveError::Unavailable(reason) => AuthError::ResolverUnavailable(reason),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{UserId, UserName, resolver::MockIdentityResolver};

    fn credential(token: &str) -> Option<Credential> {
        Some(Credential::new(token.to_string()).unwrap())
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        // テスト項目: 有効なトークンでユーザーが特定される
        // given (前提条件):
        let mut resolver = MockIdentityResolver::new();
        resolver
            .expect_resolve_identity()
            .withf(|c| c.as_str() == "t-alice")
            .times(1)
            .returning(|_| {
                Ok(Identity::new(
                    UserId::new(2),
                    UserName::new("alice".to_string()).unwrap(),
                ))
            });
        let usecase = AuthenticateUseCase::new(Arc::new(resolver));

        // when (操作):
        let result = usecase.execute(credential("t-alice")).await;

        // then (期待する結果):
        assert_eq!(result.unwrap().user_id, UserId::new(2));
    }

    #[tokio::test]
    async fn test_authenticate_without_credential_skips_resolver() {
        // テスト項目: トークンがなければ認証サービスを呼ばずに失敗する
        // given (前提条件):
        let mut resolver = MockIdentityResolver::new();
        resolver.expect_resolve_identity().never();
        let usecase = AuthenticateUseCase::new(Arc::new(resolver));

        // when (操作):
        let result = usecase.execute(None).await;

        // then (期待する結果):
        assert_eq!(result, Err(AuthError::MissingCredential));
    }

    #[tokio::test]
    async fn test_authenticate_invalid_or_unavailable() {
        // テスト項目: 無効なトークンと認証サービス停止がそれぞれのエラーになる
        // given (前提条件):
        let mut resolver = MockIdentityResolver::new();
        resolver
            .expect_resolve_identity()
            .withf(|c| c.as_str() == "t-bad")
            .returning(|_| Err(ResolveError::InvalidCredential));
        resolver
            .expect_resolve_identity()
            .withf(|c| c.as_str() == "t-any")
            .returning(|_| Err(ResolveError::Unavailable("timeout".to_string())));
        let usecase = AuthenticateUseCase::new(Arc::new(resolver));

        // when (操作):
        let invalid = usecase.execute(credential("t-bad")).await;
        let unavailable = usecase.execute(credential("t-any")).await;

        // then (期待する結果):
        assert_eq!(invalid, Err(AuthError::InvalidCredential));
        assert_eq!(
            unavailable,
            Err(AuthError::ResolverUnavailable("timeout".to_string()))
        );
    }
}
