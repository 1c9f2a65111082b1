//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクトの生成時に発生するバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("connection id must not be empty")]
    ConnectionIdEmpty,

    #[error("event id must not be empty")]
    EventIdEmpty,

    #[error("event id is too long ({0} chars, max {max})", max = super::value_object::EventId::MAX_LENGTH)]
    EventIdTooLong(usize),

    #[error("user name must not be empty")]
    UserNameEmpty,

    #[error("credential must not be empty")]
    CredentialEmpty,

    #[error("chat text must not be empty")]
    ChatTextEmpty,

    #[error("chat text is too long ({0} chars, max {max})", max = super::value_object::ChatText::MAX_LENGTH)]
    ChatTextTooLong(usize),
}

/// ホスト専用操作が拒否された理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ModerationError {
    /// 操作者がルームのホストではない
    #[error("only the host can perform this action")]
    NotHost,

    /// ホストが自分自身を対象にした
    #[error("the host cannot target themselves")]
    SelfTarget,
}

/// MessagePusher の送信エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("client '{0}' is not registered")]
    ClientNotFound(String),

    #[error("outbound queue of client '{0}' is full")]
    QueueFull(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// 外部コラボレータ（認証・ホスト解決）の呼び出しエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// 認証情報が無効
    #[error("invalid credential")]
    InvalidCredential,

    /// コラボレータに到達できない、またはタイムアウトした
    #[error("resolver unavailable: {0}")]
    Unavailable(String),
}
