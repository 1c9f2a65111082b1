//! 外部コラボレータ（IdentityResolver / HostResolver）の実装
//!
//! - `directory`: 起動時に読み込む静的ディレクトリ（JSON ファイル）
//! - `http`: 周辺の Web アプリケーションへ HTTP で問い合わせる

pub mod directory;
pub mod http;

pub use directory::{DirectoryError, StaticDirectory};
pub use http::{HttpResolver, HttpResolverError};
