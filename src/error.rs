//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

use crate::api::RejectReason;

/// APIクォータ超過時にユーザーへ表示するメッセージ
pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "Sorry, the service is currently unavailable due to exceeded API quota. Please try again later.";

/// レート制限時にユーザーへ表示するメッセージ
pub const RATE_LIMITED_MESSAGE: &str =
    "Too many requests. Please wait a moment before trying again.";

/// その他すべての失敗でユーザーへ表示するメッセージ
pub const UNEXPECTED_ERROR_MESSAGE: &str =
    "An unexpected error occurred. Please try again later.";

/// sheetchatクレート全体で使用するエラー型
///
/// ファイルの取り込み、解析、プレビュー、設定の検証、補完APIの呼び出しで
/// 発生するすべてのエラーを統一的に扱うために使用されます。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetchat::SheetChatError;
/// use std::fs::File;
///
/// fn open_sheet(path: &str) -> Result<(), SheetChatError> {
///     let _file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum SheetChatError {
    /// I/O操作中に発生したエラー
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー
    ///
    /// ファイル形式が不正、破損したファイルなどが原因となります。
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// 行レコードのシリアライズ・デシリアライズに失敗したエラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 種別またはサイズの検証で拒否されたファイル
    #[error("File rejected: {0}")]
    Rejected(#[from] RejectReason),

    /// 設定の検証に失敗したエラー
    ///
    /// `SessionBuilder::build()`時や環境変数の読み込み時に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use sheetchat::{SessionBuilder, SheetChatError};
    ///
    /// let result = SessionBuilder::new().with_temperature(5.0).build();
    ///
    /// match result {
    ///     Err(SheetChatError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// 補完APIの呼び出しに失敗したエラー
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),
}

/// ユーザー向けに区別する補完エラーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionErrorKind {
    /// APIクォータの枯渇
    QuotaExceeded,

    /// レート制限（HTTP 429）
    RateLimited,

    /// 上記以外のすべての失敗
    Unexpected,
}

impl CompletionErrorKind {
    /// 会話ログに追加する固定メッセージ
    pub fn user_message(self) -> &'static str {
        match self {
            CompletionErrorKind::QuotaExceeded => QUOTA_EXCEEDED_MESSAGE,
            CompletionErrorKind::RateLimited => RATE_LIMITED_MESSAGE,
            CompletionErrorKind::Unexpected => UNEXPECTED_ERROR_MESSAGE,
        }
    }
}

/// 補完APIの呼び出しで発生するエラー
///
/// 詳細はログ出力用に保持し、ユーザーには`kind()`に応じた固定メッセージのみを
/// 表示します。
#[derive(Error, Debug)]
pub enum CompletionError {
    /// APIクォータ超過（`insufficient_quota`）
    #[error("API quota exceeded: {message}")]
    QuotaExceeded {
        /// APIが返したエラーメッセージ
        message: String,
    },

    /// レート制限超過（HTTP 429）
    #[error("Rate limit exceeded (HTTP 429): {message}")]
    RateLimited {
        /// APIが返したエラーメッセージ
        message: String,
    },

    /// その他のエラーステータス
    #[error("API returned error status {status}: {message}")]
    Status {
        /// HTTPステータスコード
        status: u16,
        /// APIが返したエラーメッセージ
        message: String,
    },

    /// HTTPリクエストの送信や応答の読み込みに失敗
    #[error("Failed to send HTTP request: {0}")]
    Http(#[from] reqwest::Error),

    /// 応答ボディが想定した形式ではない
    #[error("Invalid response from completion API: {0}")]
    InvalidResponse(String),

    /// APIキーが設定されていない
    #[error("API key is not configured")]
    MissingCredential,
}

impl CompletionError {
    /// ユーザー向けのエラー種別
    pub fn kind(&self) -> CompletionErrorKind {
        match self {
            CompletionError::QuotaExceeded { .. } => CompletionErrorKind::QuotaExceeded,
            CompletionError::RateLimited { .. } => CompletionErrorKind::RateLimited,
            _ => CompletionErrorKind::Unexpected,
        }
    }

    /// 会話ログに追加する固定メッセージ
    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }
}
