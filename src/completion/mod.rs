//! Completion Module
//!
//! チャット補完APIへのリクエストと、その実装（OpenAI互換HTTPクライアント）を
//! 提供するモジュール。

mod openai;
mod types;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CompletionError;
use crate::types::Message;

pub use openai::{OpenAiClient, DEFAULT_BASE_URL};

/// デフォルトのモデル識別子
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// デフォルトのtemperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// デフォルトの最大出力トークン数
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// 補完リクエストの固定パラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    /// モデル識別子
    pub model: String,
    /// temperature（0.0〜2.0）
    pub temperature: f32,
    /// 最大出力トークン数
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// 補完リクエスト
///
/// そのままAPIのリクエストボディとしてシリアライズされます。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// モデル識別子
    pub model: String,
    /// 会話ログ全体（システムプロンプトと新しいユーザーメッセージを含む）
    pub messages: Vec<Message>,
    /// temperature
    pub temperature: f32,
    /// 最大出力トークン数
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// 設定と会話ログからリクエストを生成
    pub fn new(settings: &CompletionSettings, messages: Vec<Message>) -> Self {
        Self {
            model: settings.model.clone(),
            messages,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// 補完APIのバックエンド
///
/// 1リクエストにつき1つの応答を同期的に待ちます。ストリーミングや
/// リトライは行いません。
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// 会話ログを送信し、最初の候補の本文を返す
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(text))` - 応答本文
    /// * `Ok(None)` - 応答はあったが本文が空
    /// * `Err(CompletionError)` - 呼び出しに失敗した場合
    async fn complete(&self, request: &CompletionRequest)
        -> Result<Option<String>, CompletionError>;
}
