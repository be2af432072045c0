//! Chat completion API types
//!
//! OpenAI互換`chat/completions`の応答とエラーボディのJSON形式。

use serde::Deserialize;

/// 応答ボディ
#[derive(Deserialize, Debug)]
pub(crate) struct ChatCompletionResponse {
    /// 候補の一覧
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// 1つの候補
#[derive(Deserialize, Debug)]
pub(crate) struct Choice {
    /// 候補のメッセージ
    pub message: ResponseMessage,
}

/// 候補のメッセージ
#[derive(Deserialize, Debug)]
pub(crate) struct ResponseMessage {
    /// 本文（ツール呼び出しのみの応答などでは`null`）
    #[serde(default)]
    pub content: Option<String>,
}

/// エラーボディ（`{"error": {...}}`）
#[derive(Deserialize, Debug)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

/// エラーの詳細
#[derive(Deserialize, Debug, Default)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

impl ApiErrorDetail {
    /// `code`を文字列として取得（数値のコードは文字列化）
    pub fn code_str(&self) -> Option<String> {
        match &self.code {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}
