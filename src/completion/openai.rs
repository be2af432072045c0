//! OpenAI-compatible completion client
//!
//! `POST {base_url}/chat/completions`を直接呼び出すHTTPクライアント。

use async_trait::async_trait;
use reqwest::StatusCode;

use super::types::{ApiErrorBody, ChatCompletionResponse};
use super::{CompletionBackend, CompletionRequest};
use crate::config::Config;
use crate::error::CompletionError;

/// デフォルトのAPIベースURL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// クォータ枯渇を示すエラーコード
const INSUFFICIENT_QUOTA: &str = "insufficient_quota";

/// OpenAI互換のチャット補完クライアント
///
/// `reqwest::Client`を共有し、コネクションを再利用します。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetchat::{CompletionBackend, CompletionRequest, CompletionSettings, Message, OpenAiClient};
///
/// # async fn run() -> Result<(), sheetchat::CompletionError> {
/// let client = OpenAiClient::new("sk-...");
/// let request = CompletionRequest::new(
///     &CompletionSettings::default(),
///     vec![Message::user("Hello")],
/// );
/// let reply = client.complete(&request).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// APIキーを指定してクライアントを生成
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// ベースURLを変更する（末尾の`/`は取り除く）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// 設定からクライアントを生成
    ///
    /// APIキーが未設定の場合も生成は成功し、最初の呼び出しで
    /// `CompletionError::MissingCredential`を返します。
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_key.clone().unwrap_or_default()).with_base_url(&config.base_url)
    }

    /// ベースURL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<Option<String>, CompletionError> {
        if self.api_key.is_empty() {
            return Err(CompletionError::MissingCredential);
        }

        let url = self.endpoint();
        tracing::debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            "Calling chat completion API"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                status_code = status.as_u16(),
                error_body = %error_body,
                "Chat completion API returned error status"
            );

            return Err(classify_error(status, &error_body));
        }

        let response_body = response.text().await?;
        let parsed: ChatCompletionResponse =
            serde_json::from_str(&response_body).map_err(|e| {
                CompletionError::InvalidResponse(format!(
                    "failed to parse JSON response: {} - Response body: {}",
                    e, response_body
                ))
            })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            CompletionError::InvalidResponse("response contains no choices".to_string())
        })?;

        let content = choice.message.content.filter(|text| !text.is_empty());
        tracing::debug!(
            response_len = content.as_ref().map_or(0, |text| text.len()),
            "Received chat completion"
        );

        Ok(content)
    }
}

/// エラーステータスとボディから`CompletionError`を決定する
///
/// 判定順序はクォータ枯渇、HTTP 429、その他の順です。
fn classify_error(status: StatusCode, body: &str) -> CompletionError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error)
        .unwrap_or_default();

    let message = detail.message.clone().unwrap_or_else(|| body.to_string());

    let is_quota = detail.code_str().as_deref() == Some(INSUFFICIENT_QUOTA)
        || detail.kind.as_deref() == Some(INSUFFICIENT_QUOTA);

    if is_quota {
        CompletionError::QuotaExceeded { message }
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        CompletionError::RateLimited { message }
    } else {
        CompletionError::Status {
            status: status.as_u16(),
            message,
        }
    }
}
