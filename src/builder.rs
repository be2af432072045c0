//! Builder Module
//!
//! Fluent Builder APIを提供し、`Session`インスタンスを段階的に構築する。

use std::sync::Arc;

use crate::completion::{CompletionBackend, CompletionSettings, OpenAiClient};
use crate::config::Config;
use crate::error::SheetChatError;
use crate::intake::Intake;
use crate::security::IntakeLimits;
use crate::session::Session;

/// temperatureの許容範囲
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// Fluent Builder APIを提供する構造体
///
/// `Session`インスタンスを段階的に構築するためのビルダーです。
/// 補完バックエンド以外の設定項目にはデフォルト値が設定されており、
/// 必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetchat::{OpenAiClient, SessionBuilder};
///
/// # fn main() -> Result<(), sheetchat::SheetChatError> {
/// let session = SessionBuilder::new()
///     .with_backend(OpenAiClient::new("sk-..."))
///     .with_model("gpt-4o-mini")
///     .with_temperature(0.2)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    /// 補完リクエストのパラメータ
    settings: CompletionSettings,

    /// 取り込み時の制限
    limits: IntakeLimits,

    /// 補完バックエンド
    backend: Option<Arc<dyn CompletionBackend>>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - モデル: `gpt-3.5-turbo`
    /// - temperature: 0.7
    /// - 最大出力トークン数: 1000
    /// - 取り込み制限: XLSX/XLS、30MBまで
    pub fn new() -> Self {
        Self {
            settings: CompletionSettings::default(),
            limits: IntakeLimits::default(),
            backend: None,
        }
    }

    /// 設定からビルダーを生成する
    ///
    /// 補完パラメータを設定値で上書きし、`OpenAiClient`をバックエンドとして
    /// 登録します。
    pub fn from_config(config: &Config) -> Self {
        Self {
            settings: config.completion_settings(),
            limits: IntakeLimits::default(),
            backend: None,
        }
        .with_backend(OpenAiClient::from_config(config))
    }

    /// モデル識別子を指定する
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.settings.model = model.into();
        self
    }

    /// temperatureを指定する
    ///
    /// # 制約
    ///
    /// * 0.0以上2.0以下でなければならない
    /// * 制約違反の場合、`build()`時に`SheetChatError::Config`を返す
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.settings.temperature = temperature;
        self
    }

    /// 最大出力トークン数を指定する
    ///
    /// 0を指定した場合、`build()`時に`SheetChatError::Config`を返します。
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.settings.max_tokens = max_tokens;
        self
    }

    /// 取り込み時の制限を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use sheetchat::{IntakeLimits, SessionBuilder};
    ///
    /// // 1MBまでに制限
    /// let builder = SessionBuilder::new()
    ///     .with_limits(IntakeLimits::new().with_max_file_size(1024 * 1024));
    /// ```
    pub fn with_limits(mut self, limits: IntakeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// 補完バックエンドを指定する
    pub fn with_backend<B>(mut self, backend: B) -> Self
    where
        B: CompletionBackend + 'static,
    {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// 設定を検証し、`Session`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Session)`: 設定が有効な場合
    /// * `Err(SheetChatError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * `SheetChatError::Config(String)`: 設定の検証に失敗した場合
    ///   * モデル識別子が空
    ///   * temperatureが範囲外
    ///   * 最大出力トークン数が0
    ///   * 最大ファイルサイズが0
    ///   * 補完バックエンドが未指定
    pub fn build(self) -> Result<Session, SheetChatError> {
        // 1. 補完パラメータの検証
        if self.settings.model.trim().is_empty() {
            return Err(SheetChatError::Config(
                "model identifier cannot be empty".to_string(),
            ));
        }

        if !TEMPERATURE_RANGE.contains(&self.settings.temperature) {
            return Err(SheetChatError::Config(format!(
                "temperature must be between {} and {}: {}",
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end(),
                self.settings.temperature
            )));
        }

        if self.settings.max_tokens == 0 {
            return Err(SheetChatError::Config(
                "max_tokens must be > 0".to_string(),
            ));
        }

        // 2. 取り込み制限の検証
        if self.limits.max_file_size == 0 {
            return Err(SheetChatError::Config(
                "max_file_size must be > 0".to_string(),
            ));
        }

        // 3. Sessionインスタンス生成
        let backend = self.backend.ok_or_else(|| {
            SheetChatError::Config("completion backend is not configured".to_string())
        })?;

        Ok(Session::new(Intake::new(self.limits), self.settings, backend))
    }
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("settings", &self.settings)
            .field("limits", &self.limits)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn CompletionBackend>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionRequest;
    use crate::error::CompletionError;
    use async_trait::async_trait;

    struct SilentBackend;

    #[async_trait]
    impl CompletionBackend for SilentBackend {
        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<Option<String>, CompletionError> {
            Ok(None)
        }
    }

    fn builder() -> SessionBuilder {
        SessionBuilder::new().with_backend(SilentBackend)
    }

    fn expect_config_error(result: Result<Session, SheetChatError>, needle: &str) {
        match result {
            Err(SheetChatError::Config(msg)) => {
                assert!(msg.contains(needle), "unexpected message: {}", msg);
            }
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_session_builder_new() {
        let builder = SessionBuilder::new();
        assert_eq!(builder.settings, CompletionSettings::default());
        assert_eq!(builder.limits, IntakeLimits::default());
        assert!(builder.backend.is_none());
    }

    #[test]
    fn test_builder_method_chaining() {
        let builder = builder()
            .with_model("gpt-4o-mini")
            .with_temperature(0.0)
            .with_max_tokens(64)
            .with_limits(IntakeLimits::new().with_max_file_size(1024));

        assert_eq!(builder.settings.model, "gpt-4o-mini");
        assert_eq!(builder.settings.temperature, 0.0);
        assert_eq!(builder.settings.max_tokens, 64);
        assert_eq!(builder.limits.max_file_size, 1024);
        assert!(builder.backend.is_some());
    }

    #[test]
    fn test_build_success() {
        let session = builder().build().unwrap();
        assert!(session.document().is_none());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_build_with_boundary_temperatures() {
        assert!(builder().with_temperature(0.0).build().is_ok());
        assert!(builder().with_temperature(2.0).build().is_ok());
    }

    #[test]
    fn test_build_with_invalid_temperature() {
        expect_config_error(builder().with_temperature(2.5).build(), "temperature");
        expect_config_error(builder().with_temperature(-0.1).build(), "temperature");
        expect_config_error(builder().with_temperature(f32::NAN).build(), "temperature");
    }

    #[test]
    fn test_build_with_zero_max_tokens() {
        expect_config_error(builder().with_max_tokens(0).build(), "max_tokens");
    }

    #[test]
    fn test_build_with_empty_model() {
        expect_config_error(builder().with_model("  ").build(), "model");
    }

    #[test]
    fn test_build_with_zero_file_size() {
        expect_config_error(
            builder()
                .with_limits(IntakeLimits::new().with_max_file_size(0))
                .build(),
            "max_file_size",
        );
    }

    #[test]
    fn test_build_without_backend() {
        expect_config_error(SessionBuilder::new().build(), "backend");
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            model: "gpt-4o".to_string(),
            temperature: 1.0,
            max_tokens: 200,
            ..Config::default()
        };
        let builder = SessionBuilder::from_config(&config);
        assert_eq!(builder.settings.model, "gpt-4o");
        assert_eq!(builder.settings.temperature, 1.0);
        assert_eq!(builder.settings.max_tokens, 200);
        assert!(builder.backend.is_some());
    }
}
