//! Configuration Module
//!
//! 環境変数から補完APIの接続設定を読み込むモジュール。
//! 未設定の項目はデフォルト値を使用します。

use std::env;
use std::str::FromStr;

use crate::completion::{
    CompletionSettings, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
use crate::error::SheetChatError;

/// APIキー
pub const ENV_API_KEY: &str = "SHEETCHAT_API_KEY";

/// `ENV_API_KEY`が未設定の場合に参照するAPIキー
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// APIベースURL
pub const ENV_BASE_URL: &str = "SHEETCHAT_BASE_URL";

/// モデル識別子
pub const ENV_MODEL: &str = "SHEETCHAT_MODEL";

/// temperature
pub const ENV_TEMPERATURE: &str = "SHEETCHAT_TEMPERATURE";

/// 最大出力トークン数
pub const ENV_MAX_TOKENS: &str = "SHEETCHAT_MAX_TOKENS";

/// 実行時設定
#[derive(Clone, PartialEq)]
pub struct Config {
    /// APIキー（未設定の場合は`None`）
    pub api_key: Option<String>,
    /// APIベースURL
    pub base_url: String,
    /// モデル識別子
    pub model: String,
    /// temperature
    pub temperature: f32,
    /// 最大出力トークン数
    pub max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl Config {
    /// 環境変数から設定を読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(Config)` - 読み込みに成功した場合
    /// * `Err(SheetChatError::Config)` - 数値項目を解析できない場合
    pub fn from_env() -> Result<Self, SheetChatError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空文字列の値は未設定として扱います。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SheetChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Ok(Self {
            api_key: get(ENV_API_KEY).or_else(|| get(ENV_OPENAI_API_KEY)),
            base_url: get(ENV_BASE_URL).unwrap_or(defaults.base_url),
            model: get(ENV_MODEL).unwrap_or(defaults.model),
            temperature: parse_var(ENV_TEMPERATURE, get(ENV_TEMPERATURE))?
                .unwrap_or(defaults.temperature),
            max_tokens: parse_var(ENV_MAX_TOKENS, get(ENV_MAX_TOKENS))?
                .unwrap_or(defaults.max_tokens),
        })
    }

    /// 補完リクエストのパラメータ
    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>) -> Result<Option<T>, SheetChatError> {
    value
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| SheetChatError::Config(format!("{} has an invalid value: {}", key, raw)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = Config::from_lookup(lookup(&[
            ("SHEETCHAT_API_KEY", "sk-test"),
            ("SHEETCHAT_BASE_URL", "http://localhost:9000/v1"),
            ("SHEETCHAT_MODEL", "gpt-4o-mini"),
            ("SHEETCHAT_TEMPERATURE", "0.2"),
            ("SHEETCHAT_MAX_TOKENS", "256"),
        ]))
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.base_url, "http://localhost:9000/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tokens, 256);

        let settings = config.completion_settings();
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.max_tokens, 256);
    }

    #[test]
    fn test_api_key_fallback() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-fallback")])).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-fallback"));

        let config = Config::from_lookup(lookup(&[
            ("SHEETCHAT_API_KEY", "sk-primary"),
            ("OPENAI_API_KEY", "sk-fallback"),
        ]))
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-primary"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = Config::from_lookup(lookup(&[
            ("SHEETCHAT_API_KEY", "  "),
            ("SHEETCHAT_MODEL", ""),
        ]))
        .unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_invalid_number() {
        let result = Config::from_lookup(lookup(&[("SHEETCHAT_MAX_TOKENS", "lots")]));
        match result {
            Err(SheetChatError::Config(msg)) => {
                assert!(msg.contains("SHEETCHAT_MAX_TOKENS"));
                assert!(msg.contains("lots"));
            }
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::from_lookup(lookup(&[("SHEETCHAT_API_KEY", "sk-secret")])).unwrap();
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }
}
