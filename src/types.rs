//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::Role;

/// 1行分のレコード（ヘッダー名 → セル値）
///
/// キーの順序はシートの列順を保持します。空セルのキーは含まれません。
pub type RowRecord = serde_json::Map<String, serde_json::Value>;

/// 会話ログの1エントリ
///
/// 会話ログに追加された後は変更されません。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// 送信者ロール
    pub role: Role,

    /// メッセージ本文
    pub content: String,
}

impl Message {
    /// 新しいメッセージを生成
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// システムメッセージを生成
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// ユーザーメッセージを生成
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// アシスタントメッセージを生成
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// 取り込んだスプレッドシート
///
/// 最初のシートの行レコードをJSONテキストにシリアライズしたものを保持します。
/// 生成後は変更されず、新しいファイルを取り込むと丸ごと置き換えられます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    name: String,
    mime_type: String,
    size_bytes: u64,
    content: String,
}

impl Document {
    /// 新しいドキュメントを生成
    ///
    /// `content`は行レコード配列のJSONテキストです。
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            content: content.into(),
        }
    }

    /// ファイル名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIMEタイプ
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// ファイルサイズ（バイト）
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// シリアライズ済みの行レコード
    pub fn content(&self) -> &str {
        &self.content
    }

    /// 会話の先頭に置くシステムプロンプト
    pub fn system_prompt(&self) -> String {
        format!(
            "You are an AI assistant analyzing an Excel document. Here's the content in JSON format: {}",
            self.content
        )
    }

    /// 表示用のドキュメント情報
    pub fn info(&self) -> DocumentInfo<'_> {
        DocumentInfo { document: self }
    }
}

/// ドキュメント情報の表示
///
/// ```text
/// Name: sales.xlsx
/// Size: 12.50 KB
/// Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DocumentInfo<'a> {
    document: &'a Document,
}

impl DocumentInfo<'_> {
    /// KB単位のサイズ（小数点以下2桁）
    pub fn size_kb(&self) -> String {
        format!("{:.2} KB", self.document.size_bytes as f64 / 1024.0)
    }
}

impl fmt::Display for DocumentInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.document.name)?;
        writeln!(f, "Size: {}", self.size_kb())?;
        write!(f, "Type: {}", self.document.mime_type)
    }
}
