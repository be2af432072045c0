//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 会話メッセージの送信者ロール
///
/// 補完APIのワイヤ形式（`"system"`, `"user"`, `"assistant"`）と一致するように
/// 小文字でシリアライズされます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// ドキュメント内容を埋め込んだ前置きプロンプト
    System,

    /// ユーザーの質問
    User,

    /// 補完APIからの応答、またはエラー説明
    Assistant,
}

impl Role {
    /// ワイヤ形式の文字列表現を返す
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// テーブルプレビューの出力フォーマット
///
/// # 出力例（Text）
///
/// ```text
/// +-------+-----+
/// | Name  | Age |
/// +-------+-----+
/// | Alice | 30  |
/// +-------+-----+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum PreviewFormat {
    /// 罫線付きのプレーンテキスト（デフォルト）
    ///
    /// 全角文字は表示幅2として列幅を計算します。
    #[default]
    Text,

    /// Markdownテーブル
    Markdown,

    /// HTMLテーブル（セル内容はエスケープされます）
    Html,
}

/// ファイル受け入れを拒否した理由
///
/// 種別・拡張子・サイズの検証に失敗したファイルはドキュメントとして
/// 取り込まれず、既存の状態も変更されません。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RejectReason {
    /// MIMEタイプも拡張子もスプレッドシートではない
    #[error("File type not supported: '{name}' ({mime_type}). Please upload an Excel file")]
    UnsupportedType {
        /// ファイル名
        name: String,
        /// 申告されたMIMEタイプ
        mime_type: String,
    },

    /// サイズ上限を超えている
    #[error("File is too large: {size_bytes} bytes (max: {max_bytes} bytes)")]
    TooLarge {
        /// ファイルサイズ（バイト）
        size_bytes: u64,
        /// 許容される最大サイズ（バイト）
        max_bytes: u64,
    },
}
