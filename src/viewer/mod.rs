//! Viewer Module
//!
//! シリアライズ済みの行レコードを再解析し、先頭100行までをテーブルとして
//! 表示するモジュール。会話ループとは独立して動作します。

mod formatters;

use std::io::Write;

use serde_json::Value;

use crate::api::PreviewFormat;
use crate::error::SheetChatError;
use crate::intake::parse_records;
use crate::types::RowRecord;

pub use formatters::*;

/// プレビューに表示する最大行数
pub const PREVIEW_ROW_LIMIT: usize = 100;

/// レコードが1件もない場合に表示するテキスト
pub const EMPTY_STATE_TEXT: &str = "No data available";

/// テーブルプレビュー
///
/// ヘッダーは最初のレコードのキーから決定します。以降のレコードに存在しない
/// キーは空文字列として表示し、最初のレコードにないキーは表示しません。
///
/// # 使用例
///
/// ```rust
/// use sheetchat::{PreviewFormat, TablePreview};
///
/// # fn main() -> Result<(), sheetchat::SheetChatError> {
/// let preview = TablePreview::from_content(r#"[{"Name": "Alice", "Age": 30}]"#)?;
/// assert_eq!(preview.headers(), ["Name", "Age"]);
/// let text = preview.render_to_string(PreviewFormat::Markdown)?;
/// assert!(text.contains("Alice"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePreview {
    /// 列名
    headers: Vec<String>,

    /// 表示対象の行（最大`PREVIEW_ROW_LIMIT`行、列順はヘッダーと同じ）
    rows: Vec<Vec<String>>,

    /// 全レコード数
    total_rows: usize,
}

impl TablePreview {
    /// シリアライズ済みの行レコードからプレビューを生成
    ///
    /// # 戻り値
    ///
    /// * `Ok(TablePreview)` - 解析に成功した場合
    /// * `Err(SheetChatError::Json)` - 行レコード配列として解析できない場合
    pub fn from_content(content: &str) -> Result<Self, SheetChatError> {
        let records = parse_records(content)?;
        Ok(Self::from_records(&records))
    }

    /// 行レコードからプレビューを生成
    pub fn from_records(records: &[RowRecord]) -> Self {
        let headers: Vec<String> = records
            .first()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default();

        let rows = records
            .iter()
            .take(PREVIEW_ROW_LIMIT)
            .map(|record| {
                headers
                    .iter()
                    .map(|header| cell_text(record.get(header)))
                    .collect()
            })
            .collect();

        Self {
            headers,
            rows,
            total_rows: records.len(),
        }
    }

    /// 列名
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 表示対象の行
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// 全レコード数
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// 表示行数が全レコード数より少ないか
    pub fn is_truncated(&self) -> bool {
        self.total_rows > self.rows.len()
    }

    /// レコードが1件もないか
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    /// 切り詰めた場合の注記
    pub fn truncation_notice(&self) -> Option<String> {
        if self.is_truncated() {
            Some(format!(
                "Showing first {} rows of {} total rows",
                self.rows.len(),
                self.total_rows
            ))
        } else {
            None
        }
    }

    /// 指定したフォーマットで出力する
    pub fn render<W: Write>(
        &self,
        format: PreviewFormat,
        writer: &mut W,
    ) -> Result<(), SheetChatError> {
        OutputFormatter::from_format(format).render(self, writer)
    }

    /// 指定したフォーマットの文字列に変換する
    pub fn render_to_string(&self, format: PreviewFormat) -> Result<String, SheetChatError> {
        let mut buffer = Vec::new();
        self.render(format, &mut buffer)?;

        let result = String::from_utf8(buffer).map_err(|e| {
            SheetChatError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        Ok(result)
    }
}

/// 出力フォーマッター（Strategy Pattern）
#[derive(Debug, Clone, Copy)]
pub enum OutputFormatter {
    Text,
    Markdown,
    Html,
}

impl OutputFormatter {
    /// 出力フォーマットからフォーマッターを生成
    pub fn from_format(format: PreviewFormat) -> Self {
        match format {
            PreviewFormat::Text => OutputFormatter::Text,
            PreviewFormat::Markdown => OutputFormatter::Markdown,
            PreviewFormat::Html => OutputFormatter::Html,
        }
    }

    /// プレビューを出力する
    pub fn render<W: Write>(
        &self,
        preview: &TablePreview,
        writer: &mut W,
    ) -> Result<(), SheetChatError> {
        match self {
            OutputFormatter::Text => TextFormatter.render(preview, writer),
            OutputFormatter::Markdown => MarkdownFormatter.render(preview, writer),
            OutputFormatter::Html => HtmlFormatter.render(preview, writer),
        }
    }
}

/// セル値の表示テキスト（欠損値とnullは空文字列）
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
