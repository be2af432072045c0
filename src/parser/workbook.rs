//! Workbook Module
//!
//! calamineのラッパーとして、ワークブックレベルの操作を提供します。

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use std::io::{Cursor, Read, Seek};

use crate::error::SheetChatError;

/// ワークブックパーサー
///
/// XLSX・XLSの両形式を`open_workbook_auto_from_rs`で自動判別して開きます。
pub(crate) struct WorkbookParser<RS: Read + Seek> {
    /// calamineのワークブック
    workbook: Sheets<RS>,
}

impl WorkbookParser<Cursor<Vec<u8>>> {
    /// メモリ上のバイト列からワークブックを開く
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - ワークブックの読み込みに成功した場合
    /// * `Err(SheetChatError::Parse)` - 形式が不正、または破損している場合
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SheetChatError> {
        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        Ok(Self { workbook })
    }
}

impl<RS: Read + Seek> WorkbookParser<RS> {
    /// すべてのシート名を取得（ワークブック内の順序）
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// 最初のシートを読み込む
    ///
    /// 2枚目以降のシートは読み込みません。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some((name, range)))` - シート名とセル範囲
    /// * `Ok(None)` - ワークブックにシートがない場合
    /// * `Err(SheetChatError::Parse)` - シートの解析に失敗した場合
    pub fn first_sheet(&mut self) -> Result<Option<(String, Range<Data>)>, SheetChatError> {
        let Some(name) = self.sheet_names().into_iter().next() else {
            return Ok(None);
        };

        let range = self.workbook.worksheet_range(&name)?;
        tracing::debug!(
            sheet = %name,
            rows = range.height(),
            cols = range.width(),
            "Loaded first sheet"
        );

        Ok(Some((name, range)))
    }
}

// ワークブック全体の読み込みは統合テスト（tests/）で検証します。
// 実際のXLSXファイルが必要なため、rust_xlsxwriterでフィクスチャを生成します。
