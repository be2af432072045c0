//! Parser Module
//!
//! calamineを使用したExcelファイル解析の実装。
//! 最初のシートのみを読み込み、ヘッダー行をキーとする行レコードに変換します。

mod records;
mod workbook;

pub(crate) use records::RecordBuilder;
pub(crate) use workbook::WorkbookParser;
