//! Records Module
//!
//! シートのセル範囲を行レコードの列に変換します。

use std::collections::HashMap;

use calamine::{Data, Range};
use rayon::prelude::*;

use crate::formatter::CellFormatter;
use crate::types::RowRecord;

/// 空のヘッダーセルに割り当てる列名
const EMPTY_HEADER: &str = "__EMPTY";

/// 行レコードビルダー
///
/// 範囲の先頭行をヘッダーとし、以降の各行を1レコードに変換します。
///
/// - 空のヘッダーは`__EMPTY`, `__EMPTY_1`, ... と命名
/// - 重複したヘッダーには`_1`, `_2`, ... を付加
/// - 空セルはレコードに含めない
/// - すべてのセルが空の行はスキップ
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordBuilder {
    formatter: CellFormatter,
}

impl RecordBuilder {
    /// 新しいビルダーを生成
    pub fn new() -> Self {
        Self {
            formatter: CellFormatter::new(),
        }
    }

    /// セル範囲を行レコードに変換
    ///
    /// 行の変換は並列に行い、結果は元の行順を保持します。
    pub fn build(&self, range: &Range<Data>) -> Vec<RowRecord> {
        let mut rows = range.rows();
        let Some(header_cells) = rows.next() else {
            return Vec::new();
        };

        let headers = self.headers(header_cells);
        let body: Vec<&[Data]> = rows.collect();

        body.par_iter()
            .filter_map(|row| self.record(&headers, row))
            .collect()
    }

    /// ヘッダー行から一意な列名を生成
    pub fn headers(&self, cells: &[Data]) -> Vec<String> {
        let mut counts = HashMap::new();
        cells
            .iter()
            .map(|cell| {
                let base = self
                    .formatter
                    .header_text(cell)
                    .unwrap_or_else(|| EMPTY_HEADER.to_string());
                unique_header(base, &mut counts)
            })
            .collect()
    }

    /// 1行をレコードに変換（空行は`None`）
    fn record(&self, headers: &[String], row: &[Data]) -> Option<RowRecord> {
        let mut record = RowRecord::new();
        for (header, cell) in headers.iter().zip(row) {
            if let Some(value) = self.formatter.to_value(cell) {
                record.insert(header.clone(), value);
            }
        }

        if record.is_empty() {
            None
        } else {
            Some(record)
        }
    }
}

/// 既出の列名と衝突しない名前を返す
fn unique_header(base: String, counts: &mut HashMap<String, usize>) -> String {
    let mut counter = counts.get(&base).copied().unwrap_or(0);
    if counter == 0 {
        counts.insert(base.clone(), 1);
        return base;
    }

    let mut candidate;
    loop {
        candidate = format!("{}_{}", base, counter);
        counter += 1;
        if !counts.contains_key(&candidate) {
            break;
        }
    }
    counts.insert(base, counter);
    counts.insert(candidate.clone(), 1);
    candidate
}
