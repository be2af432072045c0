//! Formatter Module
//!
//! calamineのセル値をJSON値へ変換するモジュール。

use calamine::{Data, ExcelDateTime, ExcelDateTimeType};
use chrono::{Duration, DurationRound, NaiveDateTime, NaiveTime};
use serde_json::{Number, Value};

/// f64で誤差なく表現できる整数の上限（2^53）
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// 1900年日付システムで存在しない1900-02-29のシリアル値
const PHANTOM_LEAP_DAY_SERIAL: f64 = 60.0;

/// セルフォーマッター
///
/// セル値の変換処理のファサードとして機能します。
#[derive(Debug, Clone, Default)]
pub(crate) struct CellFormatter {
    /// 日付フォーマッター
    date_formatter: DateFormatter,
}

impl CellFormatter {
    /// 新しいCellFormatterインスタンスを生成
    pub fn new() -> Self {
        Self {
            date_formatter: DateFormatter,
        }
    }

    /// セル値をレコードに格納するJSON値へ変換
    ///
    /// 日付書式のセルは生のシリアル値ではなく、ISO 8601形式の文字列として
    /// 格納します（`DateFormatter`を参照）。書式を持たない数値セルは数値のままです。
    ///
    /// # 戻り値
    ///
    /// * `Some(Value)` - 値を持つセル
    /// * `None` - 空セル（レコードにはキーを含めない）
    pub fn to_value(&self, cell: &Data) -> Option<Value> {
        match cell {
            Data::Int(i) => Some(Value::from(*i)),
            Data::Float(f) => Some(number_value(*f)),
            Data::String(s) if s.is_empty() => None,
            Data::String(s) => Some(Value::String(s.clone())),
            Data::Bool(b) => Some(Value::Bool(*b)),
            Data::Error(e) => Some(Value::String(e.to_string())),
            Data::DateTime(dt) => {
                let formatted = if dt.is_duration() {
                    self.date_formatter.format_duration(dt)
                } else {
                    self.date_formatter.format(dt)
                };
                Some(
                    formatted
                        .map(Value::String)
                        .unwrap_or_else(|| number_value(dt.as_f64())),
                )
            }
            Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::String(s.clone())),
            Data::Empty => None,
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// ヘッダー行のセルを列名テキストへ変換
    ///
    /// 空セルは`None`を返し、呼び出し側で`__EMPTY`系の名前を割り当てます。
    pub fn header_text(&self, cell: &Data) -> Option<String> {
        match self.to_value(cell)? {
            Value::String(s) => Some(s),
            Value::Bool(true) => Some("TRUE".to_string()),
            Value::Bool(false) => Some("FALSE".to_string()),
            other => Some(other.to_string()),
        }
    }
}

/// 数値をJSON値へ変換
///
/// 整数値は整数として、それ以外は浮動小数点数として格納します。
/// NaNや無限大はJSONで表現できないため文字列にします。
pub(crate) fn number_value(value: f64) -> Value {
    if !value.is_finite() {
        return Value::String(value.to_string());
    }
    if value.fract() == 0.0 && value.abs() < MAX_SAFE_INTEGER {
        return Value::from(value as i64);
    }
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

/// 日付フォーマッター
///
/// Excelの日時セルをISO 8601文字列に変換します。
/// 1900年・1904年のどちらの日付システムかはcalamineがセルごとに保持しており、
/// `ExcelDateTime::as_datetime`がその差を吸収します。
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DateFormatter;

impl DateFormatter {
    /// 日付値をフォーマット
    ///
    /// # 戻り値
    ///
    /// * `Some(String)` - `YYYY-MM-DD`、時刻を含む場合は`YYYY-MM-DDTHH:MM:SS`、
    ///   1未満のシリアル値は時刻のみ`HH:MM:SS`
    /// * `None` - 範囲外のシリアル値
    ///
    /// 1900年日付システムのシリアル値60はExcelと同じく`1900-02-29`と表示します。
    pub fn format(&self, dt: &ExcelDateTime) -> Option<String> {
        let serial_value = dt.as_f64();
        if !serial_value.is_finite() || serial_value < 0.0 {
            return None;
        }

        let datetime = round_to_second(dt.as_datetime()?)?;
        if serial_value < 1.0 {
            return Some(datetime.format("%H:%M:%S").to_string());
        }

        let date = if is_phantom_leap_day(dt) {
            "1900-02-29".to_string()
        } else {
            datetime.format("%Y-%m-%d").to_string()
        };

        if datetime.time() == NaiveTime::MIN {
            Some(date)
        } else {
            Some(format!("{}T{}", date, datetime.format("%H:%M:%S")))
        }
    }

    /// 経過時間をフォーマット（`H:MM:SS`、時間は24を超え得る）
    pub fn format_duration(&self, dt: &ExcelDateTime) -> Option<String> {
        if !dt.as_f64().is_finite() || dt.as_f64() < 0.0 {
            return None;
        }
        let total = (dt.as_duration()?.num_milliseconds() + 500) / 1000;
        Some(format!(
            "{}:{:02}:{:02}",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        ))
    }
}

/// ミリ秒単位の誤差を秒に丸める
fn round_to_second(datetime: NaiveDateTime) -> Option<NaiveDateTime> {
    datetime.duration_round(Duration::try_seconds(1)?).ok()
}

/// 1900年日付システムのシリアル値60か
///
/// 1904年日付システムのセルは`as_datetime`の結果が1900年日付システムとして
/// 解釈した場合と一致しないため区別できます。
fn is_phantom_leap_day(dt: &ExcelDateTime) -> bool {
    let serial_value = dt.as_f64();
    if serial_value.floor() != PHANTOM_LEAP_DAY_SERIAL {
        return false;
    }
    let as_1900 = ExcelDateTime::new(serial_value, ExcelDateTimeType::DateTime, false);
    dt.as_datetime() == as_1900.as_datetime()
}
