//! Security Module
//!
//! 取り込み前のファイル検証を実装するモジュール。
//! 種別（MIMEタイプ・拡張子）とサイズの上限を検証し、条件を満たさない
//! ファイルはデコードする前に拒否します。

use crate::api::RejectReason;

/// 受け入れるファイルの最大サイズ（30MB）
pub const MAX_UPLOAD_BYTES: u64 = 31_457_280;

/// XLSX形式のMIMEタイプ
pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// XLS形式のMIMEタイプ
pub const XLS_MIME_TYPE: &str = "application/vnd.ms-excel";

/// 種別不明のファイルに割り当てるMIMEタイプ
pub(crate) const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// 取り込み時の制限設定
///
/// # 使用例
///
/// ```rust
/// use sheetchat::IntakeLimits;
///
/// let limits = IntakeLimits::default();
/// assert!(limits.check("report.xlsx", "", 1024).is_ok());
/// assert!(limits.check("notes.txt", "text/plain", 1024).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeLimits {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 30MB (31_457_280 bytes)
    pub max_file_size: u64,
    /// 受け入れるMIMEタイプ
    pub accepted_mime_types: Vec<String>,
    /// 受け入れる拡張子（小文字、ドットなし）
    pub accepted_extensions: Vec<String>,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_file_size: MAX_UPLOAD_BYTES,
            accepted_mime_types: vec![XLSX_MIME_TYPE.to_string(), XLS_MIME_TYPE.to_string()],
            accepted_extensions: vec!["xlsx".to_string(), "xls".to_string()],
        }
    }
}

impl IntakeLimits {
    /// デフォルトの制限設定を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 最大サイズを変更する
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// MIMEタイプまたは拡張子がスプレッドシートかを判定
    ///
    /// どちらか一方が一致すれば受け入れます。拡張子は大文字小文字を区別しません。
    pub fn is_accepted_type(&self, name: &str, mime_type: &str) -> bool {
        let mime_type = mime_type.trim();
        if self
            .accepted_mime_types
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(mime_type))
        {
            return true;
        }

        match extension_of(name) {
            Some(ext) => self
                .accepted_extensions
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(&ext)),
            None => false,
        }
    }

    /// ファイルを検証する
    ///
    /// # 引数
    ///
    /// * `name` - ファイル名
    /// * `mime_type` - 申告されたMIMEタイプ（不明な場合は空文字列）
    /// * `size_bytes` - ファイルサイズ（バイト）
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - 受け入れ可能な場合
    /// * `Err(RejectReason)` - 種別またはサイズの条件を満たさない場合
    pub fn check(&self, name: &str, mime_type: &str, size_bytes: u64) -> Result<(), RejectReason> {
        if !self.is_accepted_type(name, mime_type) {
            return Err(RejectReason::UnsupportedType {
                name: name.to_string(),
                mime_type: mime_type.to_string(),
            });
        }

        if size_bytes > self.max_file_size {
            return Err(RejectReason::TooLarge {
                size_bytes,
                max_bytes: self.max_file_size,
            });
        }

        Ok(())
    }
}

/// ファイル名の拡張子からMIMEタイプを推定
pub(crate) fn guess_mime_type(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("xlsx") => XLSX_MIME_TYPE,
        Some("xls") => XLS_MIME_TYPE,
        _ => FALLBACK_MIME_TYPE,
    }
}

/// 小文字化した拡張子を取得
fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_by_mime_type() {
        let limits = IntakeLimits::default();
        assert!(limits.is_accepted_type("upload", XLSX_MIME_TYPE));
        assert!(limits.is_accepted_type("upload", XLS_MIME_TYPE));
    }

    #[test]
    fn test_accepts_by_extension() {
        let limits = IntakeLimits::default();
        assert!(limits.is_accepted_type("data.xlsx", ""));
        assert!(limits.is_accepted_type("data.xls", FALLBACK_MIME_TYPE));
        assert!(limits.is_accepted_type("DATA.XLSX", ""));
    }

    #[test]
    fn test_rejects_other_types() {
        let limits = IntakeLimits::default();
        assert!(!limits.is_accepted_type("data.csv", "text/csv"));
        assert!(!limits.is_accepted_type("xlsx", ""));
        assert!(!limits.is_accepted_type(".xlsx", ""));
        assert!(!limits.is_accepted_type("data.xlsx.txt", "text/plain"));
    }

    #[test]
    fn test_size_boundary() {
        let limits = IntakeLimits::default();
        assert!(limits.check("a.xlsx", "", MAX_UPLOAD_BYTES).is_ok());
        assert_eq!(
            limits.check("a.xlsx", "", MAX_UPLOAD_BYTES + 1),
            Err(RejectReason::TooLarge {
                size_bytes: MAX_UPLOAD_BYTES + 1,
                max_bytes: MAX_UPLOAD_BYTES,
            })
        );
    }

    #[test]
    fn test_type_checked_before_size() {
        let limits = IntakeLimits::default();
        let result = limits.check("movie.mp4", "video/mp4", MAX_UPLOAD_BYTES * 10);
        assert!(matches!(result, Err(RejectReason::UnsupportedType { .. })));
    }

    #[test]
    fn test_custom_max_file_size() {
        let limits = IntakeLimits::new().with_max_file_size(10);
        assert!(limits.check("a.xlsx", "", 10).is_ok());
        assert!(limits.check("a.xlsx", "", 11).is_err());
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("report.xlsx"), XLSX_MIME_TYPE);
        assert_eq!(guess_mime_type("legacy.XLS"), XLS_MIME_TYPE);
        assert_eq!(guess_mime_type("readme"), FALLBACK_MIME_TYPE);
    }
}
