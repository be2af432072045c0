//! Intake Module
//!
//! アップロードされたファイルを検証し、最初のシートを行レコードのJSONテキストに
//! 変換して`Document`を生成するモジュール。

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::api::RejectReason;
use crate::error::SheetChatError;
use crate::parser::{RecordBuilder, WorkbookParser};
use crate::security::{guess_mime_type, IntakeLimits};
use crate::types::{Document, RowRecord};

/// 取り込み対象のファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// ファイル名
    pub name: String,
    /// 申告されたMIMEタイプ（不明な場合は空文字列）
    pub mime_type: String,
    /// ファイル内容
    pub bytes: Vec<u8>,
}

impl Upload {
    /// 新しいアップロードを生成
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// ファイルサイズ（バイト）
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// ファイル取り込み処理
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetchat::Intake;
///
/// # fn main() -> Result<(), sheetchat::SheetChatError> {
/// let intake = Intake::default();
/// let upload = intake.read_path("sales.xlsx")?;
/// let document = intake.accept(upload)?;
/// println!("{}", document.info());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Intake {
    /// 種別・サイズの制限
    limits: IntakeLimits,

    /// 行レコードビルダー
    records: RecordBuilder,
}

impl Intake {
    /// 指定した制限で取り込み処理を生成
    pub fn new(limits: IntakeLimits) -> Self {
        Self {
            limits,
            records: RecordBuilder::new(),
        }
    }

    /// 現在の制限設定
    pub fn limits(&self) -> &IntakeLimits {
        &self.limits
    }

    /// アップロードを検証する（デコードは行わない）
    pub fn check(&self, upload: &Upload) -> Result<(), RejectReason> {
        self.limits
            .check(&upload.name, &upload.mime_type, upload.size_bytes())
    }

    /// アップロードを検証し、`Document`に変換する
    ///
    /// # 処理フロー
    ///
    /// 1. 種別（MIMEタイプ・拡張子）とサイズの検証
    /// 2. ワークブックのデコード（XLSX/XLS）
    /// 3. 最初のシートを行レコードに変換
    /// 4. 行レコードをJSONテキストにシリアライズ
    ///
    /// # 戻り値
    ///
    /// * `Ok(Document)` - 取り込みに成功した場合
    /// * `Err(SheetChatError::Rejected)` - 検証に失敗した場合
    /// * `Err(SheetChatError::Parse)` - デコードに失敗した場合
    pub fn accept(&self, upload: Upload) -> Result<Document, SheetChatError> {
        if let Err(reason) = self.check(&upload) {
            tracing::warn!(name = %upload.name, reason = %reason, "Rejected upload");
            return Err(reason.into());
        }

        let size_bytes = upload.size_bytes();
        let records = self.parse_first_sheet(upload.bytes)?;
        let content = serialize_records(&records)?;

        tracing::info!(
            name = %upload.name,
            size_bytes,
            records = records.len(),
            "Accepted upload"
        );

        Ok(Document::new(
            upload.name,
            upload.mime_type,
            size_bytes,
            content,
        ))
    }

    /// ファイルを読み込んで`Upload`を生成する
    ///
    /// MIMEタイプは拡張子から推定します。サイズ上限は読み込み前に
    /// ファイルのメタデータで検証します。
    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<Upload, SheetChatError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let mime_type = guess_mime_type(&name);

        let mut file = File::open(path)?;
        let size_bytes = file.metadata()?.len();
        self.limits.check(&name, mime_type, size_bytes)?;

        let mut bytes = Vec::with_capacity(size_bytes as usize);
        file.read_to_end(&mut bytes)?;

        Ok(Upload::new(name, mime_type, bytes))
    }

    /// バイト列から最初のシートの行レコードを取得する
    ///
    /// シートが1枚もない場合は空の列を返します。
    pub fn parse_first_sheet(&self, bytes: Vec<u8>) -> Result<Vec<RowRecord>, SheetChatError> {
        let mut parser = WorkbookParser::from_bytes(bytes)?;
        match parser.first_sheet()? {
            Some((_, range)) => Ok(self.records.build(&range)),
            None => Ok(Vec::new()),
        }
    }
}

/// バイト列から最初のシートの行レコードを取得する
///
/// # 使用例
///
/// ```rust,no_run
/// let bytes = std::fs::read("sales.xlsx")?;
/// let records = sheetchat::parse_first_sheet(bytes)?;
/// println!("{} rows", records.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_first_sheet(bytes: Vec<u8>) -> Result<Vec<RowRecord>, SheetChatError> {
    Intake::default().parse_first_sheet(bytes)
}

/// 行レコードを整形済みJSONテキスト（インデント2）にシリアライズする
pub fn serialize_records(records: &[RowRecord]) -> Result<String, SheetChatError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// JSONテキストを行レコードの列に戻す
///
/// `serialize_records`の逆変換です。配列以外や、要素がオブジェクトでない
/// 場合は`SheetChatError::Json`を返します。
pub fn parse_records(content: &str) -> Result<Vec<RowRecord>, SheetChatError> {
    Ok(serde_json::from_str(content)?)
}
