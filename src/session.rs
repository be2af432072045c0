//! Session Module
//!
//! ファイルの取り込み、会話ループ、テーブルプレビューをまとめる
//! フロントエンド向けのファサード。

use std::path::Path;
use std::sync::Arc;

use crate::api::RejectReason;
use crate::builder::SessionBuilder;
use crate::completion::{CompletionBackend, CompletionSettings};
use crate::conversation::{Conversation, PendingTurn};
use crate::error::{CompletionError, CompletionErrorKind, SheetChatError};
use crate::intake::{Intake, Upload};
use crate::types::{Document, Message};
use crate::viewer::TablePreview;

/// 提示する定型の質問
pub const SUGGESTED_QUESTIONS: [&str; 4] = [
    "What is the total number of records?",
    "Can you summarize the data?",
    "What are the column names?",
    "Show me the highest value in the dataset",
];

/// `Session::load`の結果
#[derive(Debug)]
pub enum LoadOutcome {
    /// 取り込みに成功し、ドキュメントと会話が置き換えられた
    Loaded,

    /// 種別またはサイズの検証で拒否された（状態は変更されない）
    Rejected(RejectReason),

    /// 読み込みまたはデコードに失敗した（状態は変更されない）
    Failed(SheetChatError),
}

impl LoadOutcome {
    /// 取り込みに成功したか
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded)
    }
}

/// `Session::send`の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// 応答（または空応答の代替メッセージ）を記録した
    Replied(Message),

    /// 補完APIの失敗を固定メッセージとして記録した
    ReportedError(CompletionErrorKind),

    /// ドキュメント未取り込み、空白のみのテキスト、応答待ちのいずれかで無視した
    Ignored,
}

/// チャットセッション
///
/// 取り込んだドキュメントは最大1つで、新しいファイルを取り込むとドキュメントと
/// 会話ログが丸ごと置き換えられます。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetchat::{Config, SessionBuilder, SendOutcome};
///
/// # async fn run() -> Result<(), sheetchat::SheetChatError> {
/// let config = Config::from_env()?;
/// let mut session = SessionBuilder::from_config(&config).build()?;
///
/// if session.load_path("sales.xlsx").is_loaded() {
///     if let SendOutcome::Replied(reply) = session.send("What are the column names?").await {
///         println!("{}", reply.content);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session {
    intake: Intake,
    settings: CompletionSettings,
    backend: Arc<dyn CompletionBackend>,
    document: Option<Document>,
    conversation: Conversation,
}

impl Session {
    pub(crate) fn new(
        intake: Intake,
        settings: CompletionSettings,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            intake,
            conversation: Conversation::new(settings.clone()),
            settings,
            backend,
            document: None,
        }
    }

    /// ビルダーを生成する
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// アップロードを取り込み、ドキュメントと会話を置き換える
    ///
    /// `Loaded`以外の結果では、既存のドキュメントと会話ログは変更されません。
    pub fn load(&mut self, upload: Upload) -> LoadOutcome {
        match self.intake.accept(upload) {
            Ok(document) => {
                self.replace_document(document);
                LoadOutcome::Loaded
            }
            Err(SheetChatError::Rejected(reason)) => LoadOutcome::Rejected(reason),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load document");
                LoadOutcome::Failed(e)
            }
        }
    }

    /// ファイルパスから取り込む
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> LoadOutcome {
        match self.intake.read_path(path) {
            Ok(upload) => self.load(upload),
            Err(SheetChatError::Rejected(reason)) => {
                tracing::warn!(reason = %reason, "Rejected file");
                LoadOutcome::Rejected(reason)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read file");
                LoadOutcome::Failed(e)
            }
        }
    }

    fn replace_document(&mut self, document: Document) {
        if let Some(previous) = &self.document {
            tracing::info!(
                previous = %previous.name(),
                current = %document.name(),
                "Replacing document and conversation"
            );
        }
        self.conversation = Conversation::with_document(&document, self.settings.clone());
        self.document = Some(document);
    }

    /// 質問を送信し、応答を会話ログに記録する
    ///
    /// ドキュメント未取り込み、空白のみのテキスト、応答待ちの場合は何もせず
    /// `SendOutcome::Ignored`を返します。補完APIの失敗は会話ログに固定メッセージ
    /// として記録され、セッションは継続します。
    ///
    /// 応答を待つ間にフューチャーが破棄された場合（タイムアウトなど）は
    /// ターンを取り消し、処理中フラグを解除します。
    pub async fn send(&mut self, text: &str) -> SendOutcome {
        if self.document.is_none() {
            return SendOutcome::Ignored;
        }

        let Some(turn) = self.conversation.begin(text) else {
            return SendOutcome::Ignored;
        };

        let mut guard = TurnGuard::new(&mut self.conversation);
        let result = self.backend.complete(turn.request()).await;
        let kind = result.as_ref().err().map(|e| e.kind());
        let reply = guard.finish(turn, result);
        drop(guard);

        tracing::debug!(
            messages = self.conversation.messages().len(),
            failed = kind.is_some(),
            "Turn completed"
        );

        match kind {
            Some(kind) => SendOutcome::ReportedError(kind),
            None => SendOutcome::Replied(reply),
        }
    }

    /// 取り込み済みのドキュメント
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// 現在の会話
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// 取り込み処理
    pub fn intake(&self) -> &Intake {
        &self.intake
    }

    /// ドキュメントのテーブルプレビュー
    ///
    /// ドキュメントが未取り込みの場合は`Ok(None)`を返します。
    pub fn preview(&self) -> Result<Option<TablePreview>, SheetChatError> {
        self.document
            .as_ref()
            .map(|document| TablePreview::from_content(document.content()))
            .transpose()
    }

    /// 応答待ちか
    pub fn is_busy(&self) -> bool {
        self.conversation.is_busy()
    }
}

/// 完了前に破棄された応答待ちのターンを取り消すガード
struct TurnGuard<'a> {
    conversation: &'a mut Conversation,
    finished: bool,
}

impl<'a> TurnGuard<'a> {
    fn new(conversation: &'a mut Conversation) -> Self {
        Self {
            conversation,
            finished: false,
        }
    }

    fn finish(
        &mut self,
        turn: PendingTurn,
        result: Result<Option<String>, CompletionError>,
    ) -> Message {
        self.finished = true;
        self.conversation.finish(turn, result).clone()
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.conversation.cancel();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("intake", &self.intake)
            .field("settings", &self.settings)
            .field("document", &self.document.as_ref().map(Document::name))
            .field("messages", &self.conversation.messages().len())
            .field("busy", &self.is_busy())
            .finish()
    }
}
