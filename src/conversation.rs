//! Conversation Module
//!
//! 会話ログと処理中フラグを管理する同期的な状態機械。
//! 補完APIの呼び出しは`Session`が担当し、このモジュールはリクエストの
//! 組み立てと応答の記録のみを行います。

use crate::api::Role;
use crate::completion::{CompletionRequest, CompletionSettings};
use crate::error::CompletionError;
use crate::types::{Document, Message};

/// 応答本文が空の場合に記録するメッセージ
pub const FALLBACK_REPLY: &str = "Sorry, I could not process your request.";

/// 会話ログ
///
/// メッセージは追加のみで、既存のエントリが変更・削除されることはありません。
/// ドキュメントを取り込んだ会話は先頭にシステムメッセージを1つだけ持ちます。
///
/// # 使用例
///
/// ```rust
/// use sheetchat::{CompletionSettings, Conversation, Document};
///
/// let document = Document::new("a.xlsx", "", 10, "[]");
/// let mut conversation = Conversation::with_document(&document, CompletionSettings::default());
///
/// let turn = conversation.begin("How many rows?").unwrap();
/// assert!(conversation.is_busy());
/// assert_eq!(turn.request().messages.len(), 2);
///
/// conversation.finish(turn, Ok(Some("None.".to_string())));
/// assert!(!conversation.is_busy());
/// assert_eq!(conversation.visible_messages().count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    busy: bool,
    settings: CompletionSettings,
}

/// 応答待ちのターン
///
/// `Conversation::begin`が返し、`Conversation::finish`に渡して完了させます。
/// 応答を待たずに破棄する場合は`Conversation::cancel`で処理中フラグを解除します。
#[derive(Debug)]
#[must_use = "a pending turn keeps the conversation busy until it is finished"]
pub struct PendingTurn {
    request: CompletionRequest,
}

impl PendingTurn {
    /// 送信するリクエスト
    pub fn request(&self) -> &CompletionRequest {
        &self.request
    }
}

impl Conversation {
    /// ドキュメントを持たない空の会話を生成
    pub fn new(settings: CompletionSettings) -> Self {
        Self {
            messages: Vec::new(),
            busy: false,
            settings,
        }
    }

    /// ドキュメントのシステムプロンプトを先頭に置いた会話を生成
    pub fn with_document(document: &Document, settings: CompletionSettings) -> Self {
        Self {
            messages: vec![Message::system(document.system_prompt())],
            busy: false,
            settings,
        }
    }

    /// 会話ログ全体
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 表示対象のメッセージ（システムメッセージを除く）
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }

    /// 応答待ちか
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// 補完リクエストのパラメータ
    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    /// ユーザーメッセージを追加し、応答待ちのターンを開始する
    ///
    /// 応答待ちの場合や、空白のみのテキストの場合は何もせず`None`を返します。
    pub fn begin(&mut self, text: &str) -> Option<PendingTurn> {
        if self.busy || text.trim().is_empty() {
            return None;
        }

        self.messages.push(Message::user(text));
        self.busy = true;

        Some(PendingTurn {
            request: CompletionRequest::new(&self.settings, self.messages.clone()),
        })
    }

    /// 応答を待たずにターンを取り消す
    ///
    /// 処理中フラグのみを解除します。送信済みのユーザーメッセージは
    /// ログに残り、次のリクエストにも含まれます。
    pub fn cancel(&mut self) {
        if self.busy {
            tracing::debug!(messages = self.messages.len(), "Turn cancelled");
        }
        self.busy = false;
    }

    /// 応答を記録し、ターンを完了する
    ///
    /// 空の応答は`FALLBACK_REPLY`、失敗はエラー種別に応じた固定メッセージとして
    /// アシスタントメッセージを追加します。追加したメッセージを返します。
    pub fn finish(
        &mut self,
        turn: PendingTurn,
        result: Result<Option<String>, CompletionError>,
    ) -> &Message {
        let content = match result {
            Ok(Some(text)) if !text.is_empty() => text,
            Ok(_) => FALLBACK_REPLY.to_string(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    kind = ?e.kind(),
                    model = %turn.request.model,
                    "Completion failed"
                );
                e.user_message().to_string()
            }
        };

        self.busy = false;
        self.messages.push(Message::assistant(content));
        &self.messages[self.messages.len() - 1]
    }
}
