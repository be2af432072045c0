//! sheetchat - Chat with the first sheet of an Excel workbook
//!
//! This crate loads an Excel file (XLSX/XLS), converts its first sheet into
//! header-keyed row records, previews them as a table and lets you ask
//! questions about the data through an OpenAI-compatible chat completion API.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sheetchat::{Config, SendOutcome, SessionBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Read SHEETCHAT_API_KEY and friends from the environment
//!     let config = Config::from_env()?;
//!     let mut session = SessionBuilder::from_config(&config).build()?;
//!
//!     // Load the workbook
//!     if !session.load_path("sales.xlsx").is_loaded() {
//!         return Ok(());
//!     }
//!
//!     // Ask a question
//!     if let SendOutcome::Replied(reply) = session.send("What are the column names?").await {
//!         println!("{}", reply.content);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Preview Only
//!
//! The intake and the viewer work without a completion backend:
//!
//! ```rust,no_run
//! use sheetchat::{Intake, PreviewFormat, TablePreview};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let intake = Intake::default();
//!     let document = intake.accept(intake.read_path("sales.xlsx")?)?;
//!
//!     let preview = TablePreview::from_content(document.content())?;
//!     println!("{}", preview.render_to_string(PreviewFormat::Markdown)?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom Backend
//!
//! ```rust
//! use async_trait::async_trait;
//! use sheetchat::{CompletionBackend, CompletionError, CompletionRequest, SessionBuilder};
//!
//! struct Canned;
//!
//! #[async_trait]
//! impl CompletionBackend for Canned {
//!     async fn complete(
//!         &self,
//!         _request: &CompletionRequest,
//!     ) -> Result<Option<String>, CompletionError> {
//!         Ok(Some("42".to_string()))
//!     }
//! }
//!
//! # fn main() -> Result<(), sheetchat::SheetChatError> {
//! let session = SessionBuilder::new().with_backend(Canned).build()?;
//! assert!(session.document().is_none());
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod completion;
mod config;
mod conversation;
mod error;
mod formatter;
mod intake;
mod parser;
mod security;
mod session;
mod types;
mod viewer;

// 公開API
pub use api::{PreviewFormat, RejectReason, Role};
pub use builder::SessionBuilder;
pub use completion::{
    CompletionBackend, CompletionRequest, CompletionSettings, OpenAiClient, DEFAULT_BASE_URL,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
pub use config::{
    Config, ENV_API_KEY, ENV_BASE_URL, ENV_MAX_TOKENS, ENV_MODEL, ENV_OPENAI_API_KEY,
    ENV_TEMPERATURE,
};
pub use conversation::{Conversation, PendingTurn, FALLBACK_REPLY};
pub use error::{
    CompletionError, CompletionErrorKind, SheetChatError, QUOTA_EXCEEDED_MESSAGE,
    RATE_LIMITED_MESSAGE, UNEXPECTED_ERROR_MESSAGE,
};
pub use intake::{parse_first_sheet, parse_records, serialize_records, Intake, Upload};
pub use security::{IntakeLimits, MAX_UPLOAD_BYTES, XLSX_MIME_TYPE, XLS_MIME_TYPE};
pub use session::{LoadOutcome, SendOutcome, Session, SUGGESTED_QUESTIONS};
pub use types::{Document, DocumentInfo, Message, RowRecord};
pub use viewer::{TablePreview, EMPTY_STATE_TEXT, PREVIEW_ROW_LIMIT};
