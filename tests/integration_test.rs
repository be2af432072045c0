//! Integration Tests for sheetchat
//!
//! End-to-end tests: workbooks are generated in memory with rust_xlsxwriter,
//! loaded through the public API and queried through a scripted backend.

use async_trait::async_trait;
use rust_xlsxwriter::*;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use sheetchat::{
    parse_first_sheet, CompletionBackend, CompletionError, CompletionRequest, LoadOutcome,
    Message, OpenAiClient, PreviewFormat, Role, SendOutcome, Session, SessionBuilder, Upload,
    QUOTA_EXCEEDED_MESSAGE, RATE_LIMITED_MESSAGE, UNEXPECTED_ERROR_MESSAGE, XLSX_MIME_TYPE,
};

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    /// Generate a 3-column table with 2 data rows
    pub fn generate_people() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        // Header row
        worksheet.write_string(0, 0, "Name")?;
        worksheet.write_string(0, 1, "Age")?;
        worksheet.write_string(0, 2, "City")?;

        // Data rows
        worksheet.write_string(1, 0, "Alice")?;
        worksheet.write_number(1, 1, 30.0)?;
        worksheet.write_string(1, 2, "Tokyo")?;

        worksheet.write_string(2, 0, "Bob")?;
        worksheet.write_number(2, 1, 25.5)?;
        worksheet.write_string(2, 2, "Osaka")?;

        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a workbook with 3 sheets
    pub fn generate_multi_sheets() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();

        for name in ["First", "Second", "Third"] {
            let sheet = workbook.add_worksheet();
            sheet.set_name(name)?;
            sheet.write_string(0, 0, "Sheet")?;
            sheet.write_string(1, 0, name)?;
        }

        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a table with blank and duplicate headers
    pub fn generate_irregular_headers() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        // B1 is left blank
        worksheet.write_string(0, 0, "Name")?;
        worksheet.write_string(0, 2, "Name")?;
        worksheet.write_string(0, 3, "Name")?;

        worksheet.write_string(1, 0, "a")?;
        worksheet.write_string(1, 1, "b")?;
        worksheet.write_string(1, 2, "c")?;
        worksheet.write_string(1, 3, "d")?;

        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a table with typed cells, a sparse row and a blank row
    pub fn generate_typed_cells() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        worksheet.write_string(0, 0, "Item")?;
        worksheet.write_string(0, 1, "Price")?;
        worksheet.write_string(0, 2, "InStock")?;
        worksheet.write_string(0, 3, "Added")?;

        worksheet.write_string(1, 0, "Pen")?;
        worksheet.write_number(1, 1, 1.25)?;
        worksheet.write_boolean(1, 2, true)?;
        let date = ExcelDateTime::from_ymd(2024, 1, 15)?;
        worksheet.write_datetime_with_format(1, 3, &date, &date_format)?;

        // Row 3 is left blank

        // Sparse row: only the first and third columns
        worksheet.write_string(3, 0, "Ink")?;
        worksheet.write_boolean(3, 2, false)?;

        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a workbook saved with the 1904 date system
    ///
    /// rust_xlsxwriter always writes the 1900 date system, so the
    /// `workbookPr` element is patched after the archive is written.
    pub fn generate_1904_dates() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        use std::io::{Cursor, Read, Write};
        use zip::write::SimpleFileOptions;
        use zip::{ZipArchive, ZipWriter};

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        worksheet.write_string(0, 0, "Item")?;
        worksheet.write_string(0, 1, "Added")?;
        worksheet.write_string(1, 0, "Pen")?;
        worksheet.write_number_with_format(1, 1, 43845.0, &date_format)?;
        let bytes = workbook.save_to_buffer()?;

        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;

            if file.name() == "xl/workbook.xml" {
                let xml = String::from_utf8(contents)?;
                contents = xml
                    .replacen("<workbookPr ", "<workbookPr date1904=\"1\" ", 1)
                    .into_bytes();
            }

            let options = SimpleFileOptions::default().compression_method(file.compression());
            writer.start_file(file.name(), options)?;
            writer.write_all(&contents)?;
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Records every request and answers with a fixed reply
#[derive(Clone, Default)]
struct ScriptedBackend {
    reply: Option<String>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedBackend {
    fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            requests: Arc::default(),
        }
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<Option<String>, CompletionError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.reply.clone())
    }
}

fn session_with(backend: ScriptedBackend) -> Session {
    SessionBuilder::new().with_backend(backend).build().unwrap()
}

fn xlsx_upload(name: &str, bytes: Vec<u8>) -> Upload {
    Upload::new(name, XLSX_MIME_TYPE, bytes)
}

fn as_values(records: Vec<sheetchat::RowRecord>) -> Vec<Value> {
    records.into_iter().map(Value::Object).collect()
}

#[tokio::test]
async fn test_two_row_sheet_question_and_preview() {
    let backend = ScriptedBackend::replying("There are 2 records.");
    let mut session = session_with(backend.clone());

    let bytes = fixtures::generate_people().unwrap();
    let outcome = session.load(xlsx_upload("people.xlsx", bytes));
    assert!(outcome.is_loaded(), "unexpected outcome: {:?}", outcome);

    // Preview: 3 headers, 2 rows
    let preview = session.preview().unwrap().unwrap();
    assert_eq!(preview.headers(), ["Name", "Age", "City"]);
    assert_eq!(preview.rows().len(), 2);
    assert_eq!(preview.rows()[1], ["Bob", "25.5", "Osaka"]);
    assert!(!preview.is_truncated());

    // Conversation: one user and one assistant message
    let outcome = session.send("What is the total number of records?").await;
    assert_eq!(
        outcome,
        SendOutcome::Replied(Message::assistant("There are 2 records."))
    );

    let visible: Vec<&Message> = session.conversation().visible_messages().collect();
    assert_eq!(visible.len(), 2);
    assert_eq!(visible[0].role, Role::User);
    assert_eq!(visible[0].content, "What is the total number of records?");
    assert_eq!(visible[1].role, Role::Assistant);

    // The request carried the system preamble with the serialized rows
    let requests = backend.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let system = &requests[0].messages[0];
    assert_eq!(system.role, Role::System);
    assert!(system
        .content
        .starts_with("You are an AI assistant analyzing an Excel document."));
    assert!(system.content.contains("\"Name\": \"Alice\""));
    assert_eq!(requests[0].model, "gpt-3.5-turbo");
    assert_eq!(requests[0].max_tokens, 1000);
}

#[test]
fn test_document_content_is_pretty_json() {
    let mut session = session_with(ScriptedBackend::default());
    let bytes = fixtures::generate_people().unwrap();
    assert!(session.load(xlsx_upload("people.xlsx", bytes)).is_loaded());

    let document = session.document().unwrap();
    assert_eq!(document.name(), "people.xlsx");
    assert_eq!(document.mime_type(), XLSX_MIME_TYPE);

    let parsed: Value = serde_json::from_str(document.content()).unwrap();
    assert_eq!(
        parsed,
        json!([
            {"Name": "Alice", "Age": 30, "City": "Tokyo"},
            {"Name": "Bob", "Age": 25.5, "City": "Osaka"}
        ])
    );
    assert!(document.content().contains("\n  {\n    \"Name\""));
}

#[test]
fn test_only_first_sheet_is_read() {
    let bytes = fixtures::generate_multi_sheets().unwrap();
    let records = parse_first_sheet(bytes).unwrap();

    assert_eq!(as_values(records), vec![json!({"Sheet": "First"})]);
}

#[test]
fn test_irregular_headers() {
    let bytes = fixtures::generate_irregular_headers().unwrap();
    let records = parse_first_sheet(bytes).unwrap();

    assert_eq!(records.len(), 1);
    let keys: Vec<&String> = records[0].keys().collect();
    assert_eq!(keys, ["Name", "__EMPTY", "Name_1", "Name_2"]);
    assert_eq!(records[0]["Name_2"], json!("d"));
}

#[test]
fn test_typed_cells_and_blank_rows() {
    let bytes = fixtures::generate_typed_cells().unwrap();
    let records = parse_first_sheet(bytes).unwrap();

    assert_eq!(
        as_values(records),
        vec![
            json!({"Item": "Pen", "Price": 1.25, "InStock": true, "Added": "2024-01-15"}),
            json!({"Item": "Ink", "InStock": false}),
        ]
    );
}

#[test]
fn test_1904_date_system() {
    let bytes = fixtures::generate_1904_dates().unwrap();
    let records = parse_first_sheet(bytes).unwrap();

    assert_eq!(
        as_values(records),
        vec![json!({"Item": "Pen", "Added": "2024-01-16"})]
    );
}

#[tokio::test]
async fn test_1904_dates_reach_system_prompt() {
    let backend = ScriptedBackend::replying("ok");
    let mut session = session_with(backend.clone());
    let bytes = fixtures::generate_1904_dates().unwrap();
    assert!(session.load(xlsx_upload("mac.xlsx", bytes)).is_loaded());

    session.send("When was the pen added?").await;

    let requests = backend.requests.lock().unwrap();
    let system = &requests[0].messages[0];
    assert_eq!(system.role, Role::System);
    assert!(system.content.contains("\"Added\": \"2024-01-16\""));
    assert!(!system.content.contains("2020-01-15"));
}

#[test]
fn test_preview_renders_missing_values_as_empty() {
    let mut session = session_with(ScriptedBackend::default());
    let bytes = fixtures::generate_typed_cells().unwrap();
    assert!(session.load(xlsx_upload("items.xlsx", bytes)).is_loaded());

    let preview = session.preview().unwrap().unwrap();
    assert_eq!(preview.headers(), ["Item", "Price", "InStock", "Added"]);
    assert_eq!(preview.rows()[1], ["Ink", "", "false", ""]);

    let markdown = preview.render_to_string(PreviewFormat::Markdown).unwrap();
    assert!(markdown.starts_with("| Item | Price | InStock | Added      |"));
}

#[tokio::test]
async fn test_loading_new_file_replaces_conversation() {
    let backend = ScriptedBackend::replying("ok");
    let mut session = session_with(backend.clone());

    let people = fixtures::generate_people().unwrap();
    assert!(session.load(xlsx_upload("people.xlsx", people)).is_loaded());
    session.send("first question").await;
    assert_eq!(session.conversation().messages().len(), 3);

    let items = fixtures::generate_typed_cells().unwrap();
    assert!(session.load(xlsx_upload("items.xlsx", items)).is_loaded());

    assert_eq!(session.document().unwrap().name(), "items.xlsx");
    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains("\"Item\": \"Pen\""));

    session.send("second question").await;
    let requests = backend.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].messages.len(), 2);
}

#[tokio::test]
async fn test_send_without_document_is_noop() {
    let backend = ScriptedBackend::replying("unused");
    let mut session = session_with(backend.clone());

    assert_eq!(session.send("Hello?").await, SendOutcome::Ignored);
    assert!(session.conversation().messages().is_empty());
    assert!(session.document().is_none());
    assert!(backend.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_reply_uses_fallback() {
    let mut session = session_with(ScriptedBackend::default());
    let bytes = fixtures::generate_people().unwrap();
    assert!(session.load(xlsx_upload("people.xlsx", bytes)).is_loaded());

    let outcome = session.send("Anything?").await;
    assert_eq!(
        outcome,
        SendOutcome::Replied(Message::assistant(sheetchat::FALLBACK_REPLY))
    );
}

#[test]
fn test_load_garbage_with_xlsx_extension_fails() {
    let mut session = session_with(ScriptedBackend::default());
    let outcome = session.load(xlsx_upload("fake.xlsx", b"PK not really".to_vec()));
    assert!(matches!(outcome, LoadOutcome::Failed(_)));
    assert!(session.document().is_none());
}

mod completion_errors {
    use super::*;
    use mockito::Server;

    async fn ask_with_response(status: usize, body: &str) -> String {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;

        let mut session = SessionBuilder::new()
            .with_backend(OpenAiClient::new("test-key").with_base_url(server.url()))
            .build()
            .unwrap();
        let bytes = fixtures::generate_people().unwrap();
        assert!(session.load(xlsx_upload("people.xlsx", bytes)).is_loaded());

        session.send("What are the column names?").await;
        mock.assert_async().await;

        let last = session.conversation().messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(!session.is_busy());
        last.content.clone()
    }

    #[tokio::test]
    async fn test_reply_through_http_backend() {
        let content = ask_with_response(
            200,
            r#"{"choices": [{"message": {"role": "assistant", "content": "Name, Age, City"}}]}"#,
        )
        .await;
        assert_eq!(content, "Name, Age, City");
    }

    #[tokio::test]
    async fn test_quota_error_message() {
        let content = ask_with_response(
            429,
            r#"{"error": {"message": "You exceeded your current quota", "type": "insufficient_quota", "code": "insufficient_quota"}}"#,
        )
        .await;
        assert_eq!(content, QUOTA_EXCEEDED_MESSAGE);
        assert!(content.contains("quota"));
    }

    #[tokio::test]
    async fn test_rate_limit_message() {
        let content = ask_with_response(
            429,
            r#"{"error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}}"#,
        )
        .await;
        assert_eq!(content, RATE_LIMITED_MESSAGE);
        assert!(content.contains("Too many requests"));
    }

    #[tokio::test]
    async fn test_other_error_message() {
        let content = ask_with_response(
            401,
            r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error", "code": "invalid_api_key"}}"#,
        )
        .await;
        assert_eq!(content, UNEXPECTED_ERROR_MESSAGE);
    }
}
