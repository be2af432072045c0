//! sheetchat command-line front end
//!
//! Interactive loop: load an Excel file, preview its first sheet and ask
//! questions about it.

use std::io::{self, Write};
use std::process;

use sheetchat::{
    Config, LoadOutcome, PreviewFormat, SendOutcome, Session, SessionBuilder, SheetChatError,
    SUGGESTED_QUESTIONS,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 2 || args.iter().skip(1).any(|a| a == "-h" || a == "--help") {
        print_usage(program_name(&args));
        process::exit(if args.len() > 2 { 1 } else { 0 });
    }

    init_tracing();

    let mut session = match build_session() {
        Ok(session) => session,
        Err(e) => {
            handle_error(e);
            process::exit(1);
        }
    };

    let mut repl = Repl::new();
    if let Some(path) = args.get(1) {
        repl.load(&mut session, path);
    } else {
        println!("Load an Excel file with :load <path>. Type :help for commands.");
    }

    if let Err(e) = repl.run(&mut session).await {
        handle_error(e.into());
        process::exit(1);
    }
}

/// argvが空の場合は既定のプログラム名を使う
fn program_name(args: &[String]) -> &str {
    args.first().map_or("sheetchat", String::as_str)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [input.xlsx]", program);
    eprintln!("\nEnvironment:");
    eprintln!("  SHEETCHAT_API_KEY      API key (falls back to OPENAI_API_KEY)");
    eprintln!("  SHEETCHAT_BASE_URL     API base URL (default: https://api.openai.com/v1)");
    eprintln!("  SHEETCHAT_MODEL        Model identifier (default: gpt-3.5-turbo)");
    eprintln!("  SHEETCHAT_TEMPERATURE  Sampling temperature (default: 0.7)");
    eprintln!("  SHEETCHAT_MAX_TOKENS   Reply token cap (default: 1000)");
    eprintln!("  RUST_LOG               Log filter (default: warn)");
    eprintln!("\nExamples:");
    eprintln!("  {} sales.xlsx", program);
    eprintln!("  RUST_LOG=sheetchat=debug {} sales.xlsx", program);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_session() -> Result<Session, SheetChatError> {
    let config = Config::from_env()?;
    if config.api_key.is_none() {
        eprintln!("Warning: SHEETCHAT_API_KEY is not set. Questions will fail until it is configured.");
    }
    SessionBuilder::from_config(&config).build()
}

/// 入力行の解釈
enum Command<'a> {
    Load(&'a str),
    Table,
    Info,
    Tips,
    Help,
    Quit,
    Ask(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(rest) = line.strip_prefix(':') else {
            return Some(Command::Ask(line));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        Some(match name {
            "load" | "l" => Command::Load(arg),
            "table" | "t" => Command::Table,
            "info" | "i" => Command::Info,
            "tips" => Command::Tips,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            _ => Command::Ask(line),
        })
    }
}

struct Repl {
    /// 定型の質問を番号で選べる状態か
    tips_shown: bool,
}

impl Repl {
    fn new() -> Self {
        Self { tips_shown: false }
    }

    async fn run(&mut self, session: &mut Session) -> io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!();
                return Ok(());
            };

            let Some(command) = Command::parse(&line) else {
                continue;
            };

            match command {
                Command::Load("") => eprintln!("Error: :load requires a path"),
                Command::Load(path) => self.load(session, path),
                Command::Table => show_table(session),
                Command::Info => show_info(session),
                Command::Tips => self.show_tips(),
                Command::Help => show_help(),
                Command::Quit => return Ok(()),
                Command::Ask(text) => {
                    let question = self.suggested(text).unwrap_or(text);
                    self.ask(session, question).await;
                }
            }
        }
    }

    fn load(&mut self, session: &mut Session, path: &str) {
        match session.load_path(path) {
            LoadOutcome::Loaded => {
                if let Some(document) = session.document() {
                    println!("Loaded {}", document.name());
                    println!("{}", document.info());
                }
                self.show_tips();
            }
            LoadOutcome::Rejected(reason) => {
                eprintln!("{}", reason);
            }
            LoadOutcome::Failed(e) => handle_error(e),
        }
    }

    fn show_tips(&mut self) {
        println!("Try asking:");
        for (i, question) in SUGGESTED_QUESTIONS.iter().enumerate() {
            println!("  {}. {}", i + 1, question);
        }
        self.tips_shown = true;
    }

    /// 番号入力を定型の質問に置き換える
    fn suggested(&self, text: &str) -> Option<&'static str> {
        if !self.tips_shown {
            return None;
        }
        let index = text.parse::<usize>().ok()?.checked_sub(1)?;
        SUGGESTED_QUESTIONS.get(index).copied()
    }

    async fn ask(&mut self, session: &mut Session, question: &str) {
        if session.document().is_none() {
            eprintln!("Load an Excel file first with :load <path>");
            return;
        }

        println!("you> {}", question);
        match session.send(question).await {
            SendOutcome::Replied(reply) => println!("assistant> {}", reply.content),
            SendOutcome::ReportedError(kind) => println!("assistant> {}", kind.user_message()),
            SendOutcome::Ignored => {}
        }
        self.tips_shown = false;
    }
}

fn show_table(session: &Session) {
    match session.preview() {
        Ok(Some(preview)) => match preview.render_to_string(PreviewFormat::Text) {
            Ok(text) => print!("{}", text),
            Err(e) => handle_error(e),
        },
        Ok(None) => eprintln!("No file loaded"),
        Err(e) => handle_error(e),
    }
}

fn show_info(session: &Session) {
    match session.document() {
        Some(document) => println!("{}", document.info()),
        None => eprintln!("No file loaded"),
    }
}

fn show_help() {
    println!("Commands:");
    println!("  :load <path>  Load an Excel file (.xlsx, .xls)");
    println!("  :table        Show the first 100 rows");
    println!("  :info         Show file name, size and type");
    println!("  :tips         Show suggested questions (answer with 1-4)");
    println!("  :help         Show this help");
    println!("  :quit         Exit");
    println!("Anything else is sent as a question about the loaded file.");
}

fn handle_error(error: SheetChatError) {
    match error {
        SheetChatError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
            eprintln!("Please check that the file exists and you have permission to access it.");
        }
        SheetChatError::Parse(parse_err) => {
            eprintln!("Parse Error: {}", parse_err);
            eprintln!("The file may not be a valid Excel file or may be corrupted.");
        }
        SheetChatError::Json(json_err) => {
            eprintln!("JSON Error: {}", json_err);
            eprintln!("The loaded content could not be read as row records.");
        }
        SheetChatError::Rejected(reason) => {
            eprintln!("{}", reason);
        }
        SheetChatError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
            eprintln!("Please check the SHEETCHAT_* environment variables.");
        }
        SheetChatError::Completion(completion_err) => {
            eprintln!("Completion Error: {}", completion_err);
        }
    }
}
