//! recruit-chat: 采用聊天的终端前端
//!
//! Usage:
//!   recruit-chat [--backend <url>] [--state <path>] [--no-delay]
//!
//! Inside the chat:
//!   /history   Reprint the whole conversation
//!   /help      Show commands
//!   /quit      Leave

use anyhow::{bail, Context, Result};
use recruit_chat::diagnostics::TracingDiagnosticSink;
use recruit_chat::{
    ChatConfig, InputComposer, Key, KeyOutcome, Message, MessageRole, SendOutcome,
    SessionBuilder, SessionState,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "メッセージを入力...> ";

#[derive(Debug, Default)]
struct Options {
    backend: Option<String>,
    state: Option<PathBuf>,
    no_delay: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(opts) = parse_args(&args)? else {
        print_usage();
        return Ok(());
    };

    let mut config = ChatConfig::from_env().context("loading configuration")?;
    if let Some(path) = opts.state {
        config.state_path = Some(path);
    }
    if opts.no_delay {
        config.greeting_delay = Duration::ZERO;
    }

    let mut builder = SessionBuilder::new()
        .config(config)
        .diagnostics(Arc::new(TracingDiagnosticSink));
    if let Some(url) = opts.backend {
        builder = builder.base_url_override(url);
    }
    let session = Arc::new(builder.build().await.context("starting chat session")?);
    let mut updates = session.subscribe();

    let mut printed = 0;
    render(&session.state(), &mut printed);
    session.initialize().await;
    drain(&mut updates, &mut printed);

    let mut composer = InputComposer::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/help" => print_commands(),
            "/history" => print_all(&session.history()),
            _ => {
                composer.set_draft(line.as_str());
                if let KeyOutcome::Submit(text) = composer.on_key_down(Key::Enter) {
                    let session = Arc::clone(&session);
                    let pending = tokio::spawn(async move { session.send(&text).await });
                    follow(&mut updates, &mut printed, pending).await?;
                }
            }
        }
        prompt()?;
    }
    Ok(())
}

fn parse_args(args: &[String]) -> Result<Option<Options>> {
    let mut opts = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--backend" => {
                opts.backend = Some(iter.next().context("--backend needs a url")?.clone());
            }
            "--state" => {
                opts.state = Some(PathBuf::from(iter.next().context("--state needs a path")?));
            }
            "--no-delay" => opts.no_delay = true,
            "help" | "--help" | "-h" => return Ok(None),
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(Some(opts))
}

fn print_usage() {
    println!(
        r#"recruit-chat: 採用チャットボット (terminal)

USAGE:
    recruit-chat [OPTIONS]

OPTIONS:
    --backend <url>     Backend base URL (overrides RECRUIT_CHAT_BACKEND_URL)
    --state <path>      Identity storage file (overrides RECRUIT_CHAT_STATE_PATH)
    --no-delay          Skip the greeting delay
    -h, --help          Show this help message

ENVIRONMENT:
    RECRUIT_CHAT_BACKEND_URL        Backend base URL [default: http://127.0.0.1:8000]
    RECRUIT_CHAT_TIMEOUT_SECS       Request timeout [default: 30]
    RECRUIT_CHAT_GREETING_DELAY_MS  Greeting delay [default: 2000]
    RECRUIT_CHAT_STATE_PATH         Identity storage file
    RUST_LOG                        Log filter (logs go to stderr)"#
    );
}

fn print_commands() {
    println!("/history  reprint the conversation");
    println!("/quit     leave");
}

fn prompt() -> Result<()> {
    print!("{PROMPT}");
    std::io::stdout().flush()?;
    Ok(())
}

/// Render snapshots as they arrive until the send settles.
async fn follow(
    updates: &mut broadcast::Receiver<SessionState>,
    printed: &mut usize,
    mut pending: JoinHandle<SendOutcome>,
) -> Result<()> {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(state) => render(&state, printed),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            done = &mut pending => {
                done.context("send task failed")?;
                break;
            }
        }
    }
    drain(updates, printed);
    Ok(())
}

fn drain(updates: &mut broadcast::Receiver<SessionState>, printed: &mut usize) {
    loop {
        match updates.try_recv() {
            Ok(state) => render(&state, printed),
            Err(TryRecvError::Lagged(_)) => {}
            Err(_) => break,
        }
    }
}

/// Print bot entries past `printed`, then the loading row if the snapshot
/// shows one. User entries were typed at the prompt and are not echoed.
fn render(state: &SessionState, printed: &mut usize) {
    for message in state.history.iter().skip(*printed) {
        if message.role == MessageRole::Bot {
            print_message(message);
        }
    }
    *printed = (*printed).max(state.history.len());
    if let Some(row) = state.display_messages().last().filter(|m| m.is_loading) {
        println!("{}> ...", row.role);
    }
}

fn print_all(history: &[Message]) {
    for message in history {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    let mut lines = message.content.lines();
    let first = lines.next().unwrap_or_default();
    println!("{}> {}", message.role, first);
    for line in lines {
        println!("     {line}");
    }
}
