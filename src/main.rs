//! # Exa Scout CLI (`scout`)
//!
//! The `scout` binary runs the HTTP server and offers the same four query
//! modes directly in the terminal.
//!
//! ## Usage
//!
//! ```bash
//! scout [--config ./config/scout.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scout serve` | Start the HTTP server |
//! | `scout search "<query>"` | Web search with highlights and summaries |
//! | `scout answer "<query>"` | Direct answer with citations |
//! | `scout code "<query>"` | Programming answer |
//! | `scout contents <id>...` | Full contents for result ids |
//! | `scout research "<instructions>"` | Run a research task (Ctrl-C cancels) |
//! | `scout chat` | Interactive multi-mode session |
//! | `scout config` | Print the effective configuration |
//!
//! The Exa API key is read from `EXA_API_KEY` (or the variable named by
//! `exa.api_key_env`).

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use exa_scout::config::{self, Config, LoggingConfig};
use exa_scout::models::{
    AnswerRequest, CodeRequest, ContentsRequest, Mode, ResearchRequest, SearchRequest, SearchType,
};
use exa_scout::present;
use exa_scout::research::ResearchOutcome;
use exa_scout::server;
use exa_scout::service::Scout;
use exa_scout::session::{MessageId, Payload, Session};

/// Exa Scout — search, answers, code help, and research from the Exa API.
#[derive(Parser)]
#[command(
    name = "scout",
    about = "Exa Scout — a conversational search front end for the Exa API",
    version,
    long_about = "Exa Scout sends queries in search, answer, code, or research mode to the Exa API \
    and returns normalized results, either over a JSON HTTP API for a browser front end or \
    directly in the terminal."
)]
struct Cli {
    /// Path to a configuration file (TOML).
    ///
    /// Optional; built-in defaults target the hosted Exa API.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves `/api/search`, `/api/answer`,
    /// `/api/code`, `/api/contents`, `/api/research`, and `/health`.
    Serve,

    /// Search the web.
    Search {
        query: String,

        /// Number of results (1-100).
        #[arg(long)]
        num_results: Option<u32>,

        /// Search strategy.
        #[arg(long = "type", value_enum)]
        search_type: Option<SearchType>,

        /// Print the raw JSON response.
        #[arg(long)]
        json: bool,
    },

    /// Get a direct answer with citations.
    Answer {
        query: String,

        #[arg(long)]
        json: bool,
    },

    /// Ask a programming question.
    Code {
        query: String,

        #[arg(long)]
        json: bool,
    },

    /// Fetch full contents for one or more result ids.
    Contents {
        #[arg(required = true)]
        ids: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Run a multi-step research task.
    ///
    /// Polls until the task completes, fails, or exhausts its budget
    /// (60 polls, 10 seconds apart, by default). Ctrl-C cancels.
    Research {
        instructions: String,

        #[arg(long)]
        json: bool,
    },

    /// Start an interactive session.
    ///
    /// Each line is a query in the active mode. Commands: `/mode <mode>`,
    /// `/retry`, `/history`, `/quit`.
    Chat {
        /// Initial mode.
        #[arg(long, value_enum, default_value = "answer")]
        mode: Mode,
    },

    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match config::load_or_default(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&cfg.logging);

    match run(cli.command, cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands, cfg: Config) -> anyhow::Result<()> {
    if let Commands::Serve = command {
        return server::run_server(&cfg).await;
    }
    if let Commands::Config = command {
        return print_config(&cfg);
    }

    let scout = Scout::from_config(std::sync::Arc::new(cfg))?;

    match command {
        Commands::Search {
            query,
            num_results,
            search_type,
            json,
        } => {
            let req = SearchRequest {
                query: Some(query),
                num_results,
                search_type,
                ..SearchRequest::default()
            };
            let response = scout.search(req).await?;
            emit(json, &response, || present::render_search(&response, Utc::now()))?;
        }
        Commands::Answer { query, json } => {
            let response = scout.answer(AnswerRequest { query: Some(query) }).await?;
            emit(json, &response, || present::render_answer(&response))?;
        }
        Commands::Code { query, json } => {
            let req = CodeRequest {
                query: Some(query),
                conversation_history: Vec::new(),
            };
            let response = scout.code(req).await?;
            emit(json, &response, || present::render_answer(&response))?;
        }
        Commands::Contents { ids, json } => {
            let response = scout.contents(ContentsRequest { ids }).await?;
            emit(json, &response, || present::render_contents(&response))?;
        }
        Commands::Research { instructions, json } => {
            let cancel = cancel_on_ctrl_c();
            let req = ResearchRequest {
                instructions: Some(serde_json::Value::String(instructions)),
            };
            match scout.research(req, &cancel).await? {
                ResearchOutcome::Completed(report) => {
                    emit(json, &report, || present::render_research(&report))?;
                }
                ResearchOutcome::TimedOut { task_id, attempts } => {
                    anyhow::bail!(
                        "Research task timed out (task {} after {} polls)",
                        task_id,
                        attempts
                    );
                }
            }
        }
        Commands::Chat { mode } => {
            run_chat(scout, mode).await?;
        }
        Commands::Serve | Commands::Config => unreachable!(),
    }

    Ok(())
}

fn emit<T: Serialize>(json: bool, value: &T, render: impl FnOnce() -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", render());
    }
    Ok(())
}

fn print_config(cfg: &Config) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(cfg)?);
    println!();
    println!(
        "# credential ({}): {}",
        cfg.exa.api_key_env,
        if cfg.has_credential() { "present" } else { "missing" }
    );
    Ok(())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    cancel
}

// ============ chat ============

#[derive(Debug, PartialEq)]
enum ChatInput {
    Empty,
    Quit,
    Retry,
    History,
    Mode(Mode),
    Query(String),
    Invalid(String),
}

fn parse_chat_input(line: &str) -> ChatInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return ChatInput::Query(trimmed.to_string());
    };

    let mut parts = command.splitn(2, char::is_whitespace);
    match (parts.next().unwrap_or(""), parts.next().map(str::trim)) {
        ("quit" | "exit" | "q", _) => ChatInput::Quit,
        ("retry", _) => ChatInput::Retry,
        ("history", _) => ChatInput::History,
        ("mode", Some(arg)) => match arg.parse::<Mode>() {
            Ok(mode) => ChatInput::Mode(mode),
            Err(e) => ChatInput::Invalid(e),
        },
        ("mode", None) => {
            ChatInput::Invalid("usage: /mode <search|answer|code|research>".to_string())
        }
        (other, _) => ChatInput::Invalid(format!("unknown command: /{}", other)),
    }
}

type Settled = (MessageId, Result<Payload, String>);

/// Issues the remote call for a freshly submitted message.
fn spawn_dispatch(
    scout: &Scout,
    session: &Session,
    id: MessageId,
    tx: &mpsc::UnboundedSender<Settled>,
    cancel: &CancellationToken,
) {
    let Some(message) = session.get(id) else {
        return;
    };
    let (mode, query) = (message.mode, message.query.clone());
    let history = match mode {
        Mode::Code => session.history(Mode::Code, Some(id)),
        _ => Vec::new(),
    };

    let scout = scout.clone();
    let tx = tx.clone();
    let cancel = cancel.child_token();
    tokio::spawn(async move {
        let outcome = scout
            .dispatch(mode, query, history, &cancel)
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send((id, outcome));
    });
}

async fn run_chat(scout: Scout, mut mode: Mode) -> anyhow::Result<()> {
    let mut session = Session::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<Settled>();
    let cancel = CancellationToken::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Mode: {}. Type a query, or /mode, /retry, /history, /quit.", mode);

    let mut quit = false;
    while !quit {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_chat_input(&line) {
                    ChatInput::Empty => {}
                    ChatInput::Quit => quit = true,
                    ChatInput::Mode(next) => {
                        mode = next;
                        println!("Mode: {}", mode);
                    }
                    ChatInput::Retry => {
                        match session.last_errored().and_then(|id| session.retry(id)) {
                            Some(id) => spawn_dispatch(&scout, &session, id, &tx, &cancel),
                            None => println!("Nothing to retry."),
                        }
                    }
                    ChatInput::History => {
                        for message in session.messages() {
                            print!("{}", present::render_message(message, Utc::now()));
                        }
                    }
                    ChatInput::Query(query) => {
                        if let Some(id) = session.submit(mode, query) {
                            spawn_dispatch(&scout, &session, id, &tx, &cancel);
                        }
                    }
                    ChatInput::Invalid(msg) => println!("{}", msg),
                }
            }
            Some((id, outcome)) = rx.recv() => {
                if session.settle(id, outcome) {
                    if let Some(message) = session.get(id) {
                        print!("{}", present::render_message(message, Utc::now()));
                    }
                }
            }
        }
    }

    if quit {
        cancel.cancel();
        return Ok(());
    }

    // Input closed: let in-flight messages finish.
    while session.pending_count() > 0 {
        let Some((id, outcome)) = rx.recv().await else {
            break;
        };
        if session.settle(id, outcome) {
            if let Some(message) = session.get(id) {
                print!("{}", present::render_message(message, Utc::now()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_input() {
        assert_eq!(parse_chat_input("   "), ChatInput::Empty);
        assert_eq!(parse_chat_input("/quit"), ChatInput::Quit);
        assert_eq!(parse_chat_input("/retry"), ChatInput::Retry);
        assert_eq!(parse_chat_input("/mode code"), ChatInput::Mode(Mode::Code));
        assert!(matches!(parse_chat_input("/mode"), ChatInput::Invalid(_)));
        assert!(matches!(parse_chat_input("/mode web"), ChatInput::Invalid(_)));
        assert!(matches!(parse_chat_input("/frobnicate"), ChatInput::Invalid(_)));
        assert_eq!(
            parse_chat_input("  what is rust?  "),
            ChatInput::Query("what is rust?".into())
        );
    }
}
