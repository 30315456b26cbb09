//! rtrace - terminal client for streaming ReAct agents

mod commands;
mod config;
mod render;

use clap::Parser;
use rtrace_session::{ByteSource, ConversationStore, FileSource, StoreEvent, Turn};
use rtrace_wire::HttpSource;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// rtrace - chat with a ReAct agent and watch it think
#[derive(Parser, Debug)]
#[command(name = "rtrace")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Agent streaming endpoint (default: http://localhost:8000/api/chat/stream)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Run in non-interactive mode with a single message
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Print the committed turn as JSON (with --command)
    #[arg(long)]
    json: bool,

    /// Check that the backend is up and exit
    #[arg(long)]
    check: bool,

    /// Replay a recorded NDJSON event stream instead of calling the backend
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load config file
    let cfg = config::Config::load();

    init_tracing(args.verbose, cfg.log_filter.as_deref());

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Merge config with CLI args (CLI takes precedence)
    let endpoint = args
        .endpoint
        .or(cfg.endpoint.clone())
        .unwrap_or_else(|| rtrace_wire::DEFAULT_ENDPOINT.to_string());
    let timeout = cfg.connect_timeout();

    if args.check {
        return check(&endpoint, timeout).await;
    }

    let source: Arc<dyn ByteSource> = match args.replay {
        Some(path) => Arc::new(FileSource::new(path)),
        None => match HttpSource::with_connect_timeout(&endpoint, timeout) {
            Ok(source) => Arc::new(source),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    };
    let store = ConversationStore::new(source);

    // Non-interactive mode
    if let Some(command) = args.command {
        let succeeded = run_command(&store, &command, args.json).await?;
        if !succeeded {
            std::process::exit(1);
        }
        return Ok(());
    }

    let show_trace = cfg.show_trace.unwrap_or(true);
    run_interactive(&store, show_trace).await
}

/// Log to stderr. `--verbose` wins over RUST_LOG, which wins over the config.
fn init_tracing(verbose: bool, config_filter: Option<&str>) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("rtrace=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config_filter.unwrap_or("warn")))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn check(endpoint: &str, timeout: Duration) -> anyhow::Result<()> {
    let source = HttpSource::with_connect_timeout(endpoint, timeout)?;
    match source.health().await {
        Ok(health) if health.is_ok() => {
            println!(
                "{}: {}",
                source.endpoint(),
                health.message.as_deref().unwrap_or(&health.status)
            );
            Ok(())
        }
        Ok(health) => {
            eprintln!("{}: backend reported status {:?}", source.endpoint(), health.status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{}: {}", source.endpoint(), e);
            std::process::exit(1);
        }
    }
}

async fn run_command(store: &ConversationStore, command: &str, json: bool) -> anyhow::Result<bool> {
    let mut events = store.subscribe();
    let mut printer = render::TracePrinter::default();

    if !json {
        println!("rtrace> {}", command);
        println!();
    }

    let turn = drive_turn(store, &mut events, command, &mut printer, !json).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&turn)?);
    } else {
        println!("\n{}", turn.final_text);
    }
    Ok(turn.succeeded)
}

async fn run_interactive(store: &ConversationStore, show_trace: bool) -> anyhow::Result<()> {
    use std::io::Write;
    use tokio::io::{AsyncBufReadExt, BufReader};

    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("rtrace (/help for commands)");
        eprintln!();
    }

    let mut events = store.subscribe();
    let mut printer = render::TracePrinter::default();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = stdin.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(input) = line else {
            // EOF
            break;
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if let Some(command) = commands::parse(input) {
            match command {
                commands::Command::History => {
                    println!("{}", render::format_history(&store.history(), show_trace));
                }
                commands::Command::Toggle(index) => match store.toggle_visibility(index) {
                    Ok(_) => {
                        if let Some(turn) = store.turn(index) {
                            println!("{}", render::format_turn(index, &turn, show_trace));
                        }
                    }
                    Err(e) => println!("{}", e),
                },
                commands::Command::Help => println!("{}", commands::help_message()),
                commands::Command::Quit => break,
                commands::Command::Usage(usage) => println!("Usage: {}", usage),
                commands::Command::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            continue;
        }

        printer.reset();
        let turn = drive_turn(store, &mut events, input, &mut printer, show_trace).await?;
        println!("{}", turn.final_text);
        println!();
    }

    Ok(())
}

/// Run one turn to commit, printing the live trace as it grows.
///
/// Ctrl+C aborts the turn; the cancelled turn is still committed and returned.
async fn drive_turn(
    store: &ConversationStore,
    events: &mut broadcast::Receiver<StoreEvent>,
    message: &str,
    printer: &mut render::TracePrinter,
    live: bool,
) -> anyhow::Result<Turn> {
    let mut task = tokio::spawn(store.send_turn(message.to_string()));
    let mut interrupted = false;
    let mut listening = true;

    let index = loop {
        tokio::select! {
            biased;
            event = events.recv(), if listening => match event {
                Ok(event) => show_event(event, printer, live),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Display fell behind, {} store events skipped", skipped);
                }
                Err(RecvError::Closed) => listening = false,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                eprintln!("[Cancelling...]");
                store.abort();
            }
            joined = &mut task => break joined??,
        }
    };

    // Events sent before the commit may still be queued
    loop {
        match events.try_recv() {
            Ok(event) => show_event(event, printer, live),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }

    store
        .turn(index)
        .ok_or_else(|| anyhow::anyhow!("turn {} missing from history", index))
}

fn show_event(event: StoreEvent, printer: &mut render::TracePrinter, live: bool) {
    match event {
        StoreEvent::TraceUpdated { trace } if live => {
            for entry in printer.fresh(&trace) {
                println!("{}", render::format_entry(entry));
            }
        }
        StoreEvent::LineRejected { reason, .. } => {
            eprintln!("[Skipped line: {}]", reason);
        }
        _ => {}
    }
}
