//! Slash commands for interactive mode

/// A parsed slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print committed turns
    History,
    /// Collapse or expand the trace of turn N
    Toggle(usize),
    Help,
    /// Exit the application
    Quit,
    /// Known command with bad arguments; carries the usage hint
    Usage(&'static str),
    /// Unknown command
    Unknown(String),
}

/// Parse a slash command. Returns `None` for input that should be sent as a turn.
pub fn parse(input: &str) -> Option<Command> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next().unwrap_or("").to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    Some(match command.as_str() {
        "history" | "hist" => Command::History,
        "toggle" | "t" => match args.parse() {
            Ok(index) => Command::Toggle(index),
            Err(_) => Command::Usage("/toggle <turn number>"),
        },
        "help" | "h" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(command),
    })
}

pub fn help_message() -> &'static str {
    r#"Available commands:
  /history             Show the conversation so far
  /toggle, /t <N>      Collapse or expand the trace of turn N
  /help, /h, /?        Show this help message
  /quit, /exit, /q     Exit rtrace

Anything else is sent to the agent. Ctrl+C cancels a running turn."#
}
