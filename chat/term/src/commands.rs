//! REPL command parsing
//!
//! A line starting with `/` is a command; anything else is sent as a chat
//! message.

/// Help text printed by `/help`
pub const HELP_TEXT: &str = "\
Commands:
  /help            Show this help
  /clear           Clear the conversation (local and server history)
  /settings        Show the current settings
  /prompt <text>   Set the system prompt (not saved)
  /temp <value>    Set the temperature, 0.0 to 2.0 (not saved)
  /save            Save settings on the server
  /reset           Restore the loaded prompt and default temperature
  /examples        List the example queries
  /ex <n>          Send example query number <n>
  /quit, /exit     Leave
Anything else is sent as a message.";

/// A parsed REPL line
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Show help
    Help,
    /// Clear the conversation
    Clear,
    /// Reload and show settings
    Settings,
    /// Set the system prompt locally
    Prompt(String),
    /// Set the temperature locally
    Temperature(f64),
    /// Save settings
    Save,
    /// Reset settings
    Reset,
    /// List example queries
    Examples,
    /// Send an example query (zero-based index)
    Example(usize),
    /// Leave the REPL
    Quit,
    /// Send a chat message
    Chat(String),
    /// Blank line
    Empty,
    /// A command with bad arguments; carries the usage hint
    Invalid(&'static str),
    /// Unrecognized command name
    Unknown(String),
}

impl Command {
    /// Parse one input line
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Chat(trimmed.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "help" | "?" => Self::Help,
            "clear" => Self::Clear,
            "settings" => Self::Settings,
            "prompt" => Self::Prompt(arg.to_string()),
            "temp" | "temperature" => match arg.parse::<f64>() {
                Ok(value) if value.is_finite() => Self::Temperature(value),
                _ => Self::Invalid("usage: /temp <0.0-2.0>"),
            },
            "save" => Self::Save,
            "reset" => Self::Reset,
            "examples" => Self::Examples,
            "ex" => match arg.parse::<usize>() {
                Ok(n) if n >= 1 => Self::Example(n - 1),
                _ => Self::Invalid("usage: /ex <n> (see /examples)"),
            },
            "quit" | "exit" | "q" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}
