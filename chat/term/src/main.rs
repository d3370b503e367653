//! chat-term - Line-Mode Terminal Client for the Streaming Chat Server
//!
//! Type a message and the reply appears once it has finished streaming, with
//! a live "thinking" timer while the server works. Lines starting with `/`
//! are commands (`/help` lists them).
//!
//! # Usage
//!
//! ```bash
//! # Connect to the default server (http://127.0.0.1:8000)
//! chat-term
//!
//! # Another server
//! chat-term --server-url https://chat.example.com
//!
//! # Raw HTML output instead of terminal text
//! chat-term --format html
//!
//! # With config file
//! chat-term --config ~/chat.toml
//!
//! # Piped input: each line is sent, replies are printed, then it exits
//! printf 'Hello\n' | chat-term
//!
//! # Verbose logging (stderr)
//! RUST_LOG=chat_core=trace chat-term
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use chat_core::config::{default_config_path, load_config_from_path};
use chat_core::{ClientConfig, ConfigOverrides, RenderFormat};

/// chat-term - Terminal client for the streaming chat server
#[derive(Parser, Debug)]
#[command(name = "chat-term")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Chat server base URL (overrides CHAT_SERVER_URL and the config file)
    #[arg(short = 's', long, value_name = "URL")]
    server_url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "CHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the session identity
    #[arg(long, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    /// Output format for assistant replies
    #[arg(short = 'f', long, value_enum)]
    format: Option<FormatArg>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "CHAT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Shorthand for --log-level debug
    #[arg(short = 'v', long)]
    verbose: bool,
}

/// Reply formats selectable on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Sanitized HTML
    Html,
    /// Markdown source with control sequences removed
    Terminal,
}

impl From<FormatArg> for RenderFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => Self::Html,
            FormatArg::Terminal => Self::Terminal,
        }
    }
}

/// Initialize logging to stderr so it never interleaves with replies on stdout
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("chat_term={level},chat_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Merge file, environment and command-line settings
fn resolve_config(args: &Args) -> Result<ClientConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(url) = &args.server_url {
        overrides = overrides.with_server_url(url.clone());
    }
    if let Some(dir) = &args.state_dir {
        overrides = overrides.with_state_dir(dir.clone());
    }
    if let Some(format) = args.format {
        overrides = overrides.with_render_format(format.into());
    }
    overrides.apply(&mut config);

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { args.log_level.as_str() };
    init_logging(level);

    let config = resolve_config(&args)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        server_url = %config.server_url,
        source = %config.source(),
        format = ?config.render_format,
        "chat-term starting"
    );
    if let Some(path) = &config.config_file_path {
        info!(config_path = ?path, "Config file");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(chat_term::app::run(config))
}
