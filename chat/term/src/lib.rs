//! chat-term - Line-mode terminal surface for `chat-core`
//!
//! A thin client: every piece of chat state lives in the core, and this crate
//! only maps input lines to coordinator calls and prints what comes back.
//!
//! # Architecture
//!
//! - **App**: REPL loop, `select!` between stdin and the active exchange
//! - **Commands**: `/`-prefixed command parsing
//! - **Surface**: `SurfaceMessage` → terminal text, plus the printer task

pub mod app;
pub mod commands;
pub mod surface;

pub use app::App;
pub use commands::Command;
pub use surface::TerminalSurface;
