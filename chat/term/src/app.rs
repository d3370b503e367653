//! REPL Application
//!
//! Reads lines from stdin, dispatches commands, and drives the active
//! exchange. All chat state lives in [`ChatCoordinator`]; this loop only
//! decides which coordinator call a line maps to.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;

use chat_core::{
    ChatCoordinator, ChatTransport, ClientConfig, CoordinatorConfig, FileStore, HttpTransport,
    NotifyLevel, RendererBridge, SendOutcome, SessionIdentity, SettingsPanel, SurfaceMessage,
};

use crate::commands::{Command, HELP_TEXT};
use crate::surface;

/// Surface channel capacity
const SURFACE_CHANNEL_CAPACITY: usize = 256;

/// Whether the loop keeps reading after a line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line
    Continue,
    /// Leave the REPL
    Quit,
}

/// The REPL state
pub struct App<T: ChatTransport> {
    coordinator: ChatCoordinator<T>,
    settings: SettingsPanel<T>,
    tx: mpsc::Sender<SurfaceMessage>,
}

impl<T: ChatTransport + 'static> App<T> {
    /// Wire the coordinator and settings panel to one transport and surface
    pub fn new(
        transport: Arc<T>,
        identity: SessionIdentity,
        renderer: RendererBridge,
        tx: mpsc::Sender<SurfaceMessage>,
        config: CoordinatorConfig,
    ) -> Self {
        let coordinator = ChatCoordinator::new(
            Arc::clone(&transport),
            identity.clone(),
            renderer,
            tx.clone(),
            config,
        );
        let settings = SettingsPanel::new(transport, identity, tx.clone());
        Self {
            coordinator,
            settings,
            tx,
        }
    }

    /// The chat coordinator
    pub fn coordinator(&self) -> &ChatCoordinator<T> {
        &self.coordinator
    }

    /// The settings panel
    pub fn settings(&self) -> &SettingsPanel<T> {
        &self.settings
    }

    /// Load the welcome panel and the stored settings
    ///
    /// Both are optional; the REPL works against an unreachable server and
    /// reports failures when a message is sent.
    pub async fn start(&mut self) {
        if self.coordinator.load_ui_config().await.is_err() {
            self.notify(
                NotifyLevel::Warning,
                "Could not reach the chat server; showing defaults",
            )
            .await;
        }
        // Failure already logged by the panel
        let _ = self.settings.load().await;
        self.notify(NotifyLevel::Info, "Type /help for commands.").await;
    }

    /// Run until `/quit` or end of input
    ///
    /// At end of input an in-flight exchange is finished first, so piped
    /// input still gets its reply.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input fails.
    pub async fn run<R>(&mut self, mut lines: Lines<R>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read input")? else {
                        tracing::debug!("End of input");
                        break;
                    };
                    if self.handle_line(&line).await == Flow::Quit {
                        return Ok(());
                    }
                }
                outcome = self.coordinator.next_outcome(), if self.coordinator.is_in_flight() => {
                    if let Some(outcome) = outcome {
                        self.coordinator.complete(outcome).await;
                    }
                }
            }
        }

        self.coordinator.drive().await;
        Ok(())
    }

    /// Dispatch one input line
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        match Command::parse(line) {
            Command::Empty => {}
            Command::Chat(text) => {
                self.coordinator.set_input(text).await;
                let outcome = self.coordinator.submit().await;
                self.report(outcome).await;
            }
            Command::Help => self.notify(NotifyLevel::Info, HELP_TEXT).await,
            Command::Clear => self.coordinator.clear_conversation().await,
            Command::Settings => {
                if self.settings.load().await.is_err() {
                    self.notify(NotifyLevel::Warning, "Could not load settings")
                        .await;
                }
            }
            Command::Prompt(prompt) => {
                self.settings.set_system_prompt(prompt);
                self.notify(
                    NotifyLevel::Info,
                    "System prompt updated (use /save to keep it)",
                )
                .await;
            }
            Command::Temperature(value) => {
                self.settings.set_temperature(value);
                let message = format!(
                    "Temperature set to {} (use /save to keep it)",
                    self.settings.temperature_label()
                );
                self.notify(NotifyLevel::Info, &message).await;
            }
            Command::Save => {
                self.settings.save().await;
            }
            Command::Reset => self.settings.reset().await,
            Command::Examples => {
                let message = list_examples(self.coordinator.examples());
                self.notify(NotifyLevel::Info, &message).await;
            }
            Command::Example(index) => {
                let outcome = self.coordinator.choose_example(index).await;
                if outcome == SendOutcome::Rejected && !self.coordinator.is_in_flight() {
                    self.notify(NotifyLevel::Warning, "No such example (see /examples)")
                        .await;
                } else {
                    self.report(outcome).await;
                }
            }
            Command::Quit => return Flow::Quit,
            Command::Invalid(usage) => self.notify(NotifyLevel::Warning, usage).await,
            Command::Unknown(name) => {
                let message = format!("Unknown command /{name} (try /help)");
                self.notify(NotifyLevel::Warning, &message).await;
            }
        }
        Flow::Continue
    }

    async fn report(&self, outcome: SendOutcome) {
        match outcome {
            SendOutcome::Started => {}
            SendOutcome::Failed { reason } => {
                tracing::debug!(%reason, "Send failed");
            }
            SendOutcome::Rejected => {
                if self.coordinator.is_in_flight() {
                    self.notify(
                        NotifyLevel::Warning,
                        "Still waiting for the previous reply",
                    )
                    .await;
                }
            }
        }
    }

    async fn notify(&self, level: NotifyLevel, message: &str) {
        let msg = SurfaceMessage::Notify {
            level,
            message: message.to_string(),
        };
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}

/// Numbered list of the offered example queries
fn list_examples(examples: &[String]) -> String {
    if examples.is_empty() {
        return "No example queries available".to_string();
    }
    examples
        .iter()
        .enumerate()
        .map(|(i, example)| format!("  [{}] {example}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build everything from the resolved config and run the REPL on stdin
///
/// # Errors
///
/// Returns an error if the state directory or identity cannot be loaded, the
/// HTTP client cannot be built, or stdout/stdin fail.
pub async fn run(config: ClientConfig) -> Result<()> {
    let mut store = FileStore::open(&config.state_dir)
        .await
        .with_context(|| format!("Failed to open state dir {}", config.state_dir.display()))?;
    let identity = SessionIdentity::load_or_create(&mut store)
        .await
        .context("Failed to load session identity")?;
    tracing::debug!(identity = identity.as_str(), "Session identity ready");

    let transport = Arc::new(
        HttpTransport::new(config.server_url.clone(), config.connect_timeout())
            .context("Failed to create HTTP transport")?,
    );

    let (tx, rx) = mpsc::channel(SURFACE_CHANNEL_CAPACITY);
    let printer = tokio::spawn(surface::run_printer(rx, tokio::io::stdout()));

    let mut app = App::new(
        transport,
        identity,
        RendererBridge::for_format(config.render_format, config.max_markdown_bytes),
        tx,
        CoordinatorConfig {
            tick_interval: config.tick_interval(),
        },
    );

    app.start().await;
    let result = app
        .run(BufReader::new(tokio::io::stdin()).lines())
        .await;

    // Dropping the app closes the surface channel and ends the printer
    drop(app);
    printer
        .await
        .context("Printer task panicked")?
        .context("Failed to write to stdout")?;

    result
}
