//! Settings and UI Config
//!
//! Per-identity settings (system prompt, temperature) and the server's
//! display strings. Neither carries protocol complexity; both are plain
//! request/response round trips through [`ChatTransport`].

use std::sync::Arc;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::backend::{ChatTransport, TransportError};
use crate::identity::SessionIdentity;
use crate::messages::{SaveStatus, SurfaceMessage};

/// Temperature applied by reset
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Lowest accepted temperature
pub const MIN_TEMPERATURE: f64 = 0.0;

/// Highest accepted temperature
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Maximum number of example queries offered at once
pub const MAX_EXAMPLES: usize = 4;

/// Settings stored on the server for one identity
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// System prompt
    #[serde(default)]
    pub system_prompt: String,
    /// Sampling temperature (server default when absent)
    #[serde(default)]
    pub temperature: Option<f64>,
}

/// Body of a settings update
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    /// Identity the settings belong to
    pub session_id: String,
    /// New system prompt
    pub system_prompt: String,
    /// New temperature
    pub temperature: f64,
}

/// Display strings and example prompts served by the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// App title
    pub title: String,
    /// Subtitle under the title
    pub subtitle: String,
    /// Text of the welcome panel
    pub welcome_message: String,
    /// Prompts offered on the welcome panel
    pub example_queries: Vec<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: "Chat Agent".to_string(),
            subtitle: "Your intelligent AI assistant".to_string(),
            welcome_message: "Ask me anything.".to_string(),
            example_queries: Vec::new(),
        }
    }
}

impl UiConfig {
    /// A random selection of up to [`MAX_EXAMPLES`] example queries
    #[must_use]
    pub fn pick_examples(&self) -> Vec<String> {
        let mut rng = rand::thread_rng();
        self.example_queries
            .choose_multiple(&mut rng, MAX_EXAMPLES)
            .cloned()
            .collect()
    }
}

/// Clamp a temperature into the accepted range
#[must_use]
pub fn clamp_temperature(value: f64) -> f64 {
    if value.is_nan() {
        return DEFAULT_TEMPERATURE;
    }
    value.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
}

/// Settings form state backed by the server
pub struct SettingsPanel<T: ChatTransport> {
    transport: Arc<T>,
    identity: SessionIdentity,
    tx: mpsc::Sender<SurfaceMessage>,
    system_prompt: String,
    temperature: f64,
    /// Prompt as last loaded from the server; reset target
    default_prompt: String,
}

impl<T: ChatTransport> SettingsPanel<T> {
    /// Create a panel with local defaults (call [`load`](Self::load) to sync)
    pub fn new(
        transport: Arc<T>,
        identity: SessionIdentity,
        tx: mpsc::Sender<SurfaceMessage>,
    ) -> Self {
        Self {
            transport,
            identity,
            tx,
            system_prompt: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            default_prompt: String::new(),
        }
    }

    /// Current system prompt
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Current temperature
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Temperature as displayed next to the slider
    #[must_use]
    pub fn temperature_label(&self) -> String {
        format!("{:.2}", self.temperature)
    }

    /// Edit the system prompt locally
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Edit the temperature locally, clamped to the accepted range
    pub fn set_temperature(&mut self, value: f64) {
        self.temperature = clamp_temperature(value);
    }

    /// Fetch settings for this identity
    ///
    /// On failure the local values are kept and the error is logged.
    pub async fn load(&mut self) -> Result<(), TransportError> {
        let settings = match self.transport.get_settings(&self.identity).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load settings");
                return Err(e);
            }
        };

        self.system_prompt.clone_from(&settings.system_prompt);
        self.default_prompt.clone_from(&settings.system_prompt);
        if let Some(temperature) = settings.temperature {
            self.temperature = clamp_temperature(temperature);
        }
        self.emit(SurfaceMessage::SettingsLoaded(self.snapshot())).await;
        Ok(())
    }

    /// Restore the loaded prompt and default temperature (not saved)
    pub async fn reset(&mut self) {
        self.system_prompt.clone_from(&self.default_prompt);
        self.temperature = DEFAULT_TEMPERATURE;
        self.emit(SurfaceMessage::SettingsLoaded(self.snapshot())).await;
        self.emit(SurfaceMessage::SaveStatus(SaveStatus::ResetPending))
            .await;
    }

    /// Persist the current values on the server
    pub async fn save(&mut self) -> SaveStatus {
        let update = SettingsUpdate {
            session_id: self.identity.as_str().to_string(),
            system_prompt: self.system_prompt.clone(),
            temperature: self.temperature,
        };

        let status = match self.transport.put_settings(&update).await {
            Ok(stored) => {
                if let Some(temperature) = stored.temperature {
                    self.temperature = clamp_temperature(temperature);
                }
                tracing::info!(temperature = self.temperature, "Settings saved");
                SaveStatus::Saved
            }
            Err(TransportError::Status { status, .. }) => {
                tracing::warn!(status, "Server rejected settings update");
                SaveStatus::Failed
            }
            Err(e) => {
                tracing::warn!(error = %e, "Settings update failed");
                SaveStatus::ConnectionError
            }
        };

        self.emit(SurfaceMessage::SaveStatus(status.clone())).await;
        status
    }

    /// Current local values
    #[must_use]
    pub fn snapshot(&self) -> Settings {
        Settings {
            system_prompt: self.system_prompt.clone(),
            temperature: Some(self.temperature),
        }
    }

    async fn emit(&self, msg: SurfaceMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}
