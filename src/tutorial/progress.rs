//! Tutorial progress persistence.
//!
//! Tutorial flag writes go through [`ProgressRecorder`], a fire-and-forget
//! handle feeding a single writer task, so the controller never waits on
//! storage and a reset can never race a queued completion. A failed write is
//! logged and dropped; the cost is a tutorial that shows again on the next
//! launch. Reads used at launch go through [`ProgressReader`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::model::{Persona, settings_keys};
use crate::error::DatabaseError;
use crate::store::SettingsStore;

enum ProgressCommand {
    MarkCompleted(Persona),
    ClearCompleted(Persona),
    ClearAll,
    Flush(oneshot::Sender<()>),
}

/// Non-blocking handle for recording tutorial completion.
#[derive(Debug, Clone)]
pub struct ProgressRecorder {
    tx: mpsc::UnboundedSender<ProgressCommand>,
}

impl std::fmt::Debug for ProgressCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MarkCompleted(p) => write!(f, "MarkCompleted({p})"),
            Self::ClearCompleted(p) => write!(f, "ClearCompleted({p})"),
            Self::ClearAll => write!(f, "ClearAll"),
            Self::Flush(_) => write!(f, "Flush"),
        }
    }
}

impl ProgressRecorder {
    /// Spawn the writer task for `user_id` on the current tokio runtime.
    ///
    /// The task exits once every clone of the returned recorder is dropped.
    pub fn spawn(
        store: Arc<dyn SettingsStore>,
        user_id: impl Into<String>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(store, user_id.into(), rx));
        (Self { tx }, handle)
    }

    /// A recorder with no writer behind it. Every write is discarded.
    pub fn detached() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    /// Queue "tutorial seen" for `persona`. Never blocks.
    pub fn mark_completed(&self, persona: Persona) {
        self.send(ProgressCommand::MarkCompleted(persona));
    }

    /// Queue removal of the "tutorial seen" flag for `persona`.
    pub fn clear_completed(&self, persona: Persona) {
        self.send(ProgressCommand::ClearCompleted(persona));
    }

    /// Queue removal of every tutorial flag and the just-completed trigger.
    ///
    /// Applied after any completion queued before it.
    pub fn clear_all(&self) {
        self.send(ProgressCommand::ClearAll);
    }

    /// Wait until every write queued before this call has been applied.
    ///
    /// Returns immediately for a detached recorder.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(ProgressCommand::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    fn send(&self, command: ProgressCommand) {
        if let Err(e) = self.tx.send(command) {
            debug!(command = ?e.0, "No progress writer running, write dropped");
        }
    }
}

async fn run_writer(
    store: Arc<dyn SettingsStore>,
    user_id: String,
    mut rx: mpsc::UnboundedReceiver<ProgressCommand>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            ProgressCommand::MarkCompleted(persona) => {
                let key = settings_keys::tutorial_completed(persona);
                match store.set_flag(&user_id, &key, true).await {
                    Ok(()) => info!(%persona, "Tutorial marked as completed"),
                    Err(e) => warn!(%persona, error = %e, "Failed to persist tutorial completion"),
                }
            }
            ProgressCommand::ClearCompleted(persona) => {
                let key = settings_keys::tutorial_completed(persona);
                if let Err(e) = store.delete_setting(&user_id, &key).await {
                    warn!(%persona, error = %e, "Failed to clear tutorial completion");
                }
            }
            ProgressCommand::ClearAll => match clear_tutorial_flags(store.as_ref(), &user_id).await {
                Ok(()) => info!(%user_id, "Tutorial data cleared"),
                Err(e) => warn!(%user_id, error = %e, "Failed to clear tutorial data"),
            },
            ProgressCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("Progress writer stopped");
}

async fn clear_tutorial_flags(store: &dyn SettingsStore, user_id: &str) -> Result<(), DatabaseError> {
    for persona in Persona::ALL {
        store
            .delete_setting(user_id, &settings_keys::tutorial_completed(persona))
            .await?;
    }
    store
        .delete_setting(user_id, settings_keys::JUST_COMPLETED_ONBOARDING)
        .await?;
    Ok(())
}

/// Reads and host-side writes of the launch-time flags.
#[derive(Clone)]
pub struct ProgressReader {
    store: Arc<dyn SettingsStore>,
    user_id: String,
}

impl ProgressReader {
    pub fn new(store: Arc<dyn SettingsStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    /// Whether the tutorial for `persona` was completed or skipped.
    pub async fn has_completed(&self, persona: Persona) -> Result<bool, DatabaseError> {
        self.store
            .get_flag(&self.user_id, &settings_keys::tutorial_completed(persona))
            .await
    }

    pub async fn onboarding_completed(&self) -> Result<bool, DatabaseError> {
        self.store
            .get_flag(&self.user_id, settings_keys::ONBOARDING_COMPLETED)
            .await
    }

    /// Read the one-shot "onboarding just completed" trigger and clear it.
    pub async fn take_just_completed_onboarding(&self) -> Result<bool, DatabaseError> {
        let set = self
            .store
            .get_flag(&self.user_id, settings_keys::JUST_COMPLETED_ONBOARDING)
            .await?;
        if set {
            self.store
                .set_flag(&self.user_id, settings_keys::JUST_COMPLETED_ONBOARDING, false)
                .await?;
        }
        Ok(set)
    }

    /// Persona stored by onboarding, if any. Unrecognized tags read as `None`.
    pub async fn detected_persona(&self) -> Result<Option<Persona>, DatabaseError> {
        let value = self
            .store
            .get_setting(&self.user_id, settings_keys::DETECTED_PERSONA)
            .await?;
        Ok(value
            .as_ref()
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok()))
    }

    /// Record the end of onboarding: the detected persona plus the
    /// completed and just-completed flags.
    pub async fn record_onboarding(&self, persona: Persona) -> Result<(), DatabaseError> {
        self.store
            .set_setting(
                &self.user_id,
                settings_keys::DETECTED_PERSONA,
                &serde_json::Value::String(persona.to_string()),
            )
            .await?;
        self.store
            .set_flag(&self.user_id, settings_keys::ONBOARDING_COMPLETED, true)
            .await?;
        self.store
            .set_flag(&self.user_id, settings_keys::JUST_COMPLETED_ONBOARDING, true)
            .await?;
        info!(%persona, "Onboarding recorded");
        Ok(())
    }
}

/// Decides at launch whether the tutorial should start on its own.
///
/// Only automatic starts are gated; a manual restart always works.
#[derive(Clone)]
pub struct LaunchGate {
    reader: ProgressReader,
}

impl LaunchGate {
    pub fn new(reader: ProgressReader) -> Self {
        Self { reader }
    }

    /// True when onboarding is done, `persona` has not seen its tutorial,
    /// and the just-completed trigger is set. The trigger is consumed.
    ///
    /// Read failures count as "don't start".
    pub async fn should_auto_start(&self, persona: Persona) -> bool {
        match self.check(persona).await {
            Ok(start) => start,
            Err(e) => {
                warn!(%persona, error = %e, "Failed to read tutorial flags, skipping auto-start");
                false
            }
        }
    }

    /// The persona to auto-start for, if any. Falls back to
    /// `CommunityBuilder` when onboarding stored no persona.
    pub async fn resolve(&self) -> Option<Persona> {
        let persona = match self.reader.detected_persona().await {
            Ok(p) => p.unwrap_or(Persona::CommunityBuilder),
            Err(e) => {
                warn!(error = %e, "Failed to read detected persona, skipping auto-start");
                return None;
            }
        };
        self.should_auto_start(persona).await.then_some(persona)
    }

    async fn check(&self, persona: Persona) -> Result<bool, DatabaseError> {
        let onboarded = self.reader.onboarding_completed().await?;
        let seen = self.reader.has_completed(persona).await?;
        debug!(%persona, onboarded, seen, "Auto-start check");
        if !onboarded || seen {
            return Ok(false);
        }
        self.reader.take_just_completed_onboarding().await
    }
}
