//! Write-behind battle event recorder.
//!
//! Rooms must never stall on disk IO, so they hand events to a channel
//! and move on. A single background task drains the channel and appends
//! to the per-character files, which also serializes writes so two events
//! for the same character cannot race each other's read-modify-write.
//!
//! Failures are logged and swallowed. A full disk degrades history, not
//! gameplay, and clients are never told about storage problems.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::history::{BattleEvent, HistoryStore};

/// Cloneable front end to the recorder task.
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    tx: mpsc::UnboundedSender<BattleEvent>,
}

impl RecorderHandle {
    /// Queue one event for persistence. Never blocks, never fails the
    /// caller; if the recorder task is gone the event is dropped with a
    /// warning.
    pub fn record(&self, event: BattleEvent) {
        if let Err(err) = self.tx.send(event) {
            let event = err.0;
            warn!(
                character = %event.character_id,
                event_type = %event.event_type,
                "recorder stopped, dropping battle event"
            );
        }
    }
}

/// Start the recorder task for the given store.
///
/// The task runs until every [`RecorderHandle`] is dropped, then drains
/// whatever is still queued and exits.
pub fn spawn_recorder(store: HistoryStore) -> RecorderHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<BattleEvent>();
    tokio::spawn(async move {
        debug!(dir = %store.dir().display(), "battle recorder started");
        while let Some(event) = rx.recv().await {
            let character = event.character_id.clone();
            let event_type = event.event_type.clone();
            if let Err(err) = store.append(event).await {
                warn!(
                    character = %character,
                    event_type = %event_type,
                    error = %err,
                    "failed to persist battle event"
                );
            }
        }
        debug!("battle recorder stopped");
    });
    RecorderHandle { tx }
}
