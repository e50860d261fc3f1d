// ── Per-device lock state table ──
//
// One `watch` channel per configured device, created up front. Every
// mutation runs inside `send_if_modified`, which holds the channel's write
// lock: that is the per-device exclusion, and it also wakes subscribers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::CoreError;
use crate::model::{ChangeNotification, DeviceId, LockState, Origin, WebhookEvent};

type Cell = watch::Sender<Option<LockState>>;

/// Authoritative in-memory view of every configured device.
pub struct LockStateStore {
    cells: HashMap<DeviceId, Cell>,
}

impl LockStateStore {
    /// Build the table for a fixed set of devices. Unknown ids are
    /// rejected by every method afterwards.
    pub fn new<'a>(ids: impl IntoIterator<Item = &'a DeviceId>) -> Self {
        let cells = ids
            .into_iter()
            .map(|id| (id.clone(), watch::channel(None).0))
            .collect();
        Self { cells }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cells.contains_key(id)
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Current state, or `StateUnknown` before the first update.
    pub fn get(&self, id: &str) -> Result<LockState, CoreError> {
        self.peek(id)?.ok_or_else(|| CoreError::StateUnknown {
            device_id: id.to_owned(),
        })
    }

    /// Current state if one has been observed.
    pub fn peek(&self, id: &str) -> Result<Option<LockState>, CoreError> {
        Ok(*self.cell(id)?.borrow())
    }

    /// Watch a device for every applied update.
    pub fn subscribe(&self, id: &str) -> Result<watch::Receiver<Option<LockState>>, CoreError> {
        Ok(self.cell(id)?.subscribe())
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Record the confirmed outcome of a command. Returns whether it applied.
    pub fn apply_command_result(&self, id: &str, state: LockState) -> Result<bool, CoreError> {
        debug_assert_eq!(state.source, Origin::Command);
        self.apply_silent(id, state)
    }

    /// Record a bridge query result. Returns whether it applied.
    pub fn apply_poll(&self, id: &str, state: LockState) -> Result<bool, CoreError> {
        debug_assert_eq!(state.source, Origin::Poll);
        self.apply_silent(id, state)
    }

    /// Record a bridge notification.
    ///
    /// Returns a background-tagged notification only when the locked or
    /// battery flag actually changed. Stale and no-op events return `None`.
    pub fn apply_webhook(
        &self,
        event: &WebhookEvent,
    ) -> Result<Option<ChangeNotification>, CoreError> {
        let cell = self.cell(event.device_id.as_str())?;
        let incoming = event.as_state();
        let mut outcome = None;

        cell.send_if_modified(|slot| {
            if !incoming.supersedes(slot.as_ref()) {
                trace!(device = %event.device_id, "stale webhook ignored");
                return false;
            }
            let changed = slot.as_ref().is_none_or(|current| incoming.differs_from(current));
            *slot = Some(incoming);
            if changed {
                outcome = Some(ChangeNotification::new(event.device_id.clone(), &incoming));
            }
            true
        });

        Ok(outcome)
    }

    /// Re-assert the locked state after a door latch sprang back.
    ///
    /// `guard` is checked inside the device's write section, so a command
    /// that cancelled it first always wins.
    pub fn apply_relock(
        &self,
        id: &str,
        at: DateTime<Utc>,
        guard: &CancellationToken,
    ) -> Result<Option<ChangeNotification>, CoreError> {
        let (device_id, cell) = self.entry(id)?;
        let mut outcome = None;

        cell.send_if_modified(|slot| {
            if guard.is_cancelled() {
                return false;
            }
            let battery = slot.as_ref().is_some_and(|s| s.battery_critical);
            let incoming = LockState::new(true, battery, at, Origin::Relock);
            if !incoming.supersedes(slot.as_ref()) {
                return false;
            }
            let changed = slot.as_ref().is_none_or(|current| incoming.differs_from(current));
            *slot = Some(incoming);
            if changed {
                outcome = Some(ChangeNotification::new(device_id.clone(), &incoming));
            }
            true
        });

        Ok(outcome)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn apply_silent(&self, id: &str, state: LockState) -> Result<bool, CoreError> {
        let applied = self.cell(id)?.send_if_modified(|slot| {
            if state.supersedes(slot.as_ref()) {
                *slot = Some(state);
                true
            } else {
                false
            }
        });
        if !applied {
            debug!(device = id, source = %state.source, "older update ignored");
        }
        Ok(applied)
    }

    fn cell(&self, id: &str) -> Result<&Cell, CoreError> {
        self.entry(id).map(|(_, cell)| cell)
    }

    fn entry(&self, id: &str) -> Result<(&DeviceId, &Cell), CoreError> {
        self.cells
            .get_key_value(id)
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: id.to_owned(),
            })
    }
}
