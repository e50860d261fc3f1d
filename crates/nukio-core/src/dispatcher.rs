// ── Notification dispatcher ──
//
// Consumes parsed webhook events from the listener's broadcast channel,
// folds them into the store and hands real changes to the host. Runs as a
// single background task until cancelled or the channel closes.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::accessory::HostNotifier;
use crate::bridge::LockBridge;
use crate::model::{ChangeNotification, LockStateMode, WebhookEvent};
use crate::store::LockStateStore;

/// Routes bridge notifications into the store and on to the host.
pub struct NotificationDispatcher<B> {
    store: Arc<LockStateStore>,
    bridge: Arc<B>,
    notifier: Arc<HostNotifier>,
    mode: LockStateMode,
}

impl<B: LockBridge> NotificationDispatcher<B> {
    pub fn new(
        store: Arc<LockStateStore>,
        bridge: Arc<B>,
        notifier: Arc<HostNotifier>,
        mode: LockStateMode,
    ) -> Self {
        Self {
            store,
            bridge,
            notifier,
            mode,
        }
    }

    /// Process one event. Returns the notification delivered to the host,
    /// if the event changed anything.
    pub fn dispatch(&self, event: &nukio_api::WebhookEvent) -> Option<ChangeNotification> {
        if !self.store.contains(&event.device_id) {
            warn!(device = %event.device_id, "webhook for unconfigured device dropped");
            return None;
        }

        // The bridge state moved, so any cached reading is stale.
        self.bridge.invalidate(&event.device_id);

        let event = WebhookEvent::from_bridge(event, self.mode);
        match self.store.apply_webhook(&event) {
            Ok(Some(notification)) => {
                info!(
                    device = %notification.device_id,
                    locked = notification.is_locked,
                    battery_critical = notification.battery_critical,
                    "bridge reported change"
                );
                self.notifier.notify(&notification);
                Some(notification)
            }
            Ok(None) => {
                debug!(device = %event.device_id, "webhook unchanged or stale");
                None
            }
            Err(e) => {
                warn!(device = %event.device_id, error = %e, "webhook not applied");
                None
            }
        }
    }

    /// Spawn the dispatch loop.
    pub fn spawn(
        self,
        rx: broadcast::Receiver<Arc<nukio_api::WebhookEvent>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(rx, cancel))
    }

    async fn run(
        self,
        mut rx: broadcast::Receiver<Arc<nukio_api::WebhookEvent>>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = rx.recv() => match result {
                    Ok(event) => {
                        self.dispatch(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "webhook dispatcher lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("webhook channel closed");
                        break;
                    }
                },
            }
        }
        debug!("notification dispatcher stopped");
    }
}
