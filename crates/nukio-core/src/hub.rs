// ── Hub ──
//
// Wires the bridge client, store, controller and dispatcher together and
// owns the lifecycle of the webhook listener. One cancellation token tree
// covers the listener, the dispatcher and every pending re-lock timer.

use std::net::SocketAddr;
use std::sync::Arc;

use nukio_api::{BridgeClient, WebhookHandle, WebhookListener};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::accessory::{HostNotifier, LockAccessory};
use crate::bridge::LockBridge;
use crate::config::HubConfig;
use crate::controller::LockController;
use crate::dispatcher::NotificationDispatcher;
use crate::error::CoreError;
use crate::store::LockStateStore;

/// The assembled lock-sync engine.
pub struct Hub<B = BridgeClient> {
    config: HubConfig,
    bridge: Arc<B>,
    store: Arc<LockStateStore>,
    notifier: Arc<HostNotifier>,
    controller: Arc<LockController<B>>,
    cancel: CancellationToken,
    listener: Mutex<Option<WebhookHandle>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Hub<BridgeClient> {
    /// Build a hub talking to the bridge over HTTP. Does not start the
    /// listener; call [`start()`](Self::start).
    pub fn new(config: HubConfig) -> Result<Self, CoreError> {
        let client = BridgeClient::new(
            config.bridge.url.clone(),
            config.bridge.api_token.clone(),
            &config.bridge.transport(),
        )?;
        Ok(Self::with_bridge(config, Arc::new(client)))
    }
}

impl<B: LockBridge> Hub<B> {
    pub fn with_bridge(config: HubConfig, bridge: Arc<B>) -> Self {
        let cancel = CancellationToken::new();
        let store = Arc::new(LockStateStore::new(config.devices.iter().map(|d| &d.id)));
        let notifier = Arc::new(HostNotifier::new());
        let controller = Arc::new(LockController::new(
            Arc::clone(&bridge),
            Arc::clone(&store),
            Arc::clone(&notifier),
            config.devices.iter().cloned(),
            config.bridge.controller_settings(),
            cancel.child_token(),
        ));

        Self {
            config,
            bridge,
            store,
            notifier,
            controller,
            cancel,
            listener: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn bridge(&self) -> &Arc<B> {
        &self.bridge
    }

    pub fn store(&self) -> &Arc<LockStateStore> {
        &self.store
    }

    pub fn notifier(&self) -> &Arc<HostNotifier> {
        &self.notifier
    }

    pub fn controller(&self) -> &Arc<LockController<B>> {
        &self.controller
    }

    /// Host view of one device, already attached to the notifier.
    pub fn accessory(&self, device_id: &str) -> Result<Arc<LockAccessory<B>>, CoreError> {
        let accessory = LockAccessory::new(device_id, Arc::clone(&self.controller))?;
        accessory.attach(&self.notifier);
        Ok(accessory)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Bind the webhook listener, start dispatching and register the
    /// callback URL with the bridge if configured to.
    ///
    /// Returns the bound address, or `None` when the listener is disabled.
    /// Calling it again while running returns the existing address.
    pub async fn start(&self) -> Result<Option<SocketAddr>, CoreError> {
        let webhook = &self.config.webhook;
        if !webhook.enabled {
            info!("webhook listener disabled, state follows commands and polls only");
            return Ok(None);
        }

        let mut listener = self.listener.lock().await;
        if let Some(handle) = listener.as_ref() {
            return Ok(Some(handle.local_addr()));
        }

        let handle = WebhookListener::bind(webhook.bind_addr(), self.cancel.child_token()).await?;
        let addr = handle.local_addr();

        let dispatcher = NotificationDispatcher::new(
            Arc::clone(&self.store),
            Arc::clone(&self.bridge),
            Arc::clone(&self.notifier),
            self.config.bridge.lock_state_mode,
        );
        self.tasks
            .lock()
            .await
            .push(dispatcher.spawn(handle.subscribe(), self.cancel.child_token()));
        *listener = Some(handle);
        drop(listener);

        if webhook.register {
            self.register_callback(addr.port()).await;
        }

        info!(%addr, devices = self.config.devices.len(), "hub started");
        Ok(Some(addr))
    }

    /// Address of the running listener.
    pub async fn listener_addr(&self) -> Option<SocketAddr> {
        self.listener.lock().await.as_ref().map(WebhookHandle::local_addr)
    }

    /// Stop the listener, the dispatcher and pending re-lock timers.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let handle = self.listener.lock().await.take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }

        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            let _ = task.await;
        }
        debug!("hub stopped");
    }

    async fn register_callback(&self, port: u16) {
        let Some(url) = self.config.webhook.callback_url(port) else {
            warn!("webhook.host is not set, bridge callback not registered");
            return;
        };
        match self.bridge.ensure_callback(&url).await {
            Ok(true) => info!(%url, "bridge callback registered"),
            Ok(false) => debug!(%url, "bridge callback already present"),
            Err(e) => warn!(%url, error = %e, "bridge callback registration failed"),
        }
    }
}
