// nukio-api: Async Rust client and webhook listener for the Nuki Bridge HTTP API

mod cache;
pub mod callbacks;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;
pub mod webhook;

pub use cache::Cached;
pub use client::{BridgeClient, LockStateReading};
pub use error::Error;
pub use models::{BridgeLockState, Callback, LockAction, LockActionResponse, LockStateResponse};
pub use transport::TransportConfig;
pub use webhook::{WebhookEvent, WebhookHandle, WebhookListener};
