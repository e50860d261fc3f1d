// Bridge callback endpoints
//
// The bridge pushes state changes to up to three registered callback
// URLs. These methods manage that list; `ensure_callback` is the
// idempotent form used at startup.

use tracing::{debug, info};

use crate::client::{BridgeClient, RequestKind};
use crate::error::Error;
use crate::models::{Callback, CallbackList, CallbackResponse};

impl BridgeClient {
    /// List registered callback URLs.
    ///
    /// `GET /callback/list`
    pub async fn list_callbacks(&self) -> Result<Vec<Callback>, Error> {
        let url = self.endpoint("callback/list", &[])?;
        let list: CallbackList = self
            .send(self.http_get(url), RequestKind::Query, self.query_timeout(), None)
            .await?;
        Ok(list.callbacks)
    }

    /// Register a callback URL.
    ///
    /// `GET /callback/add?url={url}`
    pub async fn add_callback(&self, callback_url: &str) -> Result<(), Error> {
        let url = self.endpoint("callback/add", &[("url", callback_url)])?;
        debug!(callback_url, "registering callback");
        let resp: CallbackResponse = self
            .send(self.http_get(url), RequestKind::Query, self.query_timeout(), None)
            .await?;
        check(resp)
    }

    /// Remove a registered callback by id.
    ///
    /// `GET /callback/remove?id={id}`
    pub async fn remove_callback(&self, id: u32) -> Result<(), Error> {
        let id = id.to_string();
        let url = self.endpoint("callback/remove", &[("id", &id)])?;
        debug!(id, "removing callback");
        let resp: CallbackResponse = self
            .send(self.http_get(url), RequestKind::Query, self.query_timeout(), None)
            .await?;
        check(resp)
    }

    /// Register `callback_url` unless the bridge already knows it.
    ///
    /// Returns `true` if a new registration was made.
    pub async fn ensure_callback(&self, callback_url: &str) -> Result<bool, Error> {
        let existing = self.list_callbacks().await?;
        if existing.iter().any(|c| same_url(&c.url, callback_url)) {
            debug!(callback_url, "callback already registered");
            return Ok(false);
        }
        self.add_callback(callback_url).await?;
        info!(callback_url, "callback registered with bridge");
        Ok(true)
    }
}

fn check(resp: CallbackResponse) -> Result<(), Error> {
    if resp.success {
        Ok(())
    } else {
        Err(Error::BadResponse {
            message: resp
                .message
                .unwrap_or_else(|| "bridge reported failure".into()),
        })
    }
}

fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/').eq_ignore_ascii_case(b.trim_end_matches('/'))
}
