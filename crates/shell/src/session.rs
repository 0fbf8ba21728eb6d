//! External signals the shell reacts to. Both are plain `watch` channels, so
//! they can be updated from any thread.

use std::sync::Arc;

use tokio::sync::watch;

/// Signed-in flag published by the session service. `None` until the service
/// has answered for the first time.
#[derive(Debug, Clone)]
pub struct Session {
    tx: Arc<watch::Sender<Option<bool>>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<bool>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<bool> {
        *self.tx.borrow()
    }

    pub fn sign_in(&self) {
        self.tx.send_replace(Some(true));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(Some(false));
    }
}

/// Network reachability.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectivity {
    /// Starts out online.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(true);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
    }
}
