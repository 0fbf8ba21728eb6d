//! Marshals deep links produced on arbitrary threads onto the UI loop.
//!
//! [`DeepLinkSender`] is `Send + Clone` and can live in a notification
//! handler or a background task. [`DeepLinkInbox`] stays on the UI thread and
//! hands every event to a [`DeepLinkDispatcher`].

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::destination::Destination;
use crate::dispatcher::{DeepLinkDispatcher, Delivery};
use crate::error::NavigationError;
use crate::schedule::{PendingReplay, ScheduledRoute};

/// Event accepted by the inbox of one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<D> {
    /// A decoded deep link or notification target.
    DeepLink(D),
    /// The app returned to the foreground; replay whatever is pending.
    Foreground,
}

/// Result of handling one [`Inbound`] event.
#[derive(Debug)]
pub enum Handled {
    Delivered(Delivery),
    Replay(Option<ScheduledRoute>),
}

/// Create a connected sender/inbox pair for domain `D`.
pub fn inbox<D: Destination + Send>() -> (DeepLinkSender<D>, DeepLinkInbox<D>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DeepLinkSender { tx }, DeepLinkInbox { rx })
}

pub struct DeepLinkSender<D> {
    tx: mpsc::UnboundedSender<Inbound<D>>,
}

impl<D> Clone for DeepLinkSender<D> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<D> std::fmt::Debug for DeepLinkSender<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepLinkSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<D: Destination + Send> DeepLinkSender<D> {
    pub fn deliver(&self, destination: D) -> Result<(), NavigationError> {
        self.send(Inbound::DeepLink(destination))
    }

    pub fn foreground(&self) -> Result<(), NavigationError> {
        self.send(Inbound::Foreground)
    }

    pub fn send(&self, event: Inbound<D>) -> Result<(), NavigationError> {
        trace!(domain = D::DOMAIN, ?event, "queueing inbound event");
        self.tx.send(event).map_err(|_| NavigationError::InboxClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// UI-thread end of the channel.
pub struct DeepLinkInbox<D> {
    rx: mpsc::UnboundedReceiver<Inbound<D>>,
}

impl<D> std::fmt::Debug for DeepLinkInbox<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepLinkInbox")
            .field("queued", &self.rx.len())
            .finish()
    }
}

impl<D: Destination> DeepLinkInbox<D> {
    /// Next event, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Inbound<D>> {
        self.rx.recv().await
    }

    /// Apply one event through `dispatcher`. A foreground replay is spawned on
    /// the current `LocalSet`.
    pub fn handle(dispatcher: &DeepLinkDispatcher, event: Inbound<D>) -> Handled {
        match event {
            Inbound::DeepLink(destination) => Handled::Delivered(dispatcher.deliver(destination)),
            Inbound::Foreground => {
                debug!(domain = D::DOMAIN, "foreground, replaying pending action");
                Handled::Replay(dispatcher.replay_pending::<D>().map(PendingReplay::spawn))
            }
        }
    }

    /// Handle everything already queued without waiting. Returns the number
    /// of events processed.
    pub fn drain(&mut self, dispatcher: &DeepLinkDispatcher) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            Self::handle(dispatcher, event);
            handled += 1;
        }
        handled
    }

    /// Dispatch events until all senders are dropped. Must run on the UI
    /// thread's `LocalSet` because replays spawn local timers.
    pub async fn run(mut self, dispatcher: DeepLinkDispatcher) {
        while let Some(event) = self.rx.recv().await {
            Self::handle(&dispatcher, event);
        }
        debug!(domain = D::DOMAIN, "deep link inbox closed");
    }
}
