//! Navigation routing core.
//!
//! A [`Router`] owns one navigation domain's visible state: a push stack plus at
//! most one sheet or full-screen overlay. A [`RoutingSurface`] renders that state
//! and publishes its router into the [`RouterRegistry`], where the
//! [`DeepLinkDispatcher`] can reach it. Deep links that arrive before any surface
//! of their domain is mounted are parked in the [`PendingActionStore`] and
//! replayed once a surface mounts or the app returns to the foreground.
//!
//! Everything in this crate is confined to the UI thread (`Rc`-based, `!Send`).
//! Events produced elsewhere enter through a [`DeepLinkSender`], which is `Send`
//! and marshals them into the UI loop.

/// Typed navigation targets and their route encoding
pub mod destination;
/// Deep-link delivery and pending-action replay
pub mod dispatcher;
/// Shared error types
pub mod error;
/// Cross-thread inbox feeding the UI loop
pub mod inbox;
/// Durable at-most-one deferred destination
pub mod pending;
/// Process-wide map of live routers per domain
pub mod registry;
/// Per-domain router state machine
pub mod router;
/// Settle-delay timers bound to a router's lifetime
pub mod schedule;
/// Key-value storage backends
pub mod storage;
/// Rendering container and registry lifecycle
pub mod surface;

mod config;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::NavigationConfig;
pub use destination::{Destination, NavigationIntent, RouteCode};
pub use dispatcher::{DeepLinkDispatcher, Delivery};
pub use error::{NavigationError, StorageError};
pub use inbox::{inbox, DeepLinkInbox, DeepLinkSender, Handled, Inbound};
pub use pending::{PendingAction, PendingActionStore};
pub use registry::{RouterRegistry, SurfaceId};
pub use router::{DismissOutcome, OverlaySlot, Router, RouterId, WeakRouter};
pub use schedule::{PendingReplay, ScheduledOutcome, ScheduledRoute};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use surface::{OverlayFrame, RoutingSurface, SurfaceFrame};
