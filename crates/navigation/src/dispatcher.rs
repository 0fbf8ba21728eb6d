//! Entry point for deep links and notification taps.

use std::sync::Arc;
use std::time::Duration;

use strum::Display;
use tracing::{debug, info, warn};

use crate::config::NavigationConfig;
use crate::destination::Destination;
use crate::error::StorageResult;
use crate::pending::PendingActionStore;
use crate::registry::RouterRegistry;
use crate::schedule::PendingReplay;
use crate::storage::KeyValueStore;
use crate::surface::RoutingSurface;

/// What happened to a delivered destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Delivery {
    /// A router of the domain was live and navigated immediately.
    Routed,
    /// No router was registered; the destination was persisted for replay.
    Deferred,
    /// Persisting failed. The deep link is lost.
    Dropped,
}

/// Routes deep links into live routers or parks them in the pending store.
#[derive(Debug, Clone)]
pub struct DeepLinkDispatcher {
    registry: RouterRegistry,
    pending: PendingActionStore,
    settle_delay: Duration,
}

impl DeepLinkDispatcher {
    pub fn new(registry: RouterRegistry, pending: PendingActionStore, settle_delay: Duration) -> Self {
        Self {
            registry,
            pending,
            settle_delay,
        }
    }

    pub fn from_config(
        registry: RouterRegistry,
        storage: Arc<dyn KeyValueStore>,
        config: &NavigationConfig,
    ) -> Self {
        let pending = PendingActionStore::new(storage, config.pending_key.clone());
        Self::new(registry, pending, config.settle_delay())
    }

    pub fn registry(&self) -> &RouterRegistry {
        &self.registry
    }

    pub fn pending(&self) -> &PendingActionStore {
        &self.pending
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn deliver<D: Destination>(&self, destination: D) -> Delivery {
        if let Some(router) = self.registry.router::<D>() {
            info!(domain = D::DOMAIN, ?destination, router = %router.id(), "deep link routed");
            router.route_to(destination);
            return Delivery::Routed;
        }
        match self.pending.set(&destination) {
            Ok(()) => {
                info!(domain = D::DOMAIN, ?destination, "no live router, deep link deferred");
                Delivery::Deferred
            }
            Err(err) => {
                warn!(domain = D::DOMAIN, ?destination, error = %err, "failed to persist deep link");
                Delivery::Dropped
            }
        }
    }

    /// Prepare a replay of the pending destination of domain `D` after the
    /// settle delay.
    ///
    /// Nothing is consumed here. A router of `D` must be registered and the
    /// slot must hold a record of `D`; the returned replay takes the record
    /// once it is spawned or awaited.
    pub fn replay_pending<D: Destination>(&self) -> Option<PendingReplay<D>> {
        let Some(router) = self.registry.router::<D>() else {
            debug!(domain = D::DOMAIN, "replay skipped, no live router");
            return None;
        };
        match self.pending.holds::<D>() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                warn!(domain = D::DOMAIN, error = %err, "failed to read pending action");
                return None;
            }
        }
        info!(
            domain = D::DOMAIN,
            router = %router.id(),
            delay_ms = self.settle_delay.as_millis() as u64,
            "replaying pending action"
        );
        Some(PendingReplay::new(&router, self.settle_delay, self.pending.clone()))
    }

    /// Mount `surface` and prepare a replay of whatever is pending for its domain.
    pub fn attach<D: Destination>(&self, surface: &mut RoutingSurface<D>) -> Option<PendingReplay<D>> {
        if !surface.mount() {
            return None;
        }
        self.replay_pending::<D>()
    }

    pub fn clear_pending(&self) -> StorageResult<()> {
        self.pending.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::schedule::ScheduledOutcome;
    use crate::storage::MemoryStore;
    use crate::test_support::{Gate, Screen};
    use tokio::task::LocalSet;

    const SETTLE: Duration = Duration::from_millis(500);

    fn dispatcher() -> DeepLinkDispatcher {
        let pending = PendingActionStore::new(Arc::new(MemoryStore::new()), "pending");
        DeepLinkDispatcher::new(RouterRegistry::new(), pending, SETTLE)
    }

    fn surface(dispatcher: &DeepLinkDispatcher) -> RoutingSurface<Screen> {
        RoutingSurface::new(dispatcher.registry().clone(), |r| ("root".to_string(), r.id()))
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Poisoned)
        }
        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Poisoned)
        }
        fn remove(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Poisoned)
        }
    }

    #[test]
    fn test_deliver_routes_synchronously_when_registered() {
        let dispatcher = dispatcher();
        let mut surface = surface(&dispatcher);
        surface.mount();

        assert_eq!(dispatcher.deliver(Screen::Detail(1)), Delivery::Routed);
        assert_eq!(surface.router().stack(), vec![Screen::Detail(1)]);
        assert_eq!(dispatcher.pending().peek().unwrap(), None);
    }

    #[test]
    fn test_deliver_defers_without_router() {
        let dispatcher = dispatcher();

        assert_eq!(dispatcher.deliver(Screen::Settings), Delivery::Deferred);
        assert_eq!(dispatcher.pending().peek().unwrap().unwrap().route, "settings");
    }

    #[test]
    fn test_deliver_reports_storage_failure() {
        let pending = PendingActionStore::new(Arc::new(FailingStore), "pending");
        let dispatcher = DeepLinkDispatcher::new(RouterRegistry::new(), pending, SETTLE);

        assert_eq!(dispatcher.deliver(Screen::Home), Delivery::Dropped);
    }

    #[test]
    fn test_replay_without_router_keeps_pending() {
        let dispatcher = dispatcher();
        dispatcher.deliver(Screen::Home);

        assert!(dispatcher.replay_pending::<Screen>().is_none());
        assert!(dispatcher.pending().peek().unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_replays_after_settle_delay() {
        LocalSet::new()
            .run_until(async {
                let dispatcher = dispatcher();
                dispatcher.deliver(Screen::Detail(8));
                let mut surface = surface(&dispatcher);

                let scheduled = dispatcher.attach(&mut surface).unwrap().spawn();
                tokio::task::yield_now().await;
                assert_eq!(dispatcher.pending().peek().unwrap(), None);

                tokio::time::advance(SETTLE - Duration::from_millis(1)).await;
                tokio::task::yield_now().await;
                assert!(surface.router().stack().is_empty());

                assert_eq!(scheduled.outcome().await, ScheduledOutcome::Routed);
                assert_eq!(surface.router().stack(), vec![Screen::Detail(8)]);
                assert!(dispatcher.replay_pending::<Screen>().is_none());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_during_settle_delay_cancels_replay() {
        LocalSet::new()
            .run_until(async {
                let dispatcher = dispatcher();
                dispatcher.deliver(Screen::Home);
                let mut surface = surface(&dispatcher);
                let scheduled = dispatcher.attach(&mut surface).unwrap().spawn();
                tokio::task::yield_now().await;

                surface.unmount();

                assert_eq!(scheduled.outcome().await, ScheduledOutcome::RouterGone);
                assert!(surface.router().stack().is_empty());
            })
            .await;
    }

    #[test]
    fn test_replay_skips_other_domain() {
        let dispatcher = dispatcher();
        dispatcher.deliver(Gate::Login);
        let mut surface = surface(&dispatcher);

        assert!(dispatcher.attach(&mut surface).is_none());
        assert_eq!(dispatcher.pending().peek().unwrap().unwrap().domain, "gate");
    }

    #[test]
    fn test_attach_without_local_set_keeps_pending() {
        let dispatcher = dispatcher();
        dispatcher.deliver(Screen::Detail(5));
        let mut surface = surface(&dispatcher);

        let replay = dispatcher.attach(&mut surface);
        assert!(replay.is_some());
        assert!(surface.is_mounted());
        drop(replay);

        assert_eq!(dispatcher.pending().peek().unwrap().unwrap().route, "detail:5");
        assert!(dispatcher.replay_pending::<Screen>().is_some());
    }
}
