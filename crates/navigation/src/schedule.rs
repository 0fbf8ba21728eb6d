use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::destination::Destination;
use crate::pending::PendingActionStore;
use crate::router::{Router, RouterId, WeakRouter};

/// How a scheduled route ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledOutcome {
    Routed,
    /// Cancelled through [`ScheduledRoute::cancel`].
    Cancelled,
    /// The router was torn down or dropped before the delay elapsed.
    RouterGone,
    /// A replay found nothing of its domain left to consume.
    Empty,
}

/// Deadline and cancellation shared by delayed routes of one router.
struct Timer<D: Destination> {
    target: WeakRouter<D>,
    router_id: RouterId,
    token: CancellationToken,
    deadline: Instant,
}

impl<D: Destination> Timer<D> {
    fn new(router: &Router<D>, delay: Duration) -> Self {
        Self {
            target: router.downgrade(),
            router_id: router.id(),
            token: router.lifetime().child_token(),
            deadline: Instant::now() + delay,
        }
    }

    fn stopped(target: &WeakRouter<D>) -> ScheduledOutcome {
        match target.upgrade() {
            Some(_) => ScheduledOutcome::Cancelled,
            None => ScheduledOutcome::RouterGone,
        }
    }

    /// `resolve` runs once, on first poll, and only while the router is live.
    async fn fire<F>(self, resolve: F) -> ScheduledOutcome
    where
        F: FnOnce() -> Option<D>,
    {
        let Self {
            target,
            router_id,
            token,
            deadline,
        } = self;

        if token.is_cancelled() {
            let outcome = Self::stopped(&target);
            debug!(router = %router_id, ?outcome, "scheduled route dropped before start");
            return outcome;
        }
        let Some(destination) = resolve() else {
            return ScheduledOutcome::Empty;
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                let outcome = Self::stopped(&target);
                debug!(router = %router_id, ?destination, ?outcome, "scheduled route dropped");
                outcome
            }
            _ = tokio::time::sleep_until(deadline) => match target.upgrade() {
                Some(router) => {
                    router.route_to(destination);
                    ScheduledOutcome::Routed
                }
                None => {
                    debug!(router = %router_id, ?destination, "router gone before scheduled route");
                    ScheduledOutcome::RouterGone
                }
            },
        }
    }
}

/// A delayed `route_to` running on the current `LocalSet`.
///
/// Dropping the handle does not cancel the timer. Tearing the router down does.
#[derive(Debug)]
pub struct ScheduledRoute {
    token: CancellationToken,
    handle: JoinHandle<ScheduledOutcome>,
}

impl ScheduledRoute {
    pub(crate) fn spawn<D: Destination>(router: &Router<D>, delay: Duration, destination: D) -> Self {
        let timer = Timer::new(router, delay);
        let token = timer.token.clone();
        let handle = tokio::task::spawn_local(timer.fire(move || Some(destination)));
        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the timer to resolve.
    pub async fn outcome(self) -> ScheduledOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "scheduled route task failed");
                ScheduledOutcome::Cancelled
            }
        }
    }
}

/// Replay of the pending action into one router, not yet started.
///
/// The deadline is fixed when the replay is created. The pending slot is only
/// consumed once the replay starts running, so a replay that is dropped
/// unstarted leaves the stored action in place.
#[must_use = "a pending replay does nothing until it is spawned or awaited"]
pub struct PendingReplay<D: Destination> {
    timer: Timer<D>,
    pending: PendingActionStore,
}

impl<D: Destination> std::fmt::Debug for PendingReplay<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReplay")
            .field("domain", &D::DOMAIN)
            .field("router", &self.timer.router_id)
            .field("deadline", &self.timer.deadline)
            .finish_non_exhaustive()
    }
}

impl<D: Destination> PendingReplay<D> {
    pub(crate) fn new(router: &Router<D>, delay: Duration, pending: PendingActionStore) -> Self {
        Self {
            timer: Timer::new(router, delay),
            pending,
        }
    }

    pub fn router_id(&self) -> RouterId {
        self.timer.router_id
    }

    pub fn deadline(&self) -> Instant {
        self.timer.deadline
    }

    pub fn cancel(&self) {
        self.timer.token.cancel();
    }

    /// Consume the pending action and route to it at the deadline.
    pub async fn run(self) -> ScheduledOutcome {
        let Self { timer, pending } = self;
        timer
            .fire(move || match pending.consume::<D>() {
                Ok(destination) => destination,
                Err(err) => {
                    warn!(domain = D::DOMAIN, error = %err, "failed to read pending action");
                    None
                }
            })
            .await
    }

    /// Run the replay on the current `LocalSet`.
    ///
    /// # Panics
    ///
    /// Outside a `LocalSet`, as [`tokio::task::spawn_local`] does. The pending
    /// action has not been touched at that point.
    pub fn spawn(self) -> ScheduledRoute {
        let token = self.timer.token.clone();
        let handle = tokio::task::spawn_local(self.run());
        ScheduledRoute { token, handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::OverlaySlot;
    use crate::storage::MemoryStore;
    use crate::test_support::{Gate, Screen};
    use std::sync::Arc;
    use tokio::task::LocalSet;

    const DELAY: Duration = Duration::from_millis(500);

    fn pending() -> PendingActionStore {
        PendingActionStore::new(Arc::new(MemoryStore::new()), "pending")
    }

    #[tokio::test(start_paused = true)]
    async fn test_routes_after_delay() {
        LocalSet::new()
            .run_until(async {
                let router = Router::<Screen>::new();
                let scheduled = router.route_after(DELAY, Screen::Detail(4));

                tokio::time::advance(DELAY / 2).await;
                tokio::task::yield_now().await;
                assert!(router.stack().is_empty());

                assert_eq!(scheduled.outcome().await, ScheduledOutcome::Routed);
                assert_eq!(router.stack(), vec![Screen::Detail(4)]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_navigation() {
        LocalSet::new()
            .run_until(async {
                let router = Router::<Screen>::new();
                let scheduled = router.route_after(DELAY, Screen::Home);
                scheduled.cancel();

                assert_eq!(scheduled.outcome().await, ScheduledOutcome::Cancelled);
                assert!(router.stack().is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismissing_overlay_cancels_its_timers() {
        LocalSet::new()
            .run_until(async {
                let router = Router::<Screen>::new();
                router.route_to(Screen::Settings);
                let sheet_router = router.overlay_router(OverlaySlot::Sheet).unwrap();
                let scheduled = sheet_router.route_after(DELAY, Screen::Detail(1));

                router.dismiss();

                assert_eq!(scheduled.outcome().await, ScheduledOutcome::RouterGone);
                assert!(sheet_router.stack().is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_awaited_without_local_set() {
        let router = Router::<Screen>::new();
        let pending = pending();
        pending.set(&Screen::Detail(2)).unwrap();

        let replay = PendingReplay::new(&router, DELAY, pending.clone());
        assert!(pending.peek().unwrap().is_some());

        assert_eq!(replay.run().await, ScheduledOutcome::Routed);
        assert_eq!(router.stack(), vec![Screen::Detail(2)]);
        assert_eq!(pending.peek().unwrap(), None);
    }

    #[test]
    fn test_dropped_replay_keeps_pending_action() {
        let router = Router::<Screen>::new();
        let pending = pending();
        pending.set(&Screen::Home).unwrap();

        drop(PendingReplay::new(&router, DELAY, pending.clone()));

        assert_eq!(pending.consume::<Screen>().unwrap(), Some(Screen::Home));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_of_torn_down_router_keeps_pending_action() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Player);
        let cover = router.overlay_router(OverlaySlot::FullScreenCover).unwrap();
        let pending = pending();
        pending.set(&Screen::Detail(3)).unwrap();

        let replay = PendingReplay::new(&cover, DELAY, pending.clone());
        router.dismiss();

        assert_eq!(replay.run().await, ScheduledOutcome::RouterGone);
        assert!(pending.peek().unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_of_other_domain_is_empty() {
        let router = Router::<Screen>::new();
        let pending = pending();
        pending.set(&Gate::Login).unwrap();

        let replay = PendingReplay::new(&router, DELAY, pending.clone());

        assert_eq!(replay.run().await, ScheduledOutcome::Empty);
        assert_eq!(pending.peek().unwrap().unwrap().domain, "gate");
        assert!(router.stack().is_empty());
    }
}
