//! Per-domain navigation state machine.
//!
//! A router holds a push stack and at most one overlay. Overlays get their own
//! child router, which can close itself through a weak back-reference into the
//! slot of the router that presented it.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use strum::Display;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::destination::{Destination, NavigationIntent};
use crate::schedule::ScheduledRoute;

static NEXT_ROUTER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a router instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouterId(u64);

impl RouterId {
    fn next() -> Self {
        Self(NEXT_ROUTER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "router#{}", self.0)
    }
}

/// The two overlay slots a router can present into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum OverlaySlot {
    Sheet,
    FullScreenCover,
}

impl OverlaySlot {
    pub fn for_intent(intent: NavigationIntent) -> Option<Self> {
        match intent {
            NavigationIntent::Push => None,
            NavigationIntent::Sheet => Some(OverlaySlot::Sheet),
            NavigationIntent::FullScreenCover => Some(OverlaySlot::FullScreenCover),
        }
    }
}

/// What a call to [`Router::dismiss`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DismissOutcome<D> {
    /// The top of the push stack was removed.
    Popped(D),
    /// An overlay this router presented was closed.
    ClosedOverlay { slot: OverlaySlot, destination: D },
    /// This overlay router closed itself in its presenter.
    DismissedSelf,
    /// Nothing to do: a root router with an empty stack, a detached router,
    /// or one that has been torn down.
    Nothing,
}

struct Presentation<D: Destination> {
    destination: D,
    router: Router<D>,
}

struct RouterState<D: Destination> {
    stack: Vec<D>,
    sheet: Option<Presentation<D>>,
    full_screen: Option<Presentation<D>>,
}

impl<D: Destination> RouterState<D> {
    fn slot(&self, slot: OverlaySlot) -> &Option<Presentation<D>> {
        match slot {
            OverlaySlot::Sheet => &self.sheet,
            OverlaySlot::FullScreenCover => &self.full_screen,
        }
    }

    fn slot_mut(&mut self, slot: OverlaySlot) -> &mut Option<Presentation<D>> {
        match slot {
            OverlaySlot::Sheet => &mut self.sheet,
            OverlaySlot::FullScreenCover => &mut self.full_screen,
        }
    }

    fn take_overlays(&mut self) -> Vec<Presentation<D>> {
        self.sheet.take().into_iter().chain(self.full_screen.take()).collect()
    }
}

/// Weak write access into the overlay slot of the presenting router.
struct DismissSlot<D: Destination> {
    parent: Weak<RouterInner<D>>,
    slot: OverlaySlot,
}

impl<D: Destination> DismissSlot<D> {
    /// Clears the parent's slot if it still presents `child`.
    fn release(&self, child: RouterId) -> bool {
        let Some(parent) = self.parent.upgrade() else {
            return false;
        };
        let released = {
            let mut state = parent.state.borrow_mut();
            let slot = state.slot_mut(self.slot);
            let holds_child = slot.as_ref().is_some_and(|p| p.router.id() == child);
            if holds_child { slot.take() } else { None }
        };
        match released {
            Some(presentation) => {
                presentation.router.tear_down();
                parent.touch();
                true
            }
            None => false,
        }
    }
}

struct RouterInner<D: Destination> {
    id: RouterId,
    state: RefCell<RouterState<D>>,
    dismiss_slot: Option<DismissSlot<D>>,
    lifetime: CancellationToken,
    revision: watch::Sender<u64>,
}

impl<D: Destination> RouterInner<D> {
    fn touch(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

/// Navigation state of one domain, shared by handle.
///
/// Cloning yields another handle to the same router. Routers are `!Send`
/// and must only be touched from the UI thread.
pub struct Router<D: Destination> {
    inner: Rc<RouterInner<D>>,
}

impl<D: Destination> Clone for Router<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Destination> Default for Router<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Destination> fmt::Debug for Router<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Router")
            .field("id", &self.inner.id)
            .field("domain", &D::DOMAIN)
            .field("stack", &state.stack)
            .field("sheet", &state.sheet.as_ref().map(|p| &p.destination))
            .field("full_screen", &state.full_screen.as_ref().map(|p| &p.destination))
            .field("torn_down", &self.inner.lifetime.is_cancelled())
            .finish()
    }
}

impl<D: Destination> Router<D> {
    /// Creates a root router with an empty stack and no overlay.
    pub fn new() -> Self {
        Self::build(None, CancellationToken::new())
    }

    fn build(dismiss_slot: Option<DismissSlot<D>>, lifetime: CancellationToken) -> Self {
        let (revision, _) = watch::channel(0);
        let router = Self {
            inner: Rc::new(RouterInner {
                id: RouterId::next(),
                state: RefCell::new(RouterState {
                    stack: Vec::new(),
                    sheet: None,
                    full_screen: None,
                }),
                dismiss_slot,
                lifetime,
                revision,
            }),
        };
        trace!(router = %router.id(), domain = D::DOMAIN, "router created");
        router
    }

    /// A fresh overlay router whose dismiss writes into `slot` of this router.
    fn child(&self, slot: OverlaySlot) -> Self {
        Self::build(
            Some(DismissSlot {
                parent: Rc::downgrade(&self.inner),
                slot,
            }),
            self.inner.lifetime.child_token(),
        )
    }

    pub fn id(&self) -> RouterId {
        self.inner.id
    }

    /// True for routers that were not created to host an overlay.
    pub fn is_root(&self) -> bool {
        self.inner.dismiss_slot.is_none()
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.lifetime.is_cancelled()
    }

    pub fn stack(&self) -> Vec<D> {
        self.inner.state.borrow().stack.clone()
    }

    pub fn depth(&self) -> usize {
        self.inner.state.borrow().stack.len()
    }

    pub fn top(&self) -> Option<D> {
        self.inner.state.borrow().stack.last().cloned()
    }

    pub fn sheet(&self) -> Option<D> {
        self.presented(OverlaySlot::Sheet)
    }

    pub fn full_screen_cover(&self) -> Option<D> {
        self.presented(OverlaySlot::FullScreenCover)
    }

    pub fn presented(&self, slot: OverlaySlot) -> Option<D> {
        self.inner
            .state
            .borrow()
            .slot(slot)
            .as_ref()
            .map(|p| p.destination.clone())
    }

    /// The overlay currently shown, if any. Sheets win over covers should both
    /// ever be set, which `route_to` never allows.
    pub fn overlay(&self) -> Option<(OverlaySlot, D)> {
        [OverlaySlot::Sheet, OverlaySlot::FullScreenCover]
            .into_iter()
            .find_map(|slot| self.presented(slot).map(|d| (slot, d)))
    }

    /// Router owned by the overlay in `slot`.
    pub fn overlay_router(&self, slot: OverlaySlot) -> Option<Router<D>> {
        self.inner
            .state
            .borrow()
            .slot(slot)
            .as_ref()
            .map(|p| p.router.clone())
    }

    pub fn is_presenting(&self) -> bool {
        let state = self.inner.state.borrow();
        state.sheet.is_some() || state.full_screen.is_some()
    }

    /// Subscribe to state changes. The value is a revision counter bumped on
    /// every observable mutation.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    pub fn downgrade(&self) -> WeakRouter<D> {
        WeakRouter {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub(crate) fn lifetime(&self) -> &CancellationToken {
        &self.inner.lifetime
    }

    /// Navigate to `destination` according to its intent.
    ///
    /// Any overlay this router presents is closed first, so a push from a
    /// screen below an overlay brings that screen back to the front.
    pub fn route_to(&self, destination: D) {
        if self.is_torn_down() {
            warn!(router = %self.id(), ?destination, "route_to on torn-down router ignored");
            return;
        }

        let closed = self.inner.state.borrow_mut().take_overlays();
        for presentation in &closed {
            debug!(
                router = %self.id(),
                closed = ?presentation.destination,
                "closing overlay before navigating"
            );
            presentation.router.tear_down();
        }

        let intent = destination.intent();
        match OverlaySlot::for_intent(intent) {
            None => {
                debug!(router = %self.id(), ?destination, "push");
                self.inner.state.borrow_mut().stack.push(destination);
            }
            Some(slot) => {
                let router = self.child(slot);
                debug!(router = %self.id(), child = %router.id(), %slot, ?destination, "present");
                *self.inner.state.borrow_mut().slot_mut(slot) = Some(Presentation {
                    destination,
                    router,
                });
            }
        }
        self.inner.touch();
    }

    /// Go back one step: pop the stack, else close the sheet, else close the
    /// cover, else close this router's own overlay in its presenter.
    pub fn dismiss(&self) -> DismissOutcome<D> {
        if self.is_torn_down() {
            warn!(router = %self.id(), "dismiss on torn-down router ignored");
            return DismissOutcome::Nothing;
        }

        enum Step<D: Destination> {
            Popped(D),
            Closed(OverlaySlot, Presentation<D>),
            Release,
        }

        let step = {
            let mut state = self.inner.state.borrow_mut();
            if let Some(top) = state.stack.pop() {
                Step::Popped(top)
            } else if let Some(p) = state.sheet.take() {
                Step::Closed(OverlaySlot::Sheet, p)
            } else if let Some(p) = state.full_screen.take() {
                Step::Closed(OverlaySlot::FullScreenCover, p)
            } else {
                Step::Release
            }
        };

        match step {
            Step::Popped(destination) => {
                debug!(router = %self.id(), ?destination, "pop");
                self.inner.touch();
                DismissOutcome::Popped(destination)
            }
            Step::Closed(slot, presentation) => {
                debug!(router = %self.id(), %slot, destination = ?presentation.destination, "close overlay");
                presentation.router.tear_down();
                self.inner.touch();
                DismissOutcome::ClosedOverlay {
                    slot,
                    destination: presentation.destination,
                }
            }
            Step::Release => match &self.inner.dismiss_slot {
                Some(slot) if slot.release(self.id()) => {
                    debug!(router = %self.id(), slot = %slot.slot, "overlay dismissed itself");
                    DismissOutcome::DismissedSelf
                }
                Some(_) => {
                    debug!(router = %self.id(), "presenter no longer shows this router");
                    DismissOutcome::Nothing
                }
                None => {
                    trace!(router = %self.id(), "dismiss on empty root router");
                    DismissOutcome::Nothing
                }
            },
        }
    }

    /// Empty the push stack. Overlays are left alone.
    pub fn pop_to_root(&self) {
        if self.is_torn_down() {
            warn!(router = %self.id(), "pop_to_root on torn-down router ignored");
            return;
        }
        let popped = {
            let mut state = self.inner.state.borrow_mut();
            let popped = state.stack.len();
            state.stack.clear();
            popped
        };
        if popped > 0 {
            debug!(router = %self.id(), popped, "pop to root");
            self.inner.touch();
        }
    }

    /// Content for `destination`, built with the router it should act on.
    pub fn view(&self, destination: &D) -> D::View {
        destination.view(&self.scoped_router(destination))
    }

    /// The router a destination's content receives: this router for pushes,
    /// the presented overlay's router if `destination` is currently presented,
    /// or a fresh overlay router otherwise.
    pub fn scoped_router(&self, destination: &D) -> Router<D> {
        let Some(slot) = OverlaySlot::for_intent(destination.intent()) else {
            return self.clone();
        };
        let presented = self
            .inner
            .state
            .borrow()
            .slot(slot)
            .as_ref()
            .filter(|p| &p.destination == destination)
            .map(|p| p.router.clone());
        presented.unwrap_or_else(|| self.child(slot))
    }

    /// Route to `destination` after `delay` unless this router is torn down
    /// first. Needs a running `LocalSet`.
    pub fn route_after(&self, delay: Duration, destination: D) -> ScheduledRoute {
        ScheduledRoute::spawn(self, delay, destination)
    }

    /// Invalidate this router and every overlay router below it.
    pub(crate) fn tear_down(&self) {
        if !self.inner.lifetime.is_cancelled() {
            debug!(router = %self.id(), domain = D::DOMAIN, "tearing down router");
            self.inner.lifetime.cancel();
        }
    }
}

/// Non-owning handle stored in the registry.
pub struct WeakRouter<D: Destination> {
    inner: Weak<RouterInner<D>>,
}

impl<D: Destination> Clone for WeakRouter<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<D: Destination> WeakRouter<D> {
    /// Upgrades to a live router. Torn-down routers count as gone.
    pub fn upgrade(&self) -> Option<Router<D>> {
        let inner = self.inner.upgrade()?;
        if inner.lifetime.is_cancelled() {
            return None;
        }
        Some(Router { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Screen;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_sequence_builds_stack_in_order() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Home);
        router.route_to(Screen::Detail(1));
        router.route_to(Screen::Detail(2));

        assert_eq!(
            router.stack(),
            vec![Screen::Home, Screen::Detail(1), Screen::Detail(2)]
        );
        assert_eq!(router.top(), Some(Screen::Detail(2)));
        assert_eq!(router.revision(), 3);
    }

    #[test]
    fn test_pop_to_root_clears_stack_but_keeps_overlay() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Detail(1));
        router.route_to(Screen::Detail(2));
        router.route_to(Screen::Settings);

        router.pop_to_root();

        assert!(router.stack().is_empty());
        assert_eq!(router.sheet(), Some(Screen::Settings));
    }

    #[test]
    fn test_pop_to_root_on_empty_stack_is_silent() {
        let router = Router::<Screen>::new();
        router.pop_to_root();
        assert_eq!(router.revision(), 0);
    }

    #[test]
    fn test_overlays_are_mutually_exclusive() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Player);
        let cover_router = router.overlay_router(OverlaySlot::FullScreenCover).unwrap();

        router.route_to(Screen::Settings);

        assert_eq!(router.full_screen_cover(), None);
        assert_eq!(router.sheet(), Some(Screen::Settings));
        assert!(cover_router.is_torn_down());
    }

    #[test]
    fn test_push_closes_presented_overlay() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Settings);
        router.route_to(Screen::Detail(7));

        assert!(!router.is_presenting());
        assert_eq!(router.stack(), vec![Screen::Detail(7)]);
    }

    #[test]
    fn test_dismiss_pops_before_closing_overlay() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Detail(1));
        router.route_to(Screen::Detail(2));
        router.route_to(Screen::Settings);

        assert_eq!(router.dismiss(), DismissOutcome::Popped(Screen::Detail(2)));
        assert_eq!(router.stack(), vec![Screen::Detail(1)]);
        assert_eq!(router.sheet(), Some(Screen::Settings));
    }

    #[test]
    fn test_dismiss_closes_sheet_when_stack_is_empty() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Settings);
        let sheet_router = router.overlay_router(OverlaySlot::Sheet).unwrap();

        assert_eq!(
            router.dismiss(),
            DismissOutcome::ClosedOverlay {
                slot: OverlaySlot::Sheet,
                destination: Screen::Settings,
            }
        );
        assert!(sheet_router.is_torn_down());
        assert!(!router.is_presenting());
    }

    #[test]
    fn test_dismiss_on_empty_root_is_noop() {
        let router = Router::<Screen>::new();
        assert_eq!(router.dismiss(), DismissOutcome::Nothing);
        assert_eq!(router.revision(), 0);
    }

    #[test]
    fn test_overlay_router_dismisses_itself() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Settings);
        let sheet_router = router.overlay_router(OverlaySlot::Sheet).unwrap();
        assert!(!sheet_router.is_root());

        assert_eq!(sheet_router.dismiss(), DismissOutcome::DismissedSelf);
        assert_eq!(router.sheet(), None);
        assert!(sheet_router.is_torn_down());
    }

    #[test]
    fn test_full_screen_router_dismisses_itself() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Player);
        let cover_router = router.overlay_router(OverlaySlot::FullScreenCover).unwrap();

        assert_eq!(cover_router.dismiss(), DismissOutcome::DismissedSelf);
        assert_eq!(router.full_screen_cover(), None);
    }

    #[test]
    fn test_overlay_router_pops_its_own_stack_first() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Settings);
        let sheet_router = router.overlay_router(OverlaySlot::Sheet).unwrap();
        sheet_router.route_to(Screen::Detail(3));

        assert_eq!(sheet_router.dismiss(), DismissOutcome::Popped(Screen::Detail(3)));
        assert_eq!(router.sheet(), Some(Screen::Settings));
    }

    #[test]
    fn test_stale_overlay_router_cannot_close_newer_presentation() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Settings);
        let first = router.overlay_router(OverlaySlot::Sheet).unwrap();
        router.route_to(Screen::Settings);
        let second = router.overlay_router(OverlaySlot::Sheet).unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(first.dismiss(), DismissOutcome::Nothing);
        assert_eq!(router.sheet(), Some(Screen::Settings));
        assert!(!second.is_torn_down());
    }

    #[test]
    fn test_torn_down_router_ignores_navigation() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Settings);
        let sheet_router = router.overlay_router(OverlaySlot::Sheet).unwrap();
        router.dismiss();

        sheet_router.route_to(Screen::Detail(1));
        assert!(sheet_router.stack().is_empty());
    }

    #[test]
    fn test_tear_down_cascades_to_nested_overlays() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Settings);
        let sheet_router = router.overlay_router(OverlaySlot::Sheet).unwrap();
        sheet_router.route_to(Screen::Player);
        let nested = sheet_router.overlay_router(OverlaySlot::FullScreenCover).unwrap();

        router.tear_down();

        assert!(sheet_router.is_torn_down());
        assert!(nested.is_torn_down());
        assert!(router.downgrade().upgrade().is_none());
    }

    #[test]
    fn test_scoped_router_per_intent() {
        let router = Router::<Screen>::new();
        router.route_to(Screen::Settings);
        let sheet_router = router.overlay_router(OverlaySlot::Sheet).unwrap();

        let (_, push_scope) = router.view(&Screen::Detail(1));
        let (code, sheet_scope) = router.view(&Screen::Settings);
        let (_, fresh_scope) = router.view(&Screen::Player);

        assert_eq!(push_scope, router.id());
        assert_eq!(code, "settings");
        assert_eq!(sheet_scope, sheet_router.id());
        assert_ne!(fresh_scope, router.id());
        assert_ne!(fresh_scope, sheet_router.id());
    }

    #[test]
    fn test_changes_receiver_sees_mutations() {
        let router = Router::<Screen>::new();
        let mut changes = router.changes();
        assert!(!changes.has_changed().unwrap());

        router.route_to(Screen::Home);
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), 1);
    }
}
