//! Live routers by domain.
//!
//! The registry stores weak handles only. A slot remembers which surface
//! published it, and only that surface can clear it again.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::destination::Destination;
use crate::router::{Router, WeakRouter};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one mounted surface instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn next() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

struct Slot {
    surface: SurfaceId,
    router: Box<dyn Any>,
}

/// Shared handle to the per-domain router table.
#[derive(Clone, Default)]
pub struct RouterRegistry {
    slots: Rc<RefCell<HashMap<&'static str, Slot>>>,
}

impl fmt::Debug for RouterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.borrow();
        let mut map = f.debug_map();
        for (domain, slot) in slots.iter() {
            map.entry(domain, &slot.surface);
        }
        map.finish()
    }
}

impl RouterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `router` as the live router of `D::DOMAIN`. Last write wins.
    pub fn register<D: Destination>(&self, surface: SurfaceId, router: &Router<D>) {
        let previous = self.slots.borrow_mut().insert(
            D::DOMAIN,
            Slot {
                surface,
                router: Box::new(router.downgrade()),
            },
        );
        match previous {
            Some(prev) if prev.surface != surface => {
                debug!(domain = D::DOMAIN, %surface, replaced = %prev.surface, "router registration replaced");
            }
            _ => debug!(domain = D::DOMAIN, %surface, router = %router.id(), "router registered"),
        }
    }

    /// Clear the slot of `D::DOMAIN` if `surface` still owns it.
    pub fn deregister<D: Destination>(&self, surface: SurfaceId) -> bool {
        let mut slots = self.slots.borrow_mut();
        match slots.get(D::DOMAIN) {
            Some(slot) if slot.surface == surface => {
                slots.remove(D::DOMAIN);
                debug!(domain = D::DOMAIN, %surface, "router deregistered");
                true
            }
            Some(slot) => {
                debug!(
                    domain = D::DOMAIN,
                    %surface,
                    owner = %slot.surface,
                    "stale deregistration ignored"
                );
                false
            }
            None => false,
        }
    }

    /// The live router of `D::DOMAIN`, if one is registered and not torn down.
    pub fn router<D: Destination>(&self) -> Option<Router<D>> {
        let slots = self.slots.borrow();
        let slot = slots.get(D::DOMAIN)?;
        match slot.router.downcast_ref::<WeakRouter<D>>() {
            Some(weak) => weak.upgrade(),
            None => {
                warn!(domain = D::DOMAIN, "registered router has a different destination type");
                None
            }
        }
    }

    pub fn is_registered<D: Destination>(&self) -> bool {
        self.router::<D>().is_some()
    }

    /// Surface currently owning the slot of `D::DOMAIN`.
    pub fn surface<D: Destination>(&self) -> Option<SurfaceId> {
        self.slots.borrow().get(D::DOMAIN).map(|slot| slot.surface)
    }

    pub fn domains(&self) -> Vec<&'static str> {
        let mut domains: Vec<_> = self.slots.borrow().keys().copied().collect();
        domains.sort_unstable();
        domains
    }
}
