use std::fmt;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::destination::Destination;
use crate::registry::{RouterRegistry, SurfaceId};
use crate::router::{OverlaySlot, Router};

type RootContent<D> = Box<dyn Fn(&Router<D>) -> <D as Destination>::View>;

/// One rendered layer: the stack top (or root content) plus the overlay
/// shown above it, itself rendered through the overlay's router.
pub struct SurfaceFrame<D: Destination> {
    pub base: D::View,
    pub overlay: Option<OverlayFrame<D>>,
}

pub struct OverlayFrame<D: Destination> {
    pub slot: OverlaySlot,
    pub destination: D,
    pub content: Box<SurfaceFrame<D>>,
}

impl<D: Destination> fmt::Debug for SurfaceFrame<D>
where
    D::View: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceFrame")
            .field("base", &self.base)
            .field("overlay", &self.overlay)
            .finish()
    }
}

impl<D: Destination> fmt::Debug for OverlayFrame<D>
where
    D::View: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayFrame")
            .field("slot", &self.slot)
            .field("destination", &self.destination)
            .field("content", &self.content)
            .finish()
    }
}

impl<D: Destination> SurfaceFrame<D> {
    /// Number of stacked layers, counting the base.
    pub fn layers(&self) -> usize {
        1 + self.overlay.as_ref().map_or(0, |o| o.content.layers())
    }

    /// The innermost layer, i.e. what the user currently looks at.
    pub fn front(&self) -> &D::View {
        match &self.overlay {
            Some(overlay) => overlay.content.front(),
            None => &self.base,
        }
    }
}

/// Rendering container for one domain's root router.
///
/// While mounted the router is published in the registry. Unmounting
/// deregisters first and then tears the router down, which cancels every
/// timer still scheduled against it. A surface is mounted at most once.
pub struct RoutingSurface<D: Destination> {
    id: SurfaceId,
    router: Router<D>,
    registry: RouterRegistry,
    root: RootContent<D>,
    mounted: bool,
}

impl<D: Destination> fmt::Debug for RoutingSurface<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingSurface")
            .field("id", &self.id)
            .field("domain", &D::DOMAIN)
            .field("router", &self.router)
            .field("mounted", &self.mounted)
            .finish()
    }
}

impl<D: Destination> RoutingSurface<D> {
    /// `root` renders the domain's root content when the stack is empty.
    pub fn new(registry: RouterRegistry, root: impl Fn(&Router<D>) -> D::View + 'static) -> Self {
        Self {
            id: SurfaceId::next(),
            router: Router::new(),
            registry,
            root: Box::new(root),
            mounted: false,
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn router(&self) -> &Router<D> {
        &self.router
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn changes(&self) -> watch::Receiver<u64> {
        self.router.changes()
    }

    /// Publish the router. Returns false if the surface was already unmounted.
    pub fn mount(&mut self) -> bool {
        if self.mounted {
            return true;
        }
        if self.router.is_torn_down() {
            warn!(surface = %self.id, domain = D::DOMAIN, "cannot remount an unmounted surface");
            return false;
        }
        self.registry.register(self.id, &self.router);
        self.mounted = true;
        info!(surface = %self.id, domain = D::DOMAIN, router = %self.router.id(), "surface mounted");
        true
    }

    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.registry.deregister::<D>(self.id);
        self.router.tear_down();
        self.mounted = false;
        info!(surface = %self.id, domain = D::DOMAIN, "surface unmounted");
    }

    pub fn render(&self) -> SurfaceFrame<D> {
        compose(&self.router, &*self.root)
    }
}

impl<D: Destination> Drop for RoutingSurface<D> {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn compose<D: Destination>(router: &Router<D>, root: &dyn Fn(&Router<D>) -> D::View) -> SurfaceFrame<D> {
    let base = match router.top() {
        Some(top) => router.view(&top),
        None => root(router),
    };
    let overlay = router.overlay().and_then(|(slot, destination)| {
        let child = router.overlay_router(slot)?;
        let content = compose(&child, &|_: &Router<D>| router.view(&destination));
        Some(OverlayFrame {
            slot,
            destination,
            content: Box::new(content),
        })
    });
    SurfaceFrame { base, overlay }
}
