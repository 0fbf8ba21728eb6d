//! Session-driven root of the application.
//!
//! Exactly one domain surface is mounted at a time. The signed-in flag picks
//! which one, and switching drops the previous surface before the next one
//! mounts so the registry never points at a router that is going away.

use std::fmt;

use navigation::{
    DeepLinkDispatcher, Delivery, Destination, DismissOutcome, PendingReplay, Router,
    RoutingSurface, ScheduledRoute, SurfaceFrame,
};
use strum::Display;
use tracing::{info, warn};

use crate::routes::{Authorized, DeepLink, Domain, LinkError, Screen, Unauthorized};

pub const OFFLINE_BANNER: &str = "No Internet Connection";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AppState {
    /// The session service has not answered yet.
    Unknown,
    Unauthorized,
    Authorized,
}

impl From<Option<bool>> for AppState {
    fn from(signed_in: Option<bool>) -> Self {
        match signed_in {
            None => AppState::Unknown,
            Some(false) => AppState::Unauthorized,
            Some(true) => AppState::Authorized,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("no screen is mounted yet")]
    NotMounted,
    #[error(transparent)]
    Link(#[from] LinkError),
}

enum ActiveSurface {
    Loading,
    Unauthorized(RoutingSurface<Unauthorized>),
    Authorized(RoutingSurface<Authorized>),
}

pub struct AppShell {
    dispatcher: DeepLinkDispatcher,
    state: AppState,
    active: ActiveSurface,
    online: bool,
}

/// Follow overlays down to the router of the screen in front.
fn front_router<D: Destination>(root: &Router<D>) -> Router<D> {
    let mut router = root.clone();
    while let Some((slot, _)) = router.overlay() {
        match router.overlay_router(slot) {
            Some(next) => router = next,
            None => break,
        }
    }
    router
}

fn navigate_in<D: Destination>(
    surface: &RoutingSurface<D>,
    domain: Domain,
    route: &str,
) -> Result<(), ShellError> {
    let destination = D::decode(route).ok_or_else(|| LinkError::UnknownRoute {
        domain,
        route: route.to_string(),
    })?;
    front_router(surface.router()).route_to(destination);
    Ok(())
}

fn describe<D: Destination>(outcome: DismissOutcome<D>) -> String {
    match outcome {
        DismissOutcome::Popped(d) => format!("popped {}", d.encode()),
        DismissOutcome::ClosedOverlay { slot, destination } => {
            format!("closed {slot} {}", destination.encode())
        }
        DismissOutcome::DismissedSelf => "closed overlay".to_string(),
        DismissOutcome::Nothing => "nothing to dismiss".to_string(),
    }
}

impl AppShell {
    pub fn new(dispatcher: DeepLinkDispatcher) -> Self {
        Self {
            dispatcher,
            state: AppState::Unknown,
            active: ActiveSurface::Loading,
            online: true,
        }
    }

    pub fn dispatcher(&self) -> &DeepLinkDispatcher {
        &self.dispatcher
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn unauthorized_router(&self) -> Option<&Router<Unauthorized>> {
        match &self.active {
            ActiveSurface::Unauthorized(surface) => Some(surface.router()),
            _ => None,
        }
    }

    pub fn authorized_router(&self) -> Option<&Router<Authorized>> {
        match &self.active {
            ActiveSurface::Authorized(surface) => Some(surface.router()),
            _ => None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn banner(&self) -> Option<&'static str> {
        (!self.online).then_some(OFFLINE_BANNER)
    }

    pub fn set_online(&mut self, online: bool) {
        if self.online == online {
            return;
        }
        self.online = online;
        if online {
            info!("connectivity restored");
        } else {
            warn!("connectivity lost");
        }
    }

    /// React to a session update. Returns the replay scheduled by the newly
    /// mounted surface, if any. Needs the UI thread's `LocalSet` once a
    /// pending action can be replayed.
    pub fn apply_session(&mut self, signed_in: Option<bool>) -> Option<ScheduledRoute> {
        let next = AppState::from(signed_in);
        if next == self.state {
            return None;
        }
        let previous = self.state;
        info!(from = %previous, to = %next, "app state changed");
        self.state = next;

        // Dropping the old surface deregisters and tears down its router.
        self.active = ActiveSurface::Loading;

        let registry = self.dispatcher.registry().clone();
        match next {
            AppState::Unknown => None,
            AppState::Unauthorized => {
                if previous == AppState::Authorized {
                    if let Err(err) = self.dispatcher.clear_pending() {
                        warn!(error = %err, "failed to clear pending action on sign-out");
                    }
                }
                let mut surface =
                    RoutingSurface::<Unauthorized>::new(registry, |router| Screen::new("Welcome", router));
                let replay = self.dispatcher.attach(&mut surface).map(PendingReplay::spawn);
                self.active = ActiveSurface::Unauthorized(surface);
                replay
            }
            AppState::Authorized => {
                let mut surface =
                    RoutingSurface::<Authorized>::new(registry, |router| Screen::new("Dashboard", router));
                let replay = self.dispatcher.attach(&mut surface).map(PendingReplay::spawn);
                self.active = ActiveSurface::Authorized(surface);
                replay
            }
        }
    }

    /// Replay the pending deep link into the mounted domain. Needs the UI
    /// thread's `LocalSet`.
    pub fn foreground(&self) -> Option<ScheduledRoute> {
        match &self.active {
            ActiveSurface::Loading => None,
            ActiveSurface::Unauthorized(_) => self.dispatcher.replay_pending::<Unauthorized>().map(PendingReplay::spawn),
            ActiveSurface::Authorized(_) => self.dispatcher.replay_pending::<Authorized>().map(PendingReplay::spawn),
        }
    }

    pub fn deliver(&self, link: DeepLink) -> Delivery {
        match link {
            DeepLink::Unauthorized(destination) => self.dispatcher.deliver(destination),
            DeepLink::Authorized(destination) => self.dispatcher.deliver(destination),
        }
    }

    /// Navigate from the front screen of the mounted domain.
    pub fn navigate(&self, route: &str) -> Result<(), ShellError> {
        match &self.active {
            ActiveSurface::Loading => Err(ShellError::NotMounted),
            ActiveSurface::Unauthorized(s) => navigate_in(s, Domain::Unauthorized, route),
            ActiveSurface::Authorized(s) => navigate_in(s, Domain::Authorized, route),
        }
    }

    /// Dismiss from the front screen.
    pub fn back(&self) -> Result<String, ShellError> {
        match &self.active {
            ActiveSurface::Loading => Err(ShellError::NotMounted),
            ActiveSurface::Unauthorized(s) => Ok(describe(front_router(s.router()).dismiss())),
            ActiveSurface::Authorized(s) => Ok(describe(front_router(s.router()).dismiss())),
        }
    }

    pub fn pop_to_root(&self) -> Result<(), ShellError> {
        match &self.active {
            ActiveSurface::Loading => Err(ShellError::NotMounted),
            ActiveSurface::Unauthorized(s) => {
                front_router(s.router()).pop_to_root();
                Ok(())
            }
            ActiveSurface::Authorized(s) => {
                front_router(s.router()).pop_to_root();
                Ok(())
            }
        }
    }

    /// Title of the screen the user is looking at.
    pub fn front_title(&self) -> Option<String> {
        match &self.active {
            ActiveSurface::Loading => None,
            ActiveSurface::Unauthorized(s) => Some(s.render().front().title.clone()),
            ActiveSurface::Authorized(s) => Some(s.render().front().title.clone()),
        }
    }
}

fn write_frame<D>(f: &mut fmt::Formatter<'_>, frame: &SurfaceFrame<D>, depth: usize) -> fmt::Result
where
    D: Destination<View = Screen>,
{
    let indent = "  ".repeat(depth);
    writeln!(f, "{indent}{}", frame.base)?;
    if let Some(overlay) = &frame.overlay {
        writeln!(f, "{indent}+ {} {}", overlay.slot, overlay.destination.encode())?;
        write_frame(f, &overlay.content, depth + 1)?;
    }
    Ok(())
}

fn write_surface<D>(f: &mut fmt::Formatter<'_>, surface: &RoutingSurface<D>) -> fmt::Result
where
    D: Destination<View = Screen>,
{
    let stack: Vec<String> = surface.router().stack().iter().map(|d| d.encode()).collect();
    if stack.is_empty() {
        writeln!(f, "[{}] stack: (root)", D::DOMAIN)?;
    } else {
        writeln!(f, "[{}] stack: {}", D::DOMAIN, stack.join(" > "))?;
    }
    write_frame(f, &surface.render(), 0)
}

impl fmt::Display for AppShell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.active {
            ActiveSurface::Loading => writeln!(f, "[loading]")?,
            ActiveSurface::Unauthorized(s) => write_surface(f, s)?,
            ActiveSurface::Authorized(s) => write_surface(f, s)?,
        }
        if let Some(banner) = self.banner() {
            writeln!(f, "! {banner}")?;
        }
        Ok(())
    }
}
