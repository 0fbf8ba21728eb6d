//! The two navigation domains of the shell and the screens they render.

use std::fmt;
use std::str::FromStr;

use navigation::{Destination, NavigationIntent, RouteCode, Router, RouterId};
use strum::{AsRefStr, Display, EnumString};

/// Renderable content for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub title: String,
    pub subtitle: Option<String>,
    /// Router the screen's buttons act on.
    pub router: RouterId,
}

impl Screen {
    pub fn new(title: impl Into<String>, router: &Router<impl Destination>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            router: router.id(),
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        if let Some(subtitle) = &self.subtitle {
            write!(f, " ({subtitle})")?;
        }
        write!(f, "  [{}]", self.router)
    }
}

/// Screens reachable while signed out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Unauthorized {
    Splash,
    Login,
    ForgotPassword { email: String },
    Registration,
}

impl Destination for Unauthorized {
    const DOMAIN: &'static str = "unauthorized";

    type View = Screen;

    fn intent(&self) -> NavigationIntent {
        NavigationIntent::Push
    }

    fn view(&self, router: &Router<Self>) -> Screen {
        match self {
            Unauthorized::Splash => Screen::new("Splash", router),
            Unauthorized::Login => Screen::new("Login", router),
            Unauthorized::ForgotPassword { email } => {
                Screen::new("Forgot password", router).with_subtitle(email.clone())
            }
            Unauthorized::Registration => Screen::new("Registration", router),
        }
    }

    fn encode(&self) -> String {
        match self {
            Unauthorized::ForgotPassword { email } => {
                RouteCode::new(self.as_ref(), Some(email)).to_string()
            }
            _ => RouteCode::bare(self.as_ref()).to_string(),
        }
    }

    fn decode(raw: &str) -> Option<Self> {
        let code = RouteCode::parse(raw)?;
        match code.case {
            "splash" => Some(Unauthorized::Splash),
            "login" => Some(Unauthorized::Login),
            "forgot_password" => Some(Unauthorized::ForgotPassword {
                email: code.value.unwrap_or_default().to_string(),
            }),
            "registration" => Some(Unauthorized::Registration),
            _ => None,
        }
    }
}

/// Screens reachable while signed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Authorized {
    Home,
    Community,
    Profile,
    Notice { id: u32 },
}

impl Destination for Authorized {
    const DOMAIN: &'static str = "authorized";

    type View = Screen;

    fn intent(&self) -> NavigationIntent {
        match self {
            Authorized::Home | Authorized::Community => NavigationIntent::Push,
            Authorized::Profile => NavigationIntent::Sheet,
            Authorized::Notice { .. } => NavigationIntent::FullScreenCover,
        }
    }

    fn view(&self, router: &Router<Self>) -> Screen {
        match self {
            Authorized::Home => Screen::new("Home", router),
            Authorized::Community => Screen::new("Community", router),
            Authorized::Profile => Screen::new("Profile", router),
            Authorized::Notice { id } => Screen::new("Notice", router).with_subtitle(format!("#{id}")),
        }
    }

    fn encode(&self) -> String {
        match self {
            Authorized::Notice { id } => RouteCode::new(self.as_ref(), Some(&id.to_string())).to_string(),
            _ => RouteCode::bare(self.as_ref()).to_string(),
        }
    }

    fn decode(raw: &str) -> Option<Self> {
        let code = RouteCode::parse(raw)?;
        match code.case {
            "home" => Some(Authorized::Home),
            "community" => Some(Authorized::Community),
            "profile" => Some(Authorized::Profile),
            "notice" => code.value?.parse().ok().map(|id| Authorized::Notice { id }),
            _ => None,
        }
    }
}

/// Domain part of a deep link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Domain {
    Unauthorized,
    Authorized,
}

/// A decoded `<domain>/<route>` link, e.g. `authorized/notice:7`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    Unauthorized(Unauthorized),
    Authorized(Authorized),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("expected <domain>/<route>, got {0:?}")]
    Malformed(String),
    #[error("unknown domain {0:?}")]
    UnknownDomain(String),
    #[error("unknown route {route:?} in domain {domain}")]
    UnknownRoute { domain: Domain, route: String },
}

impl DeepLink {
    pub fn domain(&self) -> Domain {
        match self {
            DeepLink::Unauthorized(_) => Domain::Unauthorized,
            DeepLink::Authorized(_) => Domain::Authorized,
        }
    }

    pub fn parse_route(domain: Domain, route: &str) -> Result<Self, LinkError> {
        let unknown = || LinkError::UnknownRoute {
            domain,
            route: route.to_string(),
        };
        match domain {
            Domain::Unauthorized => Unauthorized::decode(route).map(DeepLink::Unauthorized).ok_or_else(unknown),
            Domain::Authorized => Authorized::decode(route).map(DeepLink::Authorized).ok_or_else(unknown),
        }
    }
}

impl FromStr for DeepLink {
    type Err = LinkError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (domain, route) = raw
            .trim()
            .split_once('/')
            .ok_or_else(|| LinkError::Malformed(raw.to_string()))?;
        let domain = Domain::from_str(domain).map_err(|_| LinkError::UnknownDomain(domain.to_string()))?;
        Self::parse_route(domain, route)
    }
}

impl fmt::Display for DeepLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeepLink::Unauthorized(d) => write!(f, "{}/{}", self.domain(), d.encode()),
            DeepLink::Authorized(d) => write!(f, "{}/{}", self.domain(), d.encode()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_forgot_password_keeps_email() {
        let dest = Unauthorized::ForgotPassword {
            email: "a:b@example.com".into(),
        };
        assert_eq!(dest.encode(), "forgot_password:a:b@example.com");
        assert_eq!(Unauthorized::decode(&dest.encode()), Some(dest));
    }

    #[test]
    fn test_unknown_cases_decode_to_none() {
        assert_eq!(Unauthorized::decode("dashboard"), None);
        assert_eq!(Authorized::decode("notice:abc"), None);
    }

    #[test]
    fn test_intents() {
        assert_eq!(Authorized::Community.intent(), NavigationIntent::Push);
        assert_eq!(Authorized::Profile.intent(), NavigationIntent::Sheet);
        assert_eq!(
            Authorized::Notice { id: 1 }.intent(),
            NavigationIntent::FullScreenCover
        );
        assert_eq!(Unauthorized::Registration.intent(), NavigationIntent::Push);
    }

    #[test]
    fn test_parse_deep_link() {
        let link: DeepLink = "authorized/notice:7".parse().unwrap();
        assert_eq!(link, DeepLink::Authorized(Authorized::Notice { id: 7 }));
        assert_eq!(link.to_string(), "authorized/notice:7");
    }

    #[test]
    fn test_parse_deep_link_errors() {
        assert_eq!(
            "community".parse::<DeepLink>(),
            Err(LinkError::Malformed("community".into()))
        );
        assert_eq!(
            "admin/home".parse::<DeepLink>(),
            Err(LinkError::UnknownDomain("admin".into()))
        );
        assert!(matches!(
            "authorized/login".parse::<DeepLink>(),
            Err(LinkError::UnknownRoute { domain: Domain::Authorized, .. })
        ));
    }
}
