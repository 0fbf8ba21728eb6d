//! Small destination set shared by the unit tests of this crate.

use strum::AsRefStr;

use crate::destination::{Destination, NavigationIntent, RouteCode};
use crate::router::{Router, RouterId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Screen {
    Home,
    Detail(u32),
    Settings,
    Player,
}

impl Destination for Screen {
    const DOMAIN: &'static str = "test";

    type View = (String, RouterId);

    fn intent(&self) -> NavigationIntent {
        match self {
            Screen::Home | Screen::Detail(_) => NavigationIntent::Push,
            Screen::Settings => NavigationIntent::Sheet,
            Screen::Player => NavigationIntent::FullScreenCover,
        }
    }

    fn view(&self, router: &Router<Self>) -> Self::View {
        (self.encode(), router.id())
    }

    fn encode(&self) -> String {
        match self {
            Screen::Detail(id) => RouteCode::new(self.as_ref(), Some(&id.to_string())).to_string(),
            _ => RouteCode::bare(self.as_ref()).to_string(),
        }
    }

    fn decode(raw: &str) -> Option<Self> {
        let code = RouteCode::parse(raw)?;
        match code.case {
            "home" => Some(Screen::Home),
            "detail" => code.value?.parse().ok().map(Screen::Detail),
            "settings" => Some(Screen::Settings),
            "player" => Some(Screen::Player),
            _ => None,
        }
    }
}

/// A second domain, used to check that domains do not interfere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Gate {
    Login,
}

impl Destination for Gate {
    const DOMAIN: &'static str = "gate";

    type View = &'static str;

    fn intent(&self) -> NavigationIntent {
        NavigationIntent::Push
    }

    fn view(&self, _router: &Router<Self>) -> Self::View {
        "login"
    }

    fn encode(&self) -> String {
        RouteCode::bare(self.as_ref()).to_string()
    }

    fn decode(raw: &str) -> Option<Self> {
        match RouteCode::parse(raw)?.case {
            "login" => Some(Gate::Login),
            _ => None,
        }
    }
}
