use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::router::Router;

/// How a destination is shown relative to the current screen.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NavigationIntent {
    /// Grow the back-stack of the current surface.
    Push,
    /// Present modally as a sheet above the stack.
    Sheet,
    /// Present modally covering the whole surface.
    FullScreenCover,
}

impl NavigationIntent {
    /// Returns true for intents that present an overlay with its own router.
    pub fn is_overlay(self) -> bool {
        !matches!(self, NavigationIntent::Push)
    }
}

/// A closed set of navigation targets belonging to one navigation domain.
///
/// Implementors are plain enums. The intent of every case is fixed by the
/// `intent` match and must not depend on runtime state.
pub trait Destination: Clone + Eq + Hash + fmt::Debug + 'static {
    /// Domain tag used as registry key and inside persisted pending actions.
    const DOMAIN: &'static str;

    /// Opaque renderable content produced for a destination.
    type View;

    fn intent(&self) -> NavigationIntent;

    /// Build the content for this destination. `router` is already scoped:
    /// the presenting router for pushes, the overlay's own router otherwise.
    fn view(&self, router: &Router<Self>) -> Self::View;

    /// Encode as `"<case-name>"` or `"<case-name>:<value>"`.
    fn encode(&self) -> String;

    /// Inverse of [`Destination::encode`]. Unknown case names yield `None`.
    fn decode(raw: &str) -> Option<Self>;
}

/// Borrowed view of the `"<case>:<value>"` route encoding.
///
/// Only the first `:` separates case and value, so values may contain colons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteCode<'a> {
    pub case: &'a str,
    pub value: Option<&'a str>,
}

impl<'a> RouteCode<'a> {
    pub fn new(case: &'a str, value: Option<&'a str>) -> Self {
        Self { case, value }
    }

    pub fn bare(case: &'a str) -> Self {
        Self { case, value: None }
    }

    /// Split a raw route string. Returns `None` for an empty case name.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let (case, value) = match raw.split_once(':') {
            Some((case, value)) => (case, Some(value)),
            None => (raw, None),
        };
        let case = case.trim();
        if case.is_empty() {
            return None;
        }
        Some(Self { case, value })
    }
}

impl fmt::Display for RouteCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "{}:{}", self.case, value),
            None => f.write_str(self.case),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_bare_case() {
        let code = RouteCode::parse("community").unwrap();
        assert_eq!(code, RouteCode::bare("community"));
    }

    #[test]
    fn test_parse_keeps_colons_in_value() {
        let code = RouteCode::parse("forgot_password:odd:mail@example.com").unwrap();
        assert_eq!(code.case, "forgot_password");
        assert_eq!(code.value, Some("odd:mail@example.com"));
    }

    #[test]
    fn test_parse_empty_value_is_present_but_empty() {
        let code = RouteCode::parse("forgot_password:").unwrap();
        assert_eq!(code.value, Some(""));
    }

    #[test]
    fn test_parse_rejects_missing_case() {
        assert!(RouteCode::parse("").is_none());
        assert!(RouteCode::parse(":value").is_none());
    }

    #[test]
    fn test_display_matches_encoding() {
        assert_eq!(
            RouteCode::new("forgot_password", Some("a@b.c")).to_string(),
            "forgot_password:a@b.c"
        );
        assert_eq!(RouteCode::bare("home").to_string(), "home");
    }

    #[test]
    fn test_only_push_is_not_an_overlay() {
        let overlays: Vec<_> = NavigationIntent::iter().filter(|i| i.is_overlay()).collect();
        assert_eq!(
            overlays,
            vec![NavigationIntent::Sheet, NavigationIntent::FullScreenCover]
        );
        assert_eq!(NavigationIntent::FullScreenCover.to_string(), "full_screen_cover");
    }
}
