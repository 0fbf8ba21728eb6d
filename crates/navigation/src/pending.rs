//! The single persisted slot for a deep link that could not be routed yet.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::destination::Destination;
use crate::error::StorageResult;
use crate::storage::KeyValueStore;

/// Persisted form of a deferred navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub domain: String,
    pub route: String,
}

impl PendingAction {
    pub fn for_destination<D: Destination>(destination: &D) -> Self {
        Self {
            domain: D::DOMAIN.to_string(),
            route: destination.encode(),
        }
    }
}

/// At-most-one deferred destination, consumed exactly once.
#[derive(Clone)]
pub struct PendingActionStore {
    storage: Arc<dyn KeyValueStore>,
    key: String,
}

impl std::fmt::Debug for PendingActionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingActionStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl PendingActionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persist `destination`, replacing whatever was pending.
    pub fn set<D: Destination>(&self, destination: &D) -> StorageResult<()> {
        let action = PendingAction::for_destination(destination);
        let raw = serde_json::to_string(&action)?;
        self.storage.set(&self.key, &raw)?;
        debug!(domain = D::DOMAIN, route = %action.route, "pending action stored");
        Ok(())
    }

    /// The stored record without clearing it. Unreadable records read as absent.
    pub fn peek(&self) -> StorageResult<Option<PendingAction>> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(action) => Ok(Some(action)),
            Err(err) => {
                warn!(error = %err, "unreadable pending action");
                Ok(None)
            }
        }
    }

    /// Whether the slot holds a record of domain `D`. Unparseable records are
    /// cleared.
    pub fn holds<D: Destination>(&self) -> StorageResult<bool> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(false);
        };
        match serde_json::from_str::<PendingAction>(&raw) {
            Ok(action) => Ok(action.domain == D::DOMAIN),
            Err(err) => {
                warn!(error = %err, "discarding unreadable pending action");
                self.storage.remove(&self.key)?;
                Ok(false)
            }
        }
    }

    /// Take the pending destination of domain `D`.
    ///
    /// The slot is cleared before the destination is returned. A record of a
    /// different domain is left in place. Records that cannot be parsed or
    /// decoded are cleared and read as absent.
    pub fn consume<D: Destination>(&self) -> StorageResult<Option<D>> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(None);
        };
        let action: PendingAction = match serde_json::from_str(&raw) {
            Ok(action) => action,
            Err(err) => {
                warn!(error = %err, "discarding unreadable pending action");
                self.storage.remove(&self.key)?;
                return Ok(None);
            }
        };
        if action.domain != D::DOMAIN {
            debug!(
                pending = %action.domain,
                requested = D::DOMAIN,
                "pending action belongs to another domain"
            );
            return Ok(None);
        }

        self.storage.remove(&self.key)?;
        let destination = D::decode(&action.route);
        if destination.is_none() {
            warn!(domain = D::DOMAIN, route = %action.route, "discarding undecodable pending action");
        }
        Ok(destination)
    }

    pub fn clear(&self) -> StorageResult<()> {
        self.storage.remove(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_support::{Gate, Screen};
    use pretty_assertions::assert_eq;

    fn store() -> (Arc<MemoryStore>, PendingActionStore) {
        let backend = Arc::new(MemoryStore::new());
        let pending = PendingActionStore::new(backend.clone(), "pending");
        (backend, pending)
    }

    #[test]
    fn test_consume_yields_once() {
        let (_, pending) = store();
        pending.set(&Screen::Detail(9)).unwrap();

        assert_eq!(pending.consume::<Screen>().unwrap(), Some(Screen::Detail(9)));
        assert_eq!(pending.consume::<Screen>().unwrap(), None);
    }

    #[test]
    fn test_last_write_wins() {
        let (_, pending) = store();
        pending.set(&Screen::Home).unwrap();
        pending.set(&Screen::Settings).unwrap();

        assert_eq!(pending.consume::<Screen>().unwrap(), Some(Screen::Settings));
    }

    #[test]
    fn test_record_format() {
        let (backend, pending) = store();
        pending.set(&Screen::Detail(3)).unwrap();

        let raw = backend.get("pending").unwrap().unwrap();
        let action: PendingAction = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            action,
            PendingAction {
                domain: "test".into(),
                route: "detail:3".into(),
            }
        );
        assert_eq!(pending.peek().unwrap(), Some(action));
    }

    #[test]
    fn test_other_domain_is_left_in_place() {
        let (_, pending) = store();
        pending.set(&Gate::Login).unwrap();

        assert_eq!(pending.consume::<Screen>().unwrap(), None);
        assert_eq!(pending.consume::<Gate>().unwrap(), Some(Gate::Login));
    }

    #[test]
    fn test_unknown_case_is_cleared_as_absent() {
        let (backend, pending) = store();
        backend
            .set("pending", r#"{"domain":"test","route":"gone:1"}"#)
            .unwrap();

        assert_eq!(pending.consume::<Screen>().unwrap(), None);
        assert_eq!(backend.get("pending").unwrap(), None);
    }

    #[test]
    fn test_malformed_record_is_cleared() {
        let (backend, pending) = store();
        backend.set("pending", "not json").unwrap();

        assert_eq!(pending.peek().unwrap(), None);
        assert_eq!(pending.consume::<Screen>().unwrap(), None);
        assert_eq!(backend.get("pending").unwrap(), None);
    }

    #[test]
    fn test_holds_checks_domain_without_consuming() {
        let (backend, pending) = store();
        assert!(!pending.holds::<Screen>().unwrap());

        pending.set(&Gate::Login).unwrap();
        assert!(!pending.holds::<Screen>().unwrap());
        assert!(pending.holds::<Gate>().unwrap());
        assert!(backend.get("pending").unwrap().is_some());

        backend.set("pending", "not json").unwrap();
        assert!(!pending.holds::<Gate>().unwrap());
        assert_eq!(backend.get("pending").unwrap(), None);
    }
}
