//! Responder registry
//!
//! Holds the registered responders in insertion order. Registration order is
//! the deterministic tie-break used by the router when confidences are equal.

use std::sync::Arc;

use tracing::debug;

use super::{Responder, ResponderStatus};

/// Insertion-ordered collection of registered responders.
#[derive(Default)]
pub struct ResponderRegistry {
    responders: Vec<Arc<dyn Responder>>,
}

impl ResponderRegistry {
    pub fn new() -> Self {
        Self {
            responders: Vec::new(),
        }
    }

    /// Register a responder. A duplicate id replaces the earlier entry in
    /// place, keeping its registration position.
    pub fn register(&mut self, responder: Arc<dyn Responder>) {
        if let Some(existing) = self
            .responders
            .iter_mut()
            .find(|r| r.id() == responder.id())
        {
            debug!(id = responder.id(), "Replacing registered responder");
            *existing = responder;
            return;
        }
        debug!(id = responder.id(), domain = responder.domain(), "Responder registered");
        self.responders.push(responder);
    }

    /// Look up a responder by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Responder>> {
        self.responders.iter().find(|r| r.id() == id).cloned()
    }

    /// Iterate responders in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Responder>> {
        self.responders.iter()
    }

    pub fn len(&self) -> usize {
        self.responders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responders.is_empty()
    }

    /// Status snapshots of all registered responders, in registration order.
    pub fn statuses(&self) -> Vec<ResponderStatus> {
        self.responders.iter().map(|r| r.status()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::{FixedRelevance, KeywordResponder};

    fn responder(id: &str, domain: &str) -> Arc<dyn Responder> {
        Arc::new(KeywordResponder::new(id, domain, Box::new(FixedRelevance(0.8))))
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let mut registry = ResponderRegistry::new();
        registry.register(responder("fin", "financial"));
        registry.register(responder("mkt", "marketing"));
        registry.register(responder("ops", "operations"));

        let ids: Vec<&str> = registry.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["fin", "mkt", "ops"]);
    }

    #[test]
    fn test_duplicate_id_replaces_in_place() {
        let mut registry = ResponderRegistry::new();
        registry.register(responder("fin", "financial"));
        registry.register(responder("mkt", "marketing"));
        registry.register(responder("fin", "finance_v2"));

        assert_eq!(registry.len(), 2);
        let ids: Vec<&str> = registry.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["fin", "mkt"]);
        assert_eq!(registry.get("fin").unwrap().domain(), "finance_v2");
    }

    #[test]
    fn test_get_missing_returns_none() {
        let registry = ResponderRegistry::new();
        assert!(registry.get("nobody").is_none());
        assert!(registry.is_empty());
    }
}
