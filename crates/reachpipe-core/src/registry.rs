//! Adapter registry and URL router.
//!
//! Registration order encodes specificity: `can_handle` predicates are
//! host-substring checks, so narrower adapters must be registered before
//! broader ones. The universal fallback is held separately and consulted
//! only after every specific adapter has declined.

use crate::{Adapter, Error, Result};
use std::sync::Arc;

pub struct Registry {
    adapters: Vec<Arc<dyn Adapter>>,
    fallback: Arc<dyn Adapter>,
}

impl Registry {
    pub fn new(fallback: Arc<dyn Adapter>) -> Self {
        Self {
            adapters: Vec::new(),
            fallback,
        }
    }

    /// Register a specific adapter. Names are unique across the registry,
    /// including the fallback's.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) -> Result<()> {
        let name = adapter.name();
        if name == self.fallback.name() || self.adapters.iter().any(|a| a.name() == name) {
            return Err(Error::Registry(format!("duplicate adapter name: {name}")));
        }
        self.adapters.push(adapter);
        Ok(())
    }

    /// Select the adapter for a URL. The first specific adapter (in
    /// registration order) whose predicate matches wins; anything else —
    /// including empty or unparsable input — routes to the universal
    /// fallback. Never absent.
    pub fn route(&self, url: &str) -> Arc<dyn Adapter> {
        if url.trim().is_empty() || url::Url::parse(url).is_err() {
            return Arc::clone(&self.fallback);
        }
        for adapter in &self.adapters {
            if adapter.can_handle(url) {
                return Arc::clone(adapter);
            }
        }
        Arc::clone(&self.fallback)
    }

    /// Direct lookup by unique key. Absent is a valid outcome.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        if self.fallback.name() == name {
            return Some(Arc::clone(&self.fallback));
        }
        self.adapters
            .iter()
            .find(|a| a.name() == name)
            .map(Arc::clone)
    }

    /// All adapters in registration order, fallback last.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Adapter>> {
        self.adapters.iter().chain(std::iter::once(&self.fallback))
    }

    /// Number of adapters including the fallback; never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.adapters.len() + 1
    }

    pub fn fallback(&self) -> Arc<dyn Adapter> {
        Arc::clone(&self.fallback)
    }
}
