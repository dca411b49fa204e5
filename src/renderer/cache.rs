use std::{collections::HashMap, rc::Rc};

use tracing::{debug, error};

/// The state of a single named resource in a `ResourceCache`.
#[derive(Debug)]
pub enum CacheEntry<T> {
    /// The resource loaded and is shared with every requester.
    Loaded(Rc<T>),
    /// The resource failed to load. The failure is remembered so the loader is
    /// never invoked again for this name.
    Failed,
}

impl<T> CacheEntry<T> {
    /// Get a shared handle to the resource, or `None` if it failed to load.
    pub fn handle(&self) -> Option<Rc<T>> {
        match self {
            CacheEntry::Loaded(resource) => Some(resource.clone()),
            CacheEntry::Failed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CacheEntry::Failed)
    }
}

/// Loads named resources on demand and remembers the outcome.
///
/// The first request for a name calls the loader. Every later request for the
/// same name returns the remembered outcome, which is either the same shared
/// `Rc` or the failure sentinel.
#[derive(Debug)]
pub struct ResourceCache<T> {
    /// Human readable resource kind used in log messages (eg "shader").
    kind: &'static str,
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T> ResourceCache<T> {
    /// Create an empty cache for resources of the given `kind`.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    /// Return the cached resource for `name`, loading it with `loader` when the
    /// name has never been requested before.
    ///
    /// Load errors are logged and cached as `CacheEntry::Failed`.
    pub fn load_or_get<F>(&mut self, name: &str, loader: F) -> Option<Rc<T>>
    where
        F: FnOnce(&str) -> anyhow::Result<T>,
    {
        if let Some(entry) = self.entries.get(name) {
            return entry.handle();
        }

        let entry = match loader(name) {
            Ok(resource) => {
                debug!("loaded {} `{name}`", self.kind);
                CacheEntry::Loaded(Rc::new(resource))
            }
            Err(err) => {
                error!("failed to load {} `{name}`: {err:#}", self.kind);
                CacheEntry::Failed
            }
        };

        let handle = entry.handle();
        self.entries.insert(name.to_owned(), entry);

        handle
    }

    /// Get the cache entry for `name` without loading anything.
    pub fn entry(&self, name: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(name)
    }

    /// Get the loaded resource for `name` without loading anything.
    pub fn get(&self, name: &str) -> Option<Rc<T>> {
        self.entries.get(name).and_then(CacheEntry::handle)
    }

    /// Check if `name` was requested before and failed to load.
    pub fn is_failed(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(CacheEntry::is_failed)
    }

    /// Number of names in the cache, including failed ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry from the cache and return the loaded resources.
    pub fn drain_loaded(&mut self) -> Vec<(String, Rc<T>)> {
        self.entries
            .drain()
            .filter_map(|(name, entry)| entry.handle().map(|resource| (name, resource)))
            .collect()
    }
}
