//! Generation-tagged response cache.
//!
//! Namespaces are named caches, each tagged with the generation that
//! created it. The cache is response storage only; it never holds
//! domain records, those belong to the durable store.

use parking_lot::RwLock;
use std::collections::HashMap;
use storyhub_api::{HttpRequest, HttpResponse};
use tracing::debug;

/// Normalized lookup key for a cached response.
///
/// The method is uppercased and any URL fragment is stripped, so
/// `GET https://x/app.css#dark` and `get https://x/app.css` hit the
/// same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: String,
    url: String,
}

impl CacheKey {
    /// Creates a normalized key.
    #[must_use]
    pub fn new(method: &str, url: &str) -> Self {
        let url = url.split_once('#').map_or(url, |(before, _)| before);
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
        }
    }

    /// Returns the normalized URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl From<&HttpRequest> for CacheKey {
    fn from(request: &HttpRequest) -> Self {
        Self::new(request.method.as_str(), &request.url)
    }
}

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    /// HTTP status of the captured response.
    pub status: u16,
    /// Captured headers.
    pub headers: Vec<(String, String)>,
    /// Captured body.
    pub body: Vec<u8>,
}

impl From<&HttpResponse> for CachedResponse {
    fn from(response: &HttpResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
        }
    }
}

impl From<CachedResponse> for HttpResponse {
    fn from(cached: CachedResponse) -> Self {
        HttpResponse {
            status: cached.status,
            headers: cached.headers,
            body: cached.body,
        }
    }
}

#[derive(Debug, Default)]
struct Namespace {
    generation: String,
    entries: HashMap<CacheKey, CachedResponse>,
}

/// Named response caches, each tagged with its creating generation.
#[derive(Debug, Default)]
pub struct CacheStore {
    namespaces: RwLock<HashMap<String, Namespace>>,
}

impl CacheStore {
    /// Creates an empty cache store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a namespace exists with the given generation tag.
    /// An existing namespace keeps its entries and tag.
    pub fn open(&self, name: &str, generation: &str) {
        self.namespaces
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Namespace {
                generation: generation.to_string(),
                entries: HashMap::new(),
            });
    }

    /// Looks up a cached response.
    #[must_use]
    pub fn get(&self, namespace: &str, key: &CacheKey) -> Option<CachedResponse> {
        self.namespaces
            .read()
            .get(namespace)?
            .entries
            .get(key)
            .cloned()
    }

    /// Stores one response. A miss on the namespace is a silent no-op;
    /// captures are fire-and-forget by design of the callers.
    pub fn put(&self, namespace: &str, key: CacheKey, response: CachedResponse) {
        let mut namespaces = self.namespaces.write();
        match namespaces.get_mut(namespace) {
            Some(ns) => {
                ns.entries.insert(key, response);
            }
            None => debug!(namespace, "capture dropped: namespace not open"),
        }
    }

    /// Stores a batch of responses under one write lock, so a reader
    /// sees either none of the batch or all of it.
    pub fn put_batch(&self, namespace: &str, entries: Vec<(CacheKey, CachedResponse)>) {
        let mut namespaces = self.namespaces.write();
        if let Some(ns) = namespaces.get_mut(namespace) {
            for (key, response) in entries {
                ns.entries.insert(key, response);
            }
        }
    }

    /// Removes every namespace whose generation tag differs from the
    /// given one. Never touches the durable store.
    pub fn purge_stale(&self, generation: &str) -> usize {
        let mut namespaces = self.namespaces.write();
        let before = namespaces.len();
        namespaces.retain(|name, ns| {
            let keep = ns.generation == generation;
            if !keep {
                debug!(namespace = %name, stale = %ns.generation, "purging");
            }
            keep
        });
        before - namespaces.len()
    }

    /// Returns the names of the live namespaces.
    #[must_use]
    pub fn namespace_names(&self) -> Vec<String> {
        self.namespaces.read().keys().cloned().collect()
    }

    /// Returns the number of entries in a namespace.
    #[must_use]
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .get(namespace)
            .map_or(0, |ns| ns.entries.len())
    }

    /// Returns true if the namespace is missing or empty.
    #[must_use]
    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }
}
