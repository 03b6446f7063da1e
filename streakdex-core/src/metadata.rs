//! Reward display metadata: the consumed lookup contract plus an id-keyed cache.
//!
//! Lookups never fail loudly. A missing, timed out or rejected answer is
//! `None`, and the engine falls back to [`placeholder_name`].
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Resolves a reward id to display metadata.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn lookup(&self, id: u32) -> Option<ItemMetadata>;
}

/// Display name used until (or instead of) a successful lookup.
#[must_use]
pub fn placeholder_name(id: u32) -> String {
    format!("item #{id}")
}

/// Wraps a lookup with a cache of successful answers.
#[derive(Debug)]
pub struct CachedLookup<L> {
    inner: L,
    cache: Mutex<HashMap<u32, ItemMetadata>>,
}

impl<L> CachedLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub const fn inner(&self) -> &L {
        &self.inner
    }

    #[must_use]
    pub fn cached(&self, id: u32) -> Option<ItemMetadata> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear_cache(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn remember(&self, metadata: ItemMetadata) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(metadata.id, metadata);
    }
}

#[async_trait]
impl<L: MetadataLookup> MetadataLookup for CachedLookup<L> {
    async fn lookup(&self, id: u32) -> Option<ItemMetadata> {
        if let Some(hit) = self.cached(id) {
            log::debug!("metadata cache hit for item {id}");
            return Some(hit);
        }
        let fetched = self.inner.lookup(id).await?;
        self.remember(fetched.clone());
        Some(fetched)
    }
}

/// Lookup that knows nothing; every reward keeps its placeholder name.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineLookup;

#[async_trait]
impl MetadataLookup for OfflineLookup {
    async fn lookup(&self, _id: u32) -> Option<ItemMetadata> {
        None
    }
}

/// Fixed table of names, counting how often it was asked.
#[derive(Debug, Default)]
pub struct StaticLookup {
    entries: HashMap<u32, ItemMetadata>,
    calls: AtomicUsize,
}

impl StaticLookup {
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        let entries = names
            .into_iter()
            .map(|(id, name)| {
                (
                    id,
                    ItemMetadata {
                        id,
                        name: name.into(),
                        image_url: None,
                    },
                )
            })
            .collect();
        Self {
            entries,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataLookup for StaticLookup {
    async fn lookup(&self, id: u32) -> Option<ItemMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entries.get(&id).cloned()
    }
}
