//! HTTP creature metadata lookup with a store-backed cache.
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;

use streakdex_core::{ItemMetadata, KeyValueStore, MetadataLookup};

pub const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CACHE_PREFIX: &str = "metadata:";

#[derive(Debug, Default, Deserialize)]
struct Artwork {
    front_default: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    official_artwork: Artwork,
}

#[derive(Debug, Default, Deserialize)]
struct Sprites {
    front_default: Option<String>,
    #[serde(default)]
    other: OtherSprites,
}

/// Partial creature payload; only the fields the engine displays.
#[derive(Debug, Deserialize)]
struct CreatureResponse {
    id: u32,
    name: String,
    #[serde(default)]
    sprites: Sprites,
}

impl CreatureResponse {
    /// Prefer official artwork, then the default front sprite.
    fn image_url(&self) -> Option<String> {
        self.sprites
            .other
            .official_artwork
            .front_default
            .clone()
            .or_else(|| self.sprites.front_default.clone())
            .filter(|url| !url.is_empty())
    }

    fn into_metadata(self) -> ItemMetadata {
        let image_url = self.image_url();
        ItemMetadata {
            id: self.id,
            name: self.name,
            image_url,
        }
    }
}

/// `GET {base}/pokemon/{id}` with a request timeout.
#[derive(Debug, Clone)]
pub struct HttpMetadataLookup {
    client: Client,
    base_url: String,
}

impl HttpMetadataLookup {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, id: u32) -> String {
        format!("{}/pokemon/{id}", self.base_url)
    }
}

#[async_trait]
impl MetadataLookup for HttpMetadataLookup {
    async fn lookup(&self, id: u32) -> Option<ItemMetadata> {
        let url = self.url_for(id);
        log::debug!("fetching item {id} from {url}");
        let response = match self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                log::warn!("metadata request for item {id} timed out");
                return None;
            }
            Err(err) => {
                log::warn!("metadata request for item {id} failed: {err}");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            log::warn!("failed to fetch item {id}: {status}");
            return None;
        }

        match response.json::<CreatureResponse>().await {
            Ok(body) => {
                log::debug!("fetched item {id}: {}", body.name);
                Some(body.into_metadata())
            }
            Err(err) => {
                log::warn!("undecodable metadata for item {id}: {err}");
                None
            }
        }
    }
}

/// Caches successful answers of `inner` in a key-value store so they
/// survive across runs. A reset of the store drops the cache with it.
#[derive(Debug, Clone)]
pub struct StoreCachedLookup<L, K> {
    inner: L,
    store: K,
}

impl<L, K> StoreCachedLookup<L, K>
where
    K: KeyValueStore,
{
    pub const fn new(inner: L, store: K) -> Self {
        Self { inner, store }
    }

    fn cached(&self, id: u32) -> Option<ItemMetadata> {
        let raw = match self.store.get(&format!("{CACHE_PREFIX}{id}")) {
            Ok(raw) => raw?,
            Err(err) => {
                log::warn!("metadata cache read failed for item {id}: {err}");
                return None;
            }
        };
        serde_json::from_str(&raw).ok()
    }

    fn remember(&self, metadata: &ItemMetadata) {
        let encoded = match serde_json::to_string(metadata) {
            Ok(encoded) => encoded,
            Err(err) => {
                log::warn!("could not encode metadata for item {}: {err}", metadata.id);
                return;
            }
        };
        if let Err(err) = self
            .store
            .set(&format!("{CACHE_PREFIX}{}", metadata.id), &encoded)
        {
            log::warn!("metadata cache write failed for item {}: {err}", metadata.id);
        }
    }
}

#[async_trait]
impl<L, K> MetadataLookup for StoreCachedLookup<L, K>
where
    L: MetadataLookup,
    K: KeyValueStore + Send + Sync,
{
    async fn lookup(&self, id: u32) -> Option<ItemMetadata> {
        if let Some(hit) = self.cached(id) {
            log::debug!("using cached metadata for item {id}");
            return Some(hit);
        }
        let fetched = self.inner.lookup(id).await?;
        self.remember(&fetched);
        Some(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streakdex_core::{MemoryStore, StaticLookup};

    #[test]
    fn artwork_is_preferred_over_front_sprite() {
        let body: CreatureResponse = serde_json::from_str(
            r#"{"id":25,"name":"pikachu","sprites":{"front_default":"front.png",
                "other":{"official-artwork":{"front_default":"art.png"}}}}"#,
        )
        .unwrap();
        assert_eq!(body.image_url().as_deref(), Some("art.png"));

        let bare: CreatureResponse =
            serde_json::from_str(r#"{"id":1,"name":"bulbasaur","sprites":{"front_default":""}}"#)
                .unwrap();
        let metadata = bare.into_metadata();
        assert_eq!(metadata.name, "bulbasaur");
        assert_eq!(metadata.image_url, None);
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base() {
        let lookup = HttpMetadataLookup::new("http://localhost:9/api/").unwrap();
        assert_eq!(lookup.url_for(7), "http://localhost:9/api/pokemon/7");
    }

    #[tokio::test]
    async fn store_cache_answers_without_inner_lookup() {
        let store = MemoryStore::new();
        let lookup = StoreCachedLookup::new(StaticLookup::new([(4, "charmander")]), store.clone());

        assert_eq!(lookup.lookup(4).await.map(|m| m.name).as_deref(), Some("charmander"));
        assert_eq!(lookup.lookup(4).await.map(|m| m.name).as_deref(), Some("charmander"));
        assert!(lookup.lookup(5).await.is_none());
        assert_eq!(lookup.inner.calls(), 2);
        assert_eq!(store.len(), 1);
    }
}
