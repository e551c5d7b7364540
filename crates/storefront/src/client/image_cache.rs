//! Per-product image freshness registry.
//!
//! The backend does not signal when a product image changes, so the client
//! records a freshness timestamp whenever it changes one itself and appends it
//! to that product's image URLs. Other products keep their cached images.
//!
//! Durable storage is the source of truth. The in-memory map is an
//! accelerator loaded lazily on the first read and kept for the lifetime of
//! the registry; another client context writing the same storage may leave it
//! stale until the next [`touch`](ImageCacheRegistry::touch).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use kicks_core::{Freshness, LocalStorage, ProductId, StorageError, keys};
use tracing::{debug, warn};
use url::form_urlencoded;

use super::images::ImagePathResolver;
use crate::storage::SharedStorage;

type TimestampMap = HashMap<ProductId, Freshness>;

/// Tracks image freshness per product and builds cache-busted URLs.
///
/// Construct one per client context and share it by reference (or `Arc`).
pub struct ImageCacheRegistry {
    resolver: ImagePathResolver,
    storage: SharedStorage,
    cache: Mutex<Option<TimestampMap>>,
}

impl std::fmt::Debug for ImageCacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCacheRegistry")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl ImageCacheRegistry {
    /// Create a registry backed by `storage`. Nothing is read until first use.
    #[must_use]
    pub fn new(resolver: ImagePathResolver, storage: SharedStorage) -> Self {
        Self {
            resolver,
            storage,
            cache: Mutex::new(None),
        }
    }

    /// The resolver used by [`build_url`](Self::build_url).
    #[must_use]
    pub const fn resolver(&self) -> &ImagePathResolver {
        &self.resolver
    }

    /// Record that `product_id`'s image changed now.
    ///
    /// The stored value never moves backwards: if a later timestamp is
    /// already recorded (e.g., by a clock that was ahead), it is kept.
    /// The whole mapping is written to durable storage before returning;
    /// a storage failure is logged and the in-memory value still applies.
    pub fn touch(&self, product_id: &ProductId) -> Freshness {
        let now = Freshness::now();
        let mut cache = self.lock();

        let mut merged = self.load_durable().unwrap_or_default();
        if let Some(memory) = cache.as_ref() {
            for (id, stamp) in memory {
                merged
                    .entry(id.clone())
                    .and_modify(|durable| *durable = (*durable).max(*stamp))
                    .or_insert(*stamp);
            }
        }

        let stamp = merged
            .get(product_id)
            .map_or(now, |existing| (*existing).max(now));
        merged.insert(product_id.clone(), stamp);

        if let Err(e) = self.storage.set_json(keys::PRODUCT_IMAGE_TIMESTAMPS, &merged) {
            warn!(error = %e, product_id = %product_id, "Failed to persist image timestamps");
        }

        *cache = Some(merged);
        stamp
    }

    /// The recorded freshness for `product_id`, if any.
    pub fn peek(&self, product_id: &ProductId) -> Option<Freshness> {
        let mut cache = self.lock();
        cache
            .get_or_insert_with(|| self.load_durable().unwrap_or_default())
            .get(product_id)
            .copied()
    }

    /// Forget every recorded timestamp, in memory and in durable storage.
    pub fn clear_all(&self) {
        let mut cache = self.lock();
        *cache = Some(TimestampMap::new());
        if let Err(e) = self.storage.remove_item(keys::PRODUCT_IMAGE_TIMESTAMPS) {
            warn!(error = %e, "Failed to clear image timestamps");
        }
    }

    /// Resolve `raw_path` and append a `v=` cache-busting parameter.
    ///
    /// The value is the product's recorded freshness, else `fallback` when it
    /// is positive, else the current time. An existing `v=` parameter is
    /// replaced.
    pub fn build_url(
        &self,
        raw_path: &str,
        product_id: &ProductId,
        fallback: Option<Freshness>,
    ) -> String {
        let resolved = self.resolver.resolve(raw_path);
        let version = self
            .peek(product_id)
            .or_else(|| fallback.filter(|f| f.as_millis() > 0))
            .unwrap_or_else(Freshness::now);

        with_version_param(&resolved, version)
    }

    fn lock(&self) -> MutexGuard<'_, Option<TimestampMap>> {
        // The map stays consistent even if a holder panicked mid-read.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_durable(&self) -> Option<TimestampMap> {
        match self
            .storage
            .get_json::<TimestampMap>(keys::PRODUCT_IMAGE_TIMESTAMPS)
        {
            Ok(map) => {
                debug!(
                    entries = map.as_ref().map_or(0, HashMap::len),
                    "Loaded image timestamps from storage"
                );
                map
            }
            Err(StorageError::Serialization(e)) => {
                warn!(error = %e, "Discarding malformed image timestamps");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to load image timestamps");
                None
            }
        }
    }
}

/// Set `v=<version>` on `url`, replacing an existing `v` parameter.
fn with_version_param(url: &str, version: Freshness) -> String {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, frag)) => (head, Some(frag)),
        None => (url, None),
    };

    let (path, existing) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_fragment, None),
    };

    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(existing) = existing {
        query.extend_pairs(
            form_urlencoded::parse(existing.as_bytes()).filter(|(key, _)| key != "v"),
        );
    }
    query.append_pair("v", &version.to_string());

    let mut out = format!("{path}?{}", query.finish());
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
