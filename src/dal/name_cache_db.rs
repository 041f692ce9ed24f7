use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::domain::detail_record::DetailRecord;

use super::blob_store::BlobStore;

/// Detail records already seen for one name, keyed by detail URL.
pub type DetailCache = BTreeMap<String, DetailRecord>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache blob is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Default)]
struct NameCacheFile {
    #[serde(rename = "detailCache", default)]
    detail_cache: DetailCache,
}

/// Longest key stored verbatim as hex, well under common filename limits.
const MAX_PLAIN_KEY_LEN: usize = 200;
const HASHED_KEY_PREFIX_LEN: usize = 128;

/// Storage key for a name: lowercase hex of its UTF-8 bytes, so keys differ
/// even on case-insensitive filesystems. Names too long for that end in `-`
/// and a SHA-256 digest instead; plain keys never contain `-`.
pub fn cache_key(name: &str) -> String {
    let key = hex::encode(name.as_bytes());
    if key.len() <= MAX_PLAIN_KEY_LEN {
        return key;
    }

    let digest = hex::encode(Sha256::digest(name.as_bytes()));
    format!("{}-{}", &key[..HASHED_KEY_PREFIX_LEN], digest)
}

async fn read_detail_cache(store: &dyn BlobStore, name: &str) -> Result<DetailCache, CacheError> {
    let Some(contents) = store.read(&cache_key(name)).await? else {
        return Ok(DetailCache::new());
    };
    let file: NameCacheFile = serde_json::from_str(&contents)?;
    Ok(file.detail_cache)
}

async fn write_detail_cache(
    store: &dyn BlobStore,
    name: &str,
    cache: &DetailCache,
) -> Result<(), CacheError> {
    let file = NameCacheFile {
        detail_cache: cache.clone(),
    };
    let contents = serde_json::to_string_pretty(&file)?;
    store.write(&cache_key(name), &contents).await?;
    Ok(())
}

/// Loads the cache for `name`. Unreadable or corrupt blobs load as empty.
/// Entries that recorded a failure are dropped so they get fetched again.
pub async fn load_detail_cache(store: &dyn BlobStore, name: &str) -> DetailCache {
    let mut cache = read_detail_cache(store, name).await.unwrap_or_else(|e| {
        log::warn!("Ignoring unreadable cache for name {:?}: {}", name, e);
        DetailCache::new()
    });

    cache.retain(|_, record| !record.is_error());
    for (url, record) in cache.iter_mut() {
        if record.detail_url.is_empty() {
            record.detail_url = url.clone();
        }
    }

    cache
}

/// Overwrites the cache for `name`. Failures are logged only.
pub async fn save_detail_cache(store: &dyn BlobStore, name: &str, cache: &DetailCache) {
    if let Err(e) = write_detail_cache(store, name, cache).await {
        log::error!("Failed to persist cache for name {:?}: {}", name, e);
    }
}
