use std::{collections::HashMap, io, path::PathBuf};

use async_trait::async_trait;
use tokio::{fs, sync::Mutex};

/// Durable text blobs addressed by a path-safe key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored under `key` yet.
    async fn read(&self, key: &str) -> io::Result<Option<String>>;
    /// Replaces whatever is stored under `key`.
    async fn write(&self, key: &str, contents: &str) -> io::Result<()>;
}

/// One `<key>.json` file per blob inside `dir`.
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FsBlobStore { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, key: &str, contents: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await?;

        // Rename over the old blob so readers never see a half-written file
        let path = self.path(key);
        let tmp_path = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp_path, contents).await?;
        fs::rename(&tmp_path, &path).await
    }
}

/// Non-durable store, used when no cache directory is configured.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.blobs.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, contents: &str) -> io::Result<()> {
        self.blobs
            .lock()
            .await
            .insert(key.to_string(), contents.to_string());
        Ok(())
    }
}
