//! Flat-file JSON store
//!
//! Each collection is one pretty-printed JSON array in its own file. Every
//! mutation is a whole-file read-modify-write. An async lock per collection
//! serializes writers so a handler's read-modify-write cannot be clobbered by
//! a concurrent producer append.
//!
//! Failure policy: read failures are logged and treated as an empty
//! collection; write failures propagate to the caller (a swallowed write
//! would desynchronize in-memory and on-disk state).

use crate::models::{Image, Interaction, User};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Typed handle on one backing collection file
pub struct Collection<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full collection. A missing file is initialized to an empty
    /// array; an unreadable or corrupt file is logged and treated as empty.
    pub async fn read(&self) -> Vec<T> {
        let _guard = self.lock.lock().await;
        self.read_unlocked().await
    }

    /// Overwrite the full collection. Write failures propagate.
    pub async fn write(&self, records: &[T]) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write_unlocked(records).await
    }

    /// Read-modify-write under the collection lock.
    ///
    /// `f` receives the current records and may mutate them; the modified
    /// sequence is written back before the lock is released. `f`'s return
    /// value is handed through to the caller.
    pub async fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>) -> R,
    {
        let _guard = self.lock.lock().await;
        let mut records = self.read_unlocked().await;
        let result = f(&mut records);
        self.write_unlocked(&records).await?;
        Ok(result)
    }

    async fn read_unlocked(&self) -> Vec<T> {
        if !self.path.exists() {
            if let Err(e) = fs::write(&self.path, "[]").await {
                warn!("Failed to initialize {}: {}", self.path.display(), e);
            } else {
                info!("Initialized empty collection: {}", self.path.display());
            }
            return Vec::new();
        }

        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        if content.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to parse {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    async fn write_unlocked(&self, records: &[T]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json).await?;
        Ok(())
    }
}

/// The three collections backing the application
pub struct Store {
    pub users: Collection<User>,
    pub images: Collection<Image>,
    pub interactions: Collection<Interaction>,
}

impl Store {
    /// Open the store rooted at `data_dir`, creating the directory if needed.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;

        Ok(Self {
            users: Collection::new(data_dir.join("users.json")),
            images: Collection::new(data_dir.join("images.json")),
            interactions: Collection::new(data_dir.join("interactions.json")),
        })
    }
}
