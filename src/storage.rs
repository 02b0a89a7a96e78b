//! storage.rs — Fixed-key JSON persistence.
//!
//! The reconciler treats storage as a plain key-value collaborator: JSON
//! blobs under well-known string keys, synchronous from the caller's point
//! of view. `JsonFileStore` keeps one file per key under a state directory;
//! `MemoryStore` backs tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Well-known keys. The ad collection and sync state are each a single blob.
pub const KEY_ADS: &str = "ads";
pub const KEY_SYNC_SETTINGS: &str = "sync_settings";
pub const KEY_SYNC_CACHE: &str = "sync_cache";

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: &Value) -> Result<()>;
}

/// Typed convenience wrappers over the raw JSON contract.
pub trait KvStoreExt: KvStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(v) => {
                let t = serde_json::from_value(v)
                    .with_context(|| format!("deserializing stored key '{key}'"))?;
                Ok(Some(t))
            }
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let v = serde_json::to_value(value)
            .with_context(|| format!("serializing value for key '{key}'"))?;
        self.set(key, &v)
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}

/// One JSON file per key under a state directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let v = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(v))
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path_for(key);
        let bytes = serde_json::to_vec_pretty(value).context("serializing value")?;
        std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let map = self.inner.lock().expect("store mutex poisoned");
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let mut map = self.inner.lock().expect("store mutex poisoned");
        map.insert(key.to_string(), value.clone());
        Ok(())
    }
}
