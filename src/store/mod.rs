pub mod memory;
pub mod sqlite;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::app::Result;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Key/value persistence for the feed cache and user settings.
///
/// Values are JSON text. Implementations report failures; callers decide
/// whether to swallow them.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Write all entries or none of them.
    fn set_many(&self, entries: &[(&str, String)]) -> Result<()>;
    fn remove(&self, keys: &[&str]) -> Result<()>;
}

/// Typed helpers on top of [`Storage`].
pub trait StorageExt: Storage {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Read `key`, falling back to `default` on absence or any failure.
    fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get_json(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(key, error = %e, "Storage read failed, using default");
                default
            }
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, &serde_json::to_string(value)?)
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}
