use std::collections::HashMap;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Byte-level document store. Every backend the service runs on (the Spin
/// key-value store on wasm32, the in-process map natively) implements this.
pub trait DocumentStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;

    fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// Writes several documents as one unit. Backends without batch support
    /// fall back to sequential writes.
    fn set_many(&self, entries: &[(String, Vec<u8>)]) -> anyhow::Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

impl dyn DocumentStore + '_ {
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.set(key, &serde_json::to_vec(value)?)
    }
}

/// Collects JSON documents for a single `set_many` commit.
#[derive(Default)]
pub struct Batch {
    entries: Vec<(String, Vec<u8>)>,
}

impl Batch {
    pub fn new() -> Self {
        Batch::default()
    }

    pub fn put<T: Serialize>(&mut self, key: String, value: &T) -> anyhow::Result<&mut Self> {
        self.entries.push((key, serde_json::to_vec(value)?));
        Ok(self)
    }

    pub fn commit(self, store: &dyn DocumentStore) -> anyhow::Result<()> {
        store.set_many(&self.entries)
    }
}

/// In-process store used by the native server and the tests.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("memory store lock poisoned")
}

impl DocumentStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.data.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.data
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.data.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    fn set_many(&self, entries: &[(String, Vec<u8>)]) -> anyhow::Result<()> {
        let mut data = self.data.write().map_err(poisoned)?;
        for (key, value) in entries {
            data.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
impl DocumentStore for spin_sdk::key_value::Store {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(spin_sdk::key_value::Store::get(self, key)?)
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        Ok(spin_sdk::key_value::Store::set(self, key, value)?)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        Ok(spin_sdk::key_value::Store::delete(self, key)?)
    }
}
