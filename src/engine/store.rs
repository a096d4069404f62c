use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use async_trait::async_trait;
use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use crate::{Error, Result, KVReader, KVWriter, SaveMode, StoreConfig};
use crate::engine::codec::{Codec, JsonCodec};
use crate::engine::persistence::{Persistence, Snapshot, StoreData};

/// A named, JSON-backed key-value store with a lazily loaded in-memory cache.
///
/// Every operation holds the access lock for its whole duration, including the
/// decision to schedule or run a save. Background saves are debounced: a new
/// write cancels the pending save if it has not started yet.
pub struct LocalStore {
    name: String,
    persistence: Arc<Persistence>,
    config: StoreConfig,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// `None` until the first operation loads the file.
    cache: Option<StoreData>,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl LocalStore {
    /// Binds a store to `<dir>/<name>.json` with the default configuration.
    ///
    /// Nothing is read from disk until the first operation.
    pub fn new<P: AsRef<Path>>(name: &str, dir: P) -> Result<Self> {
        Self::with_config(name, dir, StoreConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(name: &str, dir: P, config: StoreConfig) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::InvalidName("store name is empty".to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            persistence: Arc::new(Persistence::new(dir, name, config.pretty_print)),
            config,
            state: Mutex::new(State::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the main store file.
    pub fn path(&self) -> &Path {
        self.persistence.file_path()
    }

    async fn loaded<'a>(&self, state: &'a mut State) -> &'a mut StoreData {
        if state.cache.is_none() {
            let p = self.persistence.clone();
            let data = match tokio::task::spawn_blocking(move || p.load()).await {
                Ok(data) => data,
                Err(e) => {
                    error!("Loading store {} failed, starting empty: {}", self.name, e);
                    StoreData::new()
                }
            };
            debug!("Loaded store {} with {} keys", self.name, data.len());
            state.cache = Some(data);
        }
        state.cache.get_or_insert_with(StoreData::new)
    }

    async fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> T {
        let mut state = self.state.lock().await;
        let data = self.loaded(&mut state).await;
        f(data)
    }

    /// Runs `f` on the cache; persists when `f` reports a change.
    async fn write<T>(&self, mode: SaveMode, f: impl FnOnce(&mut StoreData) -> (T, bool)) -> T {
        let mut state = self.state.lock().await;
        let data = self.loaded(&mut state).await;
        let (result, changed) = f(data);
        if changed {
            self.persist(&mut state, mode).await;
        }
        result
    }

    async fn persist(&self, state: &mut State, mode: SaveMode) {
        state.generation += 1;
        let snapshot = Snapshot {
            generation: state.generation,
            data: state.cache.clone().unwrap_or_default(),
        };

        if let Some(pending) = state.pending.take() {
            pending.abort();
        }

        let p = self.persistence.clone();
        let name = self.name.clone();
        match mode {
            SaveMode::Wait => save_blocking(p, snapshot, name).await,
            SaveMode::Background => {
                let delay = self.config.save_debounce;
                debug!("Scheduling save of store {} (generation {})", self.name, state.generation);
                state.pending = Some(tokio::spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    save_blocking(p, snapshot, name).await;
                }));
            }
        }
    }

    /// Decodes the value of `key` with `codec`.
    pub async fn get_with<C: Codec>(&self, key: &str, codec: &C) -> Result<C::Item> {
        self.read(|data| {
            let raw = data.get(key).ok_or_else(|| Error::KeyNotFound(key.to_string()))?;
            codec.decode(raw).map_err(|source| Error::TypeMismatch {
                key: key.to_string(),
                type_tag: codec.type_tag(),
                source,
            })
        })
        .await
    }

    /// Returns the value of `key`; fails if it is absent or not a `T`.
    pub async fn get<T: Serialize + DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get_with(key, &JsonCodec::<T>::new()).await
    }

    pub async fn get_opt_with<C: Codec>(&self, key: &str, codec: &C) -> Option<C::Item> {
        self.read(|data| data.get(key).and_then(|raw| codec.decode(raw).ok())).await
    }

    /// Returns the value of `key`, or `None` if it is absent or not a `T`.
    pub async fn get_opt<T: Serialize + DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_opt_with(key, &JsonCodec::<T>::new()).await
    }

    /// Returns the value of `key`, or `default` without storing it.
    pub async fn get_or_default<T: Serialize + DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_opt(key).await.unwrap_or(default)
    }

    /// Returns the value of `key`; stores and returns `default` when the key is
    /// absent or its value cannot be decoded.
    pub async fn get_or_put_with<C: Codec>(&self, key: &str, default: C::Item, codec: &C, mode: SaveMode) -> Result<C::Item> {
        let encoded = codec.encode(&default)?;
        let item = self
            .write(mode, |data| {
                if let Some(existing) = data.get(key).and_then(|raw| codec.decode(raw).ok()) {
                    return (existing, false);
                }
                data.insert(key.to_string(), encoded);
                (default, true)
            })
            .await;
        Ok(item)
    }

    pub async fn get_or_put<T: Serialize + DeserializeOwned>(&self, key: &str, default: T, mode: SaveMode) -> Result<T> {
        self.get_or_put_with(key, default, &JsonCodec::<T>::new(), mode).await
    }

    /// Stores `value` under `key`, returning the previous value if it was a `C::Item`.
    pub async fn put_with<C: Codec>(&self, key: &str, value: &C::Item, codec: &C, mode: SaveMode) -> Result<Option<C::Item>> {
        let encoded = codec.encode(value)?;
        let previous = self.write(mode, |data| (data.insert(key.to_string(), encoded), true)).await;
        Ok(previous.and_then(|raw| codec.decode(&raw).ok()))
    }

    pub async fn put<T: Serialize + DeserializeOwned>(&self, key: &str, value: T, mode: SaveMode) -> Result<Option<T>> {
        self.put_with(key, &value, &JsonCodec::<T>::new(), mode).await
    }

    /// Removes `key`, returning its value if it was a `C::Item`.
    pub async fn remove_with<C: Codec>(&self, key: &str, codec: &C, mode: SaveMode) -> Option<C::Item> {
        self.remove_raw(key, mode).await.and_then(|raw| codec.decode(&raw).ok())
    }

    pub async fn remove<T: Serialize + DeserializeOwned>(&self, key: &str, mode: SaveMode) -> Option<T> {
        self.remove_with(key, &JsonCodec::<T>::new(), mode).await
    }

    async fn remove_raw(&self, key: &str, mode: SaveMode) -> Option<serde_json::Value> {
        self.write(mode, |data| (data.remove(key), true)).await
    }

    pub async fn clear(&self, mode: SaveMode) {
        self.write(mode, |data| (data.clear(), true)).await
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.read(|data| data.contains_key(key)).await
    }

    /// Snapshot of every key with its JSON-encoded value.
    pub async fn get_all(&self) -> HashMap<String, String> {
        self.read(|data| data.iter().map(|(k, v)| (k.clone(), v.to_string())).collect()).await
    }

    pub async fn len(&self) -> usize {
        self.read(|data| data.len()).await
    }

    pub async fn is_empty(&self) -> bool {
        self.read(|data| data.is_empty()).await
    }

    /// Waits until the pending background save, if any, has finished.
    ///
    /// Call before shutdown so the last writes reach the disk.
    pub async fn flush(&self) {
        let mut state = self.state.lock().await;
        if let Some(pending) = state.pending.take() {
            if let Err(e) = pending.await {
                if !e.is_cancelled() {
                    error!("Pending save of store {} failed: {}", self.name, e);
                }
            }
        }
    }
}

async fn save_blocking(p: Arc<Persistence>, snapshot: Snapshot, name: String) {
    match tokio::task::spawn_blocking(move || p.save(&snapshot)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!("Failed to persist store {}: {}", name, e),
        Err(e) => error!("Save task for store {} failed: {}", name, e),
    }
}

#[async_trait]
impl KVReader for LocalStore {
    async fn get_value(&self, key: &str) -> Result<serde_json::Value> {
        self.read(|data| data.get(key).cloned().ok_or_else(|| Error::KeyNotFound(key.to_string())))
            .await
    }

    async fn contains(&self, key: &str) -> bool {
        LocalStore::contains(self, key).await
    }

    async fn get_all(&self) -> HashMap<String, String> {
        LocalStore::get_all(self).await
    }
}

#[async_trait]
impl KVWriter for LocalStore {
    async fn put_value(&self, key: &str, value: serde_json::Value, mode: SaveMode) -> Option<serde_json::Value> {
        self.write(mode, |data| (data.insert(key.to_string(), value), true)).await
    }

    async fn remove_value(&self, key: &str, mode: SaveMode) -> Option<serde_json::Value> {
        self.remove_raw(key, mode).await
    }

    async fn clear(&self, mode: SaveMode) {
        LocalStore::clear(self, mode).await
    }

    async fn flush(&self) {
        LocalStore::flush(self).await
    }
}
