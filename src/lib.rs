//! Kutility Store is the local settings store of the Kutility desktop tools.
//!
//! A store is a single JSON document on disk, cached in memory and written back
//! through debounced, atomic saves. A corrupted document is quarantined and the
//! previous snapshot (`.bak`) is used instead, so a crash never leaves a
//! half-written file behind for the next start.
//!
//! ## Core Components
//! - [`paths`]: OS-appropriate application directory resolution.
//! - [`engine`]: The storage engine (in-memory cache with persistence).
//! - [`sdk`]: Opening the application's stores.
//! - [`config`]: Tunables for the engine.

pub mod config;
pub mod engine;
pub mod paths;
pub mod sdk;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

pub use config::StoreConfig;
pub use engine::{Codec, FnCodec, JsonCodec, LocalStore};
pub use paths::PathResolver;

/// Vendor directory used by the Kutility application.
pub const DEFAULT_VENDOR: &str = "sh.bitsy";
/// Application directory used by the Kutility application.
pub const DEFAULT_APP: &str = "kutility";
/// File name (without extension) of the main settings store.
pub const SETTINGS_STORE: &str = "settings";

/// Errors returned by the Kutility Store.
#[derive(Error, Debug)]
pub enum Error {
    /// The requested key does not exist in the store.
    #[error("key '{0}' not found")]
    KeyNotFound(String),
    /// The stored value cannot be decoded as the requested type.
    #[error("value of key '{key}' cannot be read as {type_tag}: {source}")]
    TypeMismatch {
        key: String,
        type_tag: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// The application directory could not be created.
    #[error("cannot create directory {path:?}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A vendor, application or store name was empty.
    #[error("invalid name: {0}")]
    InvalidName(String),
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A specialized Result type for Kutility Store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// How a write operation reaches the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Schedule a debounced background save and return immediately.
    #[default]
    Background,
    /// Cancel any pending save and write the store before returning.
    Wait,
}

/// Read access to raw stored values.
#[async_trait]
pub trait KVReader: Send + Sync {
    /// Retrieves the stored JSON value for a key.
    async fn get_value(&self, key: &str) -> Result<serde_json::Value>;
    /// Reports whether a key is present.
    async fn contains(&self, key: &str) -> bool;
    /// Returns every key with its JSON-encoded value.
    async fn get_all(&self) -> HashMap<String, String>;
}

/// Write access to raw stored values.
#[async_trait]
pub trait KVWriter: Send + Sync {
    /// Stores a JSON value, returning the value it replaced.
    async fn put_value(&self, key: &str, value: serde_json::Value, mode: SaveMode) -> Option<serde_json::Value>;
    /// Removes a key, returning the value it held.
    async fn remove_value(&self, key: &str, mode: SaveMode) -> Option<serde_json::Value>;
    /// Removes every key.
    async fn clear(&self, mode: SaveMode);
    /// Waits for the pending background save, if any, to finish.
    async fn flush(&self);
}
