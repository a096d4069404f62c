use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use log::{debug, warn};
use crate::Result;

#[allow(unused_imports)]
use crate::engine::LocalStore;

/// Contents of one store file: key to JSON-encoded value.
pub type StoreData = HashMap<String, serde_json::Value>;

/// A copy of the cache taken for one save.
///
/// `generation` grows with every write to the cache; a snapshot older than the
/// last one written is never put on disk.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub data: StoreData,
}

/// Handles disk I/O for the [`LocalStore`].
///
/// The file set of a store named `settings`:
///
/// ```text
/// settings.json                   current store
/// settings.json.bak               previous consistent snapshot
/// settings.json.tmp               write in progress
/// settings.json.corrupted.<ms>    quarantined, never read again
/// ```
pub struct Persistence {
    file_path: PathBuf,
    backup_path: PathBuf,
    temp_path: PathBuf,
    pretty: bool,
    /// Save lock. Holds the generation of the last snapshot written.
    last_written: Mutex<u64>,
}

impl Persistence {
    /// Binds to `<dir>/<name>.json`. Nothing is touched on disk.
    pub fn new<P: AsRef<Path>>(dir: P, name: &str, pretty: bool) -> Self {
        let file_path = dir.as_ref().join(format!("{}.json", name));
        Self {
            backup_path: with_suffix(&file_path, ".bak"),
            temp_path: with_suffix(&file_path, ".tmp"),
            file_path,
            pretty,
            last_written: Mutex::new(0),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Loads the store, falling back to the backup and then to an empty map.
    ///
    /// The backup is tried whenever the main file yields nothing, read errors included.
    ///
    /// A main file that fails to parse is quarantined first. The backup is
    /// never quarantined.
    pub fn load(&self) -> StoreData {
        if let Some(data) = self.read_store(&self.file_path, true) {
            return data;
        }
        if self.backup_path.exists() {
            if let Some(data) = self.read_store(&self.backup_path, false) {
                warn!("Recovered store from backup {:?}", self.backup_path);
                return data;
            }
        }
        StoreData::new()
    }

    /// Returns `None` when the file is missing, empty, unreadable or corrupt.
    fn read_store(&self, path: &Path, quarantine: bool) -> Option<StoreData> {
        let content = match fs::read(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read store file {:?}: {}", path, e);
                return None;
            }
        };

        if content.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        match serde_json::from_slice::<StoreData>(&content) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Could not parse store file {:?} (possibly corrupted): {}", path, e);
                if quarantine {
                    self.quarantine(path);
                }
                None
            }
        }
    }

    fn quarantine(&self, path: &Path) {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let target = with_suffix(path, &format!(".corrupted.{}", millis));
        match fs::rename(path, &target) {
            Ok(()) => warn!("Quarantined corrupted store file as {:?}", target),
            Err(e) => warn!("Could not quarantine {:?}: {}", path, e),
        }
    }

    /// Writes a snapshot: temp file, fsync, rotate main to backup, rename temp to main.
    ///
    /// Returns `Ok(false)` without touching disk when a newer snapshot has
    /// already been written.
    pub fn save(&self, snapshot: &Snapshot) -> Result<bool> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&snapshot.data)?
        } else {
            serde_json::to_vec(&snapshot.data)?
        };

        // The guarded value is a plain counter, so a poisoned lock is still usable.
        let mut last_written = self.last_written.lock().unwrap_or_else(|e| e.into_inner());
        if snapshot.generation < *last_written {
            debug!(
                "Skipping stale snapshot {} of {:?} (already wrote {})",
                snapshot.generation, self.file_path, *last_written
            );
            return Ok(false);
        }

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        {
            let mut tmp = File::create(&self.temp_path)?;
            tmp.write_all(&bytes)?;
            tmp.sync_all()?;
        }

        if self.file_path.exists() {
            fs::rename(&self.file_path, &self.backup_path)?;
        }
        fs::rename(&self.temp_path, &self.file_path)?;

        *last_written = snapshot.generation;
        debug!("Saved {} keys to {:?}", snapshot.data.len(), self.file_path);
        Ok(true)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}
