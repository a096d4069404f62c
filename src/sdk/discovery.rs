use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::{LocalStore, PathResolver, Result, StoreConfig, DEFAULT_APP, DEFAULT_VENDOR};

/// Environment variable that replaces the resolved application directory.
pub const DATA_DIR_ENV: &str = "KUTILITY_DATA_DIR";

/// Returns the directory holding the stores of `vendor`/`app`, creating it if needed.
///
/// 1. If `KUTILITY_DATA_DIR` is set and non-empty, that directory is used.
/// 2. Otherwise the per-user configuration directory from [`PathResolver`].
pub fn data_dir(vendor: &str, app: &str) -> Result<PathBuf> {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            let dir = PathBuf::from(dir);
            ensure_dir(&dir)?;
            return Ok(dir);
        }
    }
    PathResolver::new(vendor, app)?.resolve()
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| crate::Error::DirectoryCreation {
        path: dir.to_path_buf(),
        source,
    })
}

/// Opens the Kutility store called `name` with configuration from the environment.
///
/// # Examples
///
/// ```no_run
/// use kutility_store::{sdk, SaveMode, SETTINGS_STORE};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let settings = sdk::open(SETTINGS_STORE)?;
///     settings.put("last_tool", "hash".to_string(), SaveMode::Background).await?;
///     settings.flush().await;
///     Ok(())
/// }
/// ```
pub fn open(name: &str) -> Result<Arc<LocalStore>> {
    open_with(DEFAULT_VENDOR, DEFAULT_APP, name, StoreConfig::from_env())
}

pub fn open_with(vendor: &str, app: &str, name: &str, config: StoreConfig) -> Result<Arc<LocalStore>> {
    let dir = data_dir(vendor, app)?;
    open_in(dir, name, config)
}

/// Opens the store called `name` in an explicit directory, creating it if needed.
pub fn open_in<P: AsRef<Path>>(dir: P, name: &str, config: StoreConfig) -> Result<Arc<LocalStore>> {
    let dir = dir.as_ref();
    ensure_dir(dir)?;
    log::debug!("Opening store {} in {:?}", name, dir);
    Ok(Arc::new(LocalStore::with_config(name, dir, config)?))
}
