//! Resolution of the per-user directory holding an application's persisted data.
//!
//! ```text
//! Windows   %APPDATA%\<vendor>\<app>             (or ~\AppData\Roaming\...)
//! macOS     ~/Library/Application Support/<vendor>/<app>
//! other     $XDG_CONFIG_HOME/<vendor>/<app>       (or ~/.config/...)
//! ```

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Operating system family, as far as directory layout is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Other,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }
}

/// Resolves (and creates) `<base>/<vendor>/<app>`.
#[derive(Debug, Clone)]
pub struct PathResolver {
    vendor: String,
    app: String,
}

impl PathResolver {
    /// Creates a resolver for a vendor/application pair. Both must be non-empty.
    pub fn new(vendor: &str, app: &str) -> Result<Self> {
        if vendor.trim().is_empty() {
            return Err(Error::InvalidName("vendor name is empty".to_string()));
        }
        if app.trim().is_empty() {
            return Err(Error::InvalidName("application name is empty".to_string()));
        }
        Ok(Self {
            vendor: vendor.to_string(),
            app: app.to_string(),
        })
    }

    /// Returns the application directory for the current user, creating it if needed.
    pub fn resolve(&self) -> Result<PathBuf> {
        let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let base = base_dir(Platform::current(), &home, |name| env::var_os(name));
        self.resolve_in(&base)
    }

    /// Returns `<base>/<vendor>/<app>`, creating it if needed.
    pub fn resolve_in(&self, base: &Path) -> Result<PathBuf> {
        let dir = base.join(&self.vendor).join(&self.app);
        ensure_dir(&dir)?;
        std::path::absolute(&dir).map_err(|source| Error::DirectoryCreation { path: dir, source })
    }
}

/// Picks the configuration base directory for `platform`.
///
/// Empty environment values count as unset.
pub fn base_dir<F>(platform: Platform, home: &Path, var: F) -> PathBuf
where
    F: Fn(&str) -> Option<OsString>,
{
    let non_empty = |name: &str| var(name).filter(|v| !v.is_empty()).map(PathBuf::from);

    match platform {
        Platform::Windows => {
            non_empty("APPDATA").unwrap_or_else(|| home.join("AppData").join("Roaming"))
        }
        Platform::MacOs => home.join("Library").join("Application Support"),
        Platform::Other => non_empty("XDG_CONFIG_HOME").unwrap_or_else(|| home.join(".config")),
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(Error::DirectoryCreation {
            path: dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "path exists and is not a directory"),
        });
    }
    fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreation {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<OsString> {
        move |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| OsString::from(*v))
        }
    }

    #[test]
    fn test_windows_prefers_appdata() {
        let home = Path::new("/home/u");
        let base = base_dir(Platform::Windows, home, vars(&[("APPDATA", "/roaming")]));
        assert_eq!(base, PathBuf::from("/roaming"));

        let base = base_dir(Platform::Windows, home, vars(&[("APPDATA", "")]));
        assert_eq!(base, home.join("AppData").join("Roaming"));
    }

    #[test]
    fn test_macos_ignores_xdg() {
        let home = Path::new("/Users/u");
        let base = base_dir(Platform::MacOs, home, vars(&[("XDG_CONFIG_HOME", "/xdg")]));
        assert_eq!(base, home.join("Library").join("Application Support"));
    }

    #[test]
    fn test_unix_xdg_fallback() {
        let home = Path::new("/home/u");
        assert_eq!(
            base_dir(Platform::Other, home, vars(&[("XDG_CONFIG_HOME", "/xdg")])),
            PathBuf::from("/xdg")
        );
        assert_eq!(base_dir(Platform::Other, home, vars(&[])), home.join(".config"));
    }

    #[test]
    fn test_resolve_in_creates_directory() {
        let dir = tempdir().unwrap();
        let resolver = PathResolver::new("sh.bitsy", "kutility").unwrap();

        let resolved = resolver.resolve_in(dir.path()).unwrap();
        assert!(resolved.is_dir());
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("sh.bitsy/kutility"));

        // Second resolution is a no-op.
        assert_eq!(resolver.resolve_in(dir.path()).unwrap(), resolved);
    }

    #[test]
    fn test_resolve_in_rejects_file() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor").join("app"), b"not a dir").unwrap();

        let resolver = PathResolver::new("vendor", "app").unwrap();
        let res = resolver.resolve_in(dir.path());
        assert!(matches!(res, Err(Error::DirectoryCreation { .. })));
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(matches!(PathResolver::new("", "app"), Err(Error::InvalidName(_))));
        assert!(matches!(PathResolver::new("vendor", " "), Err(Error::InvalidName(_))));
    }
}
