use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::engine::Engine;
use crate::error::{DbError, Result};
use crate::migrations;

pub const DEFAULT_DB_FILE: &str = "lumen.db";
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Where the backing file may live.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Preferred location, used only when its directory is writable.
    pub configured_path: Option<PathBuf>,
    /// Application data directory holding the fallback file.
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(configured_path: Option<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            configured_path,
            data_dir: data_dir.into(),
        }
    }

    /// Reads `LUMEN_DB_PATH` and `LUMEN_DATA_DIR`.
    pub fn from_env() -> Self {
        let configured_path = std::env::var("LUMEN_DB_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let data_dir = std::env::var("LUMEN_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
        Self::new(configured_path, data_dir)
    }

    pub fn fallback_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_DB_FILE)
    }

    /// Pick the backing file. An unusable configured path is downgraded to the
    /// fallback with a warning; only an unusable data directory is an error.
    pub fn resolve(&self) -> Result<PathBuf> {
        if let Some(path) = &self.configured_path {
            match ensure_writable_dir(parent_dir(path)) {
                Ok(()) => return Ok(path.clone()),
                Err(e) => warn!(
                    "Configured database path {} is not writable ({}), falling back to {}",
                    path.display(),
                    e,
                    self.fallback_path().display()
                ),
            }
        }

        ensure_writable_dir(&self.data_dir)?;
        Ok(self.fallback_path())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn ensure_writable_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;

    let probe = dir.join(format!(".lumen-write-probe-{}", std::process::id()));
    let written = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&probe)
        .and_then(|mut f| f.write_all(b"ok"));
    let _ = fs::remove_file(&probe);
    written
}

/// Owns the process's single [`Engine`] and its backing file.
///
/// Construct once at startup and share behind an `Arc`; every repository
/// goes through it, and no other component opens the file.
pub struct PersistenceManager {
    config: StorageConfig,
    slot: Mutex<Option<Arc<Engine>>>,
}

impl PersistenceManager {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Return the shared engine, loading or creating it on first use.
    ///
    /// The slot lock is held for the whole initialisation, so concurrent
    /// first callers wait for the one in-flight load instead of starting
    /// their own. A failed initialisation leaves the slot empty.
    pub fn acquire(&self) -> Result<Arc<Engine>> {
        let mut slot = self.slot.lock().map_err(|_| DbError::LockPoisoned)?;
        if let Some(engine) = slot.as_ref() {
            return Ok(Arc::clone(engine));
        }

        let engine = Arc::new(self.initialize()?);
        *slot = Some(Arc::clone(&engine));
        Ok(engine)
    }

    fn initialize(&self) -> Result<Engine> {
        let path = self.config.resolve()?;

        if path.exists() {
            info!("Loading database from {}", path.display());
            let engine = Engine::load(path)?;
            migrations::run(&engine)?;
            Ok(engine)
        } else {
            info!("Creating new database at {}", path.display());
            let engine = Engine::create(path)?;
            migrations::run(&engine)?;
            engine.write_snapshot()?;
            Ok(engine)
        }
    }

    /// Write the full engine state to the backing file. Returns only once the
    /// file has been replaced.
    pub fn snapshot(&self) -> Result<()> {
        let engine = self.acquire()?;
        engine.write_snapshot().inspect_err(|e| {
            error!("Snapshot failed, in-memory state is ahead of disk: {}", e);
        })
    }

    /// Final snapshot, then drop the engine. A later `acquire` reloads the file.
    pub fn release(&self) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| DbError::LockPoisoned)?;
        if let Some(engine) = slot.take() {
            engine.write_snapshot()?;
            info!("Database released ({})", engine.path().display());
        }
        Ok(())
    }

    /// Resolved backing file, once the engine has been acquired.
    pub fn backing_path(&self) -> Option<PathBuf> {
        self.slot
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|engine| engine.path().to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn configured_path_wins_when_writable() {
        let dir = tempfile::TempDir::new().unwrap();
        let configured = dir.path().join("nested").join("site.db");
        let config = StorageConfig::new(Some(configured.clone()), dir.path().join("data"));

        assert_eq!(config.resolve().unwrap(), configured);
        assert!(configured.parent().unwrap().is_dir());
    }

    #[test]
    fn unusable_configured_path_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        // A regular file cannot be used as a directory.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let config = StorageConfig::new(Some(blocker.join("site.db")), dir.path().join("data"));

        let resolved = config.resolve().unwrap();
        assert_eq!(resolved, dir.path().join("data").join(DEFAULT_DB_FILE));
        assert!(dir.path().join("data").is_dir());
    }

    #[test]
    fn first_acquire_creates_the_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let pm = PersistenceManager::new(StorageConfig::new(None, dir.path()));
        assert!(pm.backing_path().is_none());

        pm.acquire().unwrap();
        let path = pm.backing_path().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn concurrent_acquire_shares_one_engine() {
        let dir = tempfile::TempDir::new().unwrap();
        let pm = Arc::new(PersistenceManager::new(StorageConfig::new(None, dir.path())));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pm = Arc::clone(&pm);
                thread::spawn(move || pm.acquire().unwrap())
            })
            .collect();
        let engines: Vec<Arc<Engine>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for engine in &engines[1..] {
            assert!(Arc::ptr_eq(&engines[0], engine));
        }
    }

    #[test]
    fn release_then_acquire_reloads_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let pm = PersistenceManager::new(StorageConfig::new(None, dir.path()));

        let first = pm.acquire().unwrap();
        first
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO admins (id, username, password_hash, created_at)
                     VALUES ('a1', 'root', 'hash', '2026-01-01T00:00:00.000000Z')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        pm.release().unwrap();

        let second = pm.acquire().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        let count: i64 = second
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM admins", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }
}
