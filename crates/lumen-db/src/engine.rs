use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName};
use tracing::debug;

use crate::error::{DbError, Result};

/// The live in-memory SQLite database for the process.
///
/// The connection never touches the backing file directly: it is filled from
/// the file with the online-backup API on load and copied back out on every
/// snapshot.
pub struct Engine {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl Engine {
    /// Empty in-memory database that will be persisted to `path`.
    pub(crate) fn create(path: PathBuf) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Read the whole backing file into a fresh in-memory database.
    pub(crate) fn load(path: PathBuf) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.restore(DatabaseName::Main, &path, None::<fn(Progress)>)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        f(&conn)
    }

    /// Copy the full database into a sibling temp file, then rename it over
    /// the backing file so readers never see a half-written snapshot.
    pub(crate) fn write_snapshot(&self) -> Result<()> {
        let tmp = snapshot_tmp_path(&self.path);
        let durability = |source: Box<dyn std::error::Error + Send + Sync>| DbError::Durability {
            path: self.path.clone(),
            source,
        };

        if tmp.exists() {
            fs::remove_file(&tmp).map_err(|e| durability(e.into()))?;
        }

        self.with_conn(|conn| {
            conn.backup(DatabaseName::Main, &tmp, None)
                .map_err(|e| durability(e.into()))
        })?;

        fs::rename(&tmp, &self.path).map_err(|e| durability(e.into()))?;
        debug!("Snapshot written to {}", self.path.display());
        Ok(())
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        self.schema_objects("table")
    }

    pub fn index_names(&self) -> Result<Vec<String>> {
        self.schema_objects("index")
    }

    fn schema_objects(&self, kind: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = ?1 AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )?;
            let names = stmt
                .query_map([kind], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(names)
        })
    }
}

fn snapshot_tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "lumen.db".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_is_a_sibling() {
        let tmp = snapshot_tmp_path(Path::new("/var/lib/lumen/site.db"));
        assert_eq!(tmp, PathBuf::from("/var/lib/lumen/site.db.tmp"));
    }

    #[test]
    fn snapshot_then_load_keeps_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("engine.db");

        let engine = Engine::create(path.clone()).unwrap();
        engine
            .with_conn(|conn| {
                conn.execute_batch(
                    "CREATE TABLE notes (id TEXT PRIMARY KEY, body TEXT NOT NULL);
                     INSERT INTO notes VALUES ('a', 'first');",
                )?;
                Ok(())
            })
            .unwrap();
        engine.write_snapshot().unwrap();
        assert!(path.exists());
        assert!(!snapshot_tmp_path(&path).exists());

        let reloaded = Engine::load(path).unwrap();
        let body: String = reloaded
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT body FROM notes WHERE id = 'a'", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(body, "first");
        assert_eq!(reloaded.table_names().unwrap(), vec!["notes".to_string()]);
    }
}
