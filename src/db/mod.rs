//! SQLite access for the herd book.
//!
//! `Db` holds only the database path; every call opens a fresh connection
//! on the blocking pool, applies the standard pragmas, and hands it to a
//! closure. Foreign keys must be switched on per connection or the
//! pedigree cascade rules (delete an animal, lose its edges) silently
//! stop working.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tokio::task;

use crate::error::{HerdbookError, Result};

pub mod migrate;

/// Handle to the herd book database.
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
}

impl Db {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Bring the schema up to date from the numbered `.sql` files in
    /// `migrations_dir`. Returns how many migrations are in place
    /// afterwards, already-applied ones included.
    pub async fn migrate<P: AsRef<Path>>(&self, migrations_dir: P) -> Result<usize> {
        let dir = migrations_dir.as_ref().to_path_buf();
        self.with_connection(move |conn| {
            migrate::run_migrations(conn, &dir)?;
            Ok(migrate::get_applied_migrations(conn)?.len())
        })
        .await
    }

    /// Open a connection with the standard pragmas, on the calling thread.
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        Self::apply_pragmas(&conn)?;
        Ok(conn)
    }

    /// Run `f` against a fresh connection on the blocking pool.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path)?;
            Self::apply_pragmas(&conn)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            HerdbookError::Config(format!("Database task panicked or was cancelled: {}", e))
        })?
    }

    /// WAL for concurrent readers, NORMAL sync for speed, foreign keys ON
    /// so the edge cascades fire.
    fn apply_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA temp_store = MEMORY; \
             PRAGMA cache_size = -65536;",
        )?;
        Ok(())
    }
}
