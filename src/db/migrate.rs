//! Schema migrations.
//!
//! Migrations are numbered `.sql` files (`001_animals.sql`, ...) applied
//! in version order, each inside its own transaction. Applied names are
//! recorded in `schema_migrations`, so rerunning is a no-op.

use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

use crate::error::{HerdbookError, Result};

struct Migration {
    version: u32,
    name: String,
    sql: String,
}

fn bad_migration(path: &Path, reason: impl Into<String>) -> HerdbookError {
    HerdbookError::Migration {
        file: path.display().to_string(),
        reason: reason.into(),
    }
}

/// Names of migrations already recorded as applied, in version order.
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut names = Vec::new();
    for row in rows {
        names.push(row.map_err(HerdbookError::Database)?);
    }
    Ok(names)
}

/// Read every `.sql` file under `migrations_dir`, sorted by the numeric
/// prefix of its name.
fn load_migrations(migrations_dir: &Path) -> Result<Vec<Migration>> {
    let mut migrations = Vec::new();

    for entry in fs::read_dir(migrations_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("sql") {
            continue;
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| bad_migration(&path, "file name is not valid UTF-8"))?;
        let (prefix, _) = stem
            .split_once('_')
            .ok_or_else(|| bad_migration(&path, "expected a NNN_name.sql file name"))?;
        let version: u32 = prefix
            .parse()
            .map_err(|_| bad_migration(&path, "version prefix is not a number"))?;

        migrations.push(Migration {
            version,
            name: stem.to_string(),
            sql: fs::read_to_string(&path)?,
        });
    }

    migrations.sort_by_key(|m| m.version);
    Ok(migrations)
}

/// Apply every migration not yet recorded in `schema_migrations`.
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let applied = get_applied_migrations(conn)?;

    for migration in load_migrations(migrations_dir)? {
        if applied.iter().any(|name| name == &migration.name) {
            log::debug!("Migration {} already applied", migration.name);
            continue;
        }

        log::info!("Applying migration {}", migration.name);
        let tx = conn.transaction()?;

        // execute_batch: migration files hold several statements, and the
        // touch-trigger body carries its own semicolons.
        if let Err(e) = tx.execute_batch(&migration.sql) {
            return Err(HerdbookError::Migration {
                file: format!("{}.sql", migration.name),
                reason: e.to_string(),
            });
        }

        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sql_dir(temp_dir: &TempDir, files: &[(&str, &str)]) -> std::path::PathBuf {
        let dir = temp_dir.path().join("migrations");
        fs::create_dir(&dir).unwrap();
        for (name, sql) in files {
            fs::write(dir.join(name), sql).unwrap();
        }
        dir
    }

    #[test]
    fn test_applied_names_recorded_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let dir = sql_dir(
            &temp_dir,
            &[
                ("002_kids.sql", "CREATE TABLE kids (id INTEGER);"),
                ("001_does.sql", "CREATE TABLE does (id INTEGER);"),
            ],
        );
        let mut conn = Connection::open(temp_dir.path().join("herd.db")).unwrap();

        run_migrations(&mut conn, &dir).unwrap();
        let applied = get_applied_migrations(&conn).unwrap();
        assert_eq!(applied, vec!["001_does", "002_kids"]);
    }

    #[test]
    fn test_rejects_unnumbered_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = sql_dir(&temp_dir, &[("animals.sql", "CREATE TABLE t (id INTEGER);")]);
        let mut conn = Connection::open(temp_dir.path().join("herd.db")).unwrap();

        let err = run_migrations(&mut conn, &dir).unwrap_err();
        assert!(matches!(err, HerdbookError::Migration { .. }));
        assert!(err.to_string().contains("animals.sql"));
    }

    #[test]
    fn test_broken_sql_names_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = sql_dir(&temp_dir, &[("001_broken.sql", "CREATE TABL nope;")]);
        let mut conn = Connection::open(temp_dir.path().join("herd.db")).unwrap();

        let err = run_migrations(&mut conn, &dir).unwrap_err();
        assert!(matches!(err, HerdbookError::Migration { ref file, .. } if file == "001_broken.sql"));
        // Nothing was recorded for the failed file.
        assert!(get_applied_migrations(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_full_migration_schema() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let mut conn = Connection::open(&db_path).unwrap();

        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        run_migrations(&mut conn, &migrations_dir).unwrap();

        // Verify all tables exist
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .unwrap();

        assert!(tables.contains(&"animals".to_string()));
        assert!(tables.contains(&"pedigree_edges".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));

        // Verify the updated_at touch trigger exists
        let triggers: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='trigger'")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .unwrap();

        assert!(triggers.iter().any(|t| t.contains("animals_touch_updated_at")));

        // Verify lookup indexes from migration 003 exist
        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .unwrap();

        assert!(indexes.contains(&"idx_pedigree_edges_child".to_string()),
            "Traversal index idx_pedigree_edges_child should exist");
        assert!(indexes.contains(&"idx_pedigree_edges_parent".to_string()),
            "Traversal index idx_pedigree_edges_parent should exist");
        assert!(indexes.contains(&"idx_pedigree_edges_child_kind".to_string()),
            "One-parent-per-kind unique index should exist");
    }

    #[test]
    fn test_rerun_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let mut conn = Connection::open(&db_path).unwrap();

        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        run_migrations(&mut conn, &migrations_dir).unwrap();
        let applied_first = get_applied_migrations(&conn).unwrap();

        // Second run must skip everything already applied
        run_migrations(&mut conn, &migrations_dir).unwrap();
        let applied_second = get_applied_migrations(&conn).unwrap();

        assert_eq!(applied_first, applied_second);
    }
}
