use anyhow::Result;
use herdbook::db::{migrate, Db};
use herdbook::Config;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger from environment variable or default to info level
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    // Parse command-line arguments
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "migrate" => {
            run_migrations_only().await?;
        }
        _ => {
            // Default: migrate and verify the database schema
            run_schema_verification().await?;
        }
    }

    Ok(())
}

/// Apply pending migrations and report how many are in place.
async fn run_migrations_only() -> Result<()> {
    let config = Config::load()?;
    let db = Db::new(config.db_path());

    let applied = db.migrate(Path::new("migrations")).await?;
    log::info!("{} migrations applied", applied);

    Ok(())
}

/// Run database schema verification
async fn run_schema_verification() -> Result<()> {
    log::info!("Starting Herdbook v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Database path: {}", config.db_path().display());
    log::info!(
        "Inbreeding screen horizon: {} generations",
        config.inbreeding_generations()
    );

    // Initialize database
    let db = Db::new(config.db_path());

    // Run migrations
    db.migrate(Path::new("migrations")).await?;

    log::info!("Database initialized successfully");

    // Verify schema
    verify_database_schema(&db).await?;

    log::info!("Herd book ready");

    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    use herdbook::error::HerdbookError;

    db.with_connection(|conn| {
        // Check tables
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_tables = vec!["animals", "pedigree_edges", "schema_migrations"];
        let mut all_tables_exist = true;

        for table in &expected_tables {
            if !tables.iter().any(|t| t == table) {
                log::error!("Missing table: {}", table);
                all_tables_exist = false;
            } else {
                log::debug!("✓ Table exists: {}", table);
            }
        }

        if !all_tables_exist {
            return Err(HerdbookError::Config(
                "Not all required tables exist".to_string(),
            ));
        }

        // Check triggers
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='trigger' ORDER BY name")?;
        let triggers: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        if !triggers.iter().any(|t| t == "animals_touch_updated_at") {
            return Err(HerdbookError::Config(
                "Trigger 'animals_touch_updated_at' does not exist".to_string(),
            ));
        }
        log::debug!("✓ Trigger exists: animals_touch_updated_at");

        // Check migrations
        let applied = migrate::get_applied_migrations(conn)?;
        if applied.len() < 3 {
            return Err(HerdbookError::Config(format!(
                "Expected at least 3 migrations, found {}",
                applied.len()
            )));
        }
        log::debug!("✓ {} migrations applied", applied.len());

        // Check pedigree indexes
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name",
        )?;
        let indexes: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_indexes = vec![
            "idx_pedigree_edges_child",
            "idx_pedigree_edges_child_kind",
            "idx_pedigree_edges_parent",
        ];

        for index_name in &expected_indexes {
            if indexes.iter().any(|i| i == index_name) {
                log::debug!("✓ Index exists: {}", index_name);
            } else {
                log::warn!("Index not found: {}", index_name);
            }
        }

        // Check pragmas
        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(HerdbookError::Config(format!(
                "Journal mode is not WAL: {}",
                journal_mode
            )));
        }
        log::debug!("✓ Journal mode: WAL");

        let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if foreign_keys != 1 {
            return Err(HerdbookError::Config(
                "Foreign keys not enabled".to_string(),
            ));
        }
        log::debug!("✓ Foreign keys enabled");

        // Integrity check
        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(HerdbookError::Config(format!(
                "Database integrity check failed: {}",
                integrity
            )));
        }
        log::info!("✓ Database integrity: OK");

        Ok(())
    })
    .await?;

    log::info!("✓ Database schema verification complete");
    Ok(())
}
