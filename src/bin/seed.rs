//! Seed the herd book with a small demonstration herd.
//!
//! Three founders, a middle generation, a deliberately line-bred kid so
//! the genetic screen has something to flag, and one delivery recorded
//! through the normal path.

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use clap::Parser;
use herdbook::breeding::{self, NewKid};
use herdbook::db::Db;
use herdbook::pedigree::{store, ParentKind};
use herdbook::registry::{self, HealthStatus, NewAnimal, Sex};
use herdbook::{Config, HerdbookError};
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Populate the herd book with a demonstration herd")]
struct Args {
    /// Wipe existing animals and pedigree records first
    #[arg(short, long)]
    force: bool,
}

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
        .ok_or_else(|| anyhow::anyhow!("invalid date {}-{}-{}", y, m, d))
}

async fn herd_size(db: &Db) -> Result<i64> {
    let count = db
        .with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM animals", [], |row| row.get(0))
                .map_err(HerdbookError::Database)
        })
        .await?;
    Ok(count)
}

async fn register(
    db: &Db,
    tag: &str,
    dob: NaiveDate,
    sex: Sex,
    breed: &str,
    health: HealthStatus,
) -> Result<i64> {
    let animal = registry::create_animal(
        db,
        NewAnimal {
            tag_number: tag.to_string(),
            date_of_birth: dob,
            sex,
            breed: Some(breed.to_string()),
            health_status: health,
            notes: None,
        },
    )
    .await?;
    Ok(animal.id)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();
    log::info!("Seeding demonstration herd");

    let config = Config::load()?;
    let db = Db::new(config.db_path());

    db.migrate(Path::new("migrations")).await?;

    let existing = herd_size(&db).await?;
    if existing > 0 {
        if !args.force {
            log::warn!(
                "Herd book already holds {} animals. Run with --force to replace them.",
                existing
            );
            return Ok(());
        }
        db.with_connection(|conn| {
            conn.execute("DELETE FROM pedigree_edges", [])?;
            conn.execute("DELETE FROM animals", [])?;
            Ok(())
        })
        .await?;
        log::info!("Cleared {} existing animals", existing);
    }

    let today = Utc::now().date_naive();

    // Founders.
    let buck01 = register(&db, "BUCK-01", date(2019, 3, 14)?, Sex::Male, "Boer", HealthStatus::Healthy).await?;
    let doe01 = register(&db, "DOE-01", date(2019, 5, 2)?, Sex::Female, "Boer", HealthStatus::Healthy).await?;
    let doe02 = register(&db, "DOE-02", date(2020, 2, 20)?, Sex::Female, "Kiko", HealthStatus::Pregnant).await?;

    // Middle generation: both sired by BUCK-01, different dams.
    let doe10 = register(&db, "DOE-10", date(2021, 4, 18)?, Sex::Female, "Boer", HealthStatus::Healthy).await?;
    let buck10 = register(&db, "BUCK-10", date(2021, 6, 9)?, Sex::Male, "Boer-Kiko", HealthStatus::Healthy).await?;
    store::add_edge(&db, doe10, buck01, ParentKind::Sire).await?;
    store::add_edge(&db, doe10, doe01, ParentKind::Dam).await?;
    store::add_edge(&db, buck10, buck01, ParentKind::Sire).await?;
    store::add_edge(&db, buck10, doe02, ParentKind::Dam).await?;

    // Half siblings paired: their kid traces to BUCK-01 down both sides,
    // which the genetic screen should flag.
    let kid20 = register(&db, "KID-20", today - Duration::days(90), Sex::Female, "Boer", HealthStatus::Healthy).await?;
    store::add_edge(&db, kid20, buck10, ParentKind::Sire).await?;
    store::add_edge(&db, kid20, doe10, ParentKind::Dam).await?;

    // One delivery through the normal path: DOE-02 kids today, her dam
    // edge lands automatically, the sire is recorded afterwards.
    let delivery = breeding::record_delivery(
        &db,
        doe02,
        NewKid {
            tag_number: "KID-21".to_string(),
            sex: Sex::Male,
            breed: None,
        },
        today,
    )
    .await?;
    store::add_edge(&db, delivery.kid.id, buck01, ParentKind::Sire).await?;

    // Leave one doe expecting so the reproductive report has a pregnancy.
    registry::update_health(&db, doe10, HealthStatus::Pregnant).await?;

    log::info!("=== Seed complete ===");
    log::info!("Animals registered: {}", herd_size(&db).await?);
    log::info!("Try: report genetic        (KID-20 is line-bred through BUCK-01)");
    log::info!("Try: report reproductive");
    log::info!("Try: pedigree lineage {}   (KID-20's full ancestry)", kid20);

    Ok(())
}
