//! Reporting CLI: genetic screen, reproductive statistics, herd overview.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use herdbook::db::Db;
use herdbook::error::HerdbookError;
use herdbook::reports;
use herdbook::Config;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "report")]
#[command(about = "Run herd analytics against the herd book")]
struct Args {
    /// Report to run: herd, genetic, or reproductive
    #[arg(default_value = "herd")]
    kind: String,

    /// Reporting date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Generations the inbreeding screen walks; defaults to the config value
    #[arg(long)]
    generations: Option<usize>,

    /// Emit JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = Config::load()?;
    let db = Db::new(config.db_path());

    db.migrate(Path::new("migrations")).await?;

    let as_of = args.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let generations = args.generations.unwrap_or(config.inbreeding_generations());

    match args.kind.as_str() {
        "genetic" => {
            let report = reports::genetic_report(&db, generations).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_genetic(&report, generations);
            }
        }
        "reproductive" => {
            let report = reports::reproductive_report(&db, as_of).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_reproductive(&report, as_of);
            }
        }
        "herd" => {
            let overview = herd_overview(&db).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
            } else {
                print_overview(&overview);
            }
        }
        other => anyhow::bail!("Unknown report '{}'. Expected herd, genetic, or reproductive.", other),
    }

    Ok(())
}

fn print_genetic(report: &reports::GeneticReport, generations: usize) {
    println!("\n=== Genetic Report ({} generations) ===\n", generations);
    println!(
        "Animals flagged for inbreeding risk: {}",
        report.flagged_inbreeding_count
    );

    if !report.flagged.is_empty() {
        println!("\n{:-<40}", "");
        println!("{:<12} {:>20}", "Animal id", "Ancestors known");
        println!("{:-<40}", "");
        for flag in &report.flagged {
            println!("{:<12} {:>20}", flag.animal_id, flag.ancestors_known);
        }
        println!("{:-<40}", "");
    }

    println!(
        "\nAverage known ancestors per animal: {}",
        report.avg_ancestors_known
    );
    println!();
}

fn print_reproductive(report: &reports::ReproductiveReport, as_of: NaiveDate) {
    println!("\n=== Reproductive Report (as of {}) ===\n", as_of);
    println!("Adult females:    {}", report.adult_females);
    println!("Pregnant females: {}", report.pregnant_females);
    println!("Prevalence:       {}%", report.pregnancy_prevalence);

    println!("\nBirths by month (trailing 12):");
    println!("{:-<30}", "");
    for (month, count) in &report.births_by_month {
        println!("  {}  {:>5}", month, count);
    }
    println!("{:-<30}", "");

    println!(
        "\nInter-birth intervals recorded: {}",
        report.inter_birth_intervals_months.len()
    );
    match report.avg_inter_birth_months {
        Some(avg) => println!("Average interval: {} months", avg),
        None => println!("Average interval: no dam has two recorded births yet"),
    }
    println!();
}

#[derive(Debug, serde::Serialize)]
struct HerdOverview {
    total_animals: i64,
    females: i64,
    males: i64,
    healthy: i64,
    sick: i64,
    pregnant: i64,
    injured: i64,
    sold: i64,
    dead: i64,
    pedigree_edges: i64,
}

async fn herd_overview(db: &Db) -> Result<HerdOverview> {
    let overview = db
        .with_connection(|conn| {
            let total_animals: i64 =
                conn.query_row("SELECT COUNT(*) FROM animals", [], |row| row.get(0))?;

            let count_where = |clause: &str| -> Result<i64, HerdbookError> {
                let sql = format!("SELECT COUNT(*) FROM animals WHERE {}", clause);
                conn.query_row(&sql, [], |row| row.get(0))
                    .map_err(HerdbookError::Database)
            };

            let females = count_where("sex = 'female'")?;
            let males = count_where("sex = 'male'")?;
            let healthy = count_where("health_status = 'healthy'")?;
            let sick = count_where("health_status = 'sick'")?;
            let pregnant = count_where("health_status = 'pregnant'")?;
            let injured = count_where("health_status = 'injured'")?;
            let sold = count_where("is_sold = 1")?;
            let dead = count_where("is_dead = 1")?;

            let pedigree_edges: i64 =
                conn.query_row("SELECT COUNT(*) FROM pedigree_edges", [], |row| row.get(0))?;

            Ok(HerdOverview {
                total_animals,
                females,
                males,
                healthy,
                sick,
                pregnant,
                injured,
                sold,
                dead,
                pedigree_edges,
            })
        })
        .await?;
    Ok(overview)
}

fn print_overview(overview: &HerdOverview) {
    println!("\n=== Herd Overview ===\n");
    println!("{:-<40}", "");
    println!("{:<25} {:>10}", "Total animals", overview.total_animals);
    println!("{:<25} {:>10}", "  Females", overview.females);
    println!("{:<25} {:>10}", "  Males", overview.males);
    println!("{:-<40}", "");
    println!("{:<25} {:>10}", "Healthy", overview.healthy);
    println!("{:<25} {:>10}", "Sick", overview.sick);
    println!("{:<25} {:>10}", "Pregnant", overview.pregnant);
    println!("{:<25} {:>10}", "Injured", overview.injured);
    println!("{:-<40}", "");
    println!("{:<25} {:>10}", "Sold", overview.sold);
    println!("{:<25} {:>10}", "Deceased", overview.dead);
    println!("{:<25} {:>10}", "Pedigree links", overview.pedigree_edges);
    println!("{:-<40}", "");
    println!();
}
