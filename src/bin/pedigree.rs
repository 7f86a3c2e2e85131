//! Pedigree CLI: record, rewire, and inspect parent-child links.

use anyhow::Result;
use clap::{Parser, Subcommand};
use herdbook::db::Db;
use herdbook::pedigree::{self, store, Ancestry, ParentKind, Progeny};
use herdbook::Config;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "pedigree")]
#[command(about = "Inspect and edit the herd's parent-child records")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record an animal's sire or dam
    AddParent {
        /// Child animal id
        child: i64,
        /// Parent animal id
        parent: i64,
        /// Parental role: sire or dam
        kind: ParentKind,
    },
    /// Delete a recorded link by edge id
    RemoveParent {
        /// Edge id
        edge: i64,
    },
    /// Point an existing link at a different parent
    ReplaceParent {
        /// Edge id
        edge: i64,
        /// New parent animal id
        parent: i64,
    },
    /// Show an animal's full ancestry
    Lineage {
        /// Animal id
        animal: i64,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show an animal's full progeny
    Descendants {
        /// Animal id
        animal: i64,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show every animal with its direct parents
    Tree {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = Config::load()?;
    let db = Db::new(config.db_path());

    db.migrate(Path::new("migrations")).await?;

    match args.command {
        Command::AddParent {
            child,
            parent,
            kind,
        } => {
            let edge = store::add_edge(&db, child, parent, kind).await?;
            println!(
                "Edge {}: animal {} recorded as {} of animal {}",
                edge.id, edge.parent_id, edge.kind, edge.child_id
            );
        }
        Command::RemoveParent { edge } => {
            store::remove_edge(&db, edge).await?;
            println!("Edge {} removed", edge);
        }
        Command::ReplaceParent { edge, parent } => {
            let new = store::replace_edge(&db, edge, parent).await?;
            println!(
                "Edge {} replaced by {}: animal {} is now {} of animal {}",
                edge, new.id, new.parent_id, new.kind, new.child_id
            );
        }
        Command::Lineage { animal, json } => {
            let ancestry = pedigree::ancestors_of(&db, animal).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ancestry)?);
            } else {
                print_ancestry(&ancestry);
            }
        }
        Command::Descendants { animal, json } => {
            let progeny = pedigree::descendants_of(&db, animal).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&progeny)?);
            } else {
                print_progeny(&progeny);
            }
        }
        Command::Tree { json } => {
            let tree = pedigree::family_tree(&db).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            } else {
                print_tree(&tree);
            }
        }
    }

    Ok(())
}

fn print_ancestry(ancestry: &Ancestry) {
    println!(
        "\n=== Lineage of #{} (id {}) ===\n",
        ancestry.animal.tag_number, ancestry.animal.id
    );
    if ancestry.direct_parents.is_empty() {
        println!("No recorded parents.");
    } else {
        println!("Direct parents:");
        for parent in &ancestry.direct_parents {
            println!("  {:<5} #{} (id {})", parent.kind, parent.tag_number, parent.id);
        }
    }
    println!("\nAll known ancestors: {}", ancestry.total_ancestors);
    for (rank, ancestor) in ancestry.all_ancestors.iter().enumerate() {
        println!("  {:>3}. #{} (id {})", rank + 1, ancestor.tag_number, ancestor.id);
    }
    println!();
}

fn print_progeny(progeny: &Progeny) {
    println!(
        "\n=== Progeny of #{} (id {}) ===\n",
        progeny.animal.tag_number, progeny.animal.id
    );
    if progeny.direct_children.is_empty() {
        println!("No recorded offspring.");
    } else {
        println!("Direct offspring (role this animal played):");
        for child in &progeny.direct_children {
            println!("  {:<5} #{} (id {})", child.kind, child.tag_number, child.id);
        }
    }
    println!("\nAll known descendants: {}", progeny.total_descendants);
    for (rank, descendant) in progeny.all_descendants.iter().enumerate() {
        println!(
            "  {:>3}. #{} (id {})",
            rank + 1,
            descendant.tag_number,
            descendant.id
        );
    }
    println!();
}

fn print_tree(tree: &[pedigree::FamilyNode]) {
    println!("\n=== Herd family tree ({} animals) ===\n", tree.len());
    println!("{:-<60}", "");
    for node in tree {
        let parents = if node.parents.is_empty() {
            "no recorded parents".to_string()
        } else {
            node.parents
                .iter()
                .map(|p| format!("{} #{}", p.kind, p.tag_number))
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!("#{:<12} {}", node.animal.tag_number, parents);
    }
    println!("{:-<60}", "");
    println!();
}
