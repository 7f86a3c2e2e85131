//! Inbreeding screen over the pedigree graph.
//!
//! Loads the whole edge set once and works in memory: the walk runs
//! per animal and per parent, and hitting SQLite for each hop would
//! swamp the report. An animal is flagged when its first two recorded
//! parents share at least one ancestor within the configured number of
//! generations.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::db::Db;
use crate::error::{HerdbookError, Result};
use crate::reports::round2;

/// One animal flagged by the screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InbreedingFlag {
    pub animal_id: i64,
    /// Distinct ancestors of the flagged animal within the screened
    /// generations.
    pub ancestors_known: usize,
}

#[derive(Debug, Serialize)]
pub struct GeneticReport {
    pub flagged_inbreeding_count: usize,
    pub flagged: Vec<InbreedingFlag>,
    /// Mean depth-bounded ancestor count across the whole herd, two
    /// decimals, zero for an empty herd. A proxy for how complete the
    /// pedigree records are.
    pub avg_ancestors_known: f64,
}

/// Distinct ancestors reachable within `generations` parent hops.
///
/// Breadth first, so an animal recorded both near and deep counts from
/// its nearest occurrence and its own parents are still expanded. The
/// start animal is pre-visited and never counts as its own ancestor.
fn ancestors_within(
    parents: &HashMap<i64, Vec<i64>>,
    start: i64,
    generations: usize,
) -> HashSet<i64> {
    let mut found = HashSet::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();

    visited.insert(start);
    queue.push_back((start, 0usize));

    while let Some((id, depth)) = queue.pop_front() {
        if depth >= generations {
            continue;
        }
        if let Some(ids) = parents.get(&id) {
            for &parent in ids {
                if !visited.contains(&parent) {
                    visited.insert(parent);
                    found.insert(parent);
                    queue.push_back((parent, depth + 1));
                }
            }
        }
    }

    found
}

/// Screen the whole herd for inbreeding risk.
pub async fn genetic_report(db: &Db, generations: usize) -> Result<GeneticReport> {
    let (animal_ids, edges) = db
        .with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM animals ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
            let mut animal_ids = Vec::new();
            for row in rows {
                animal_ids.push(row.map_err(HerdbookError::Database)?);
            }

            let mut stmt =
                conn.prepare("SELECT child_id, parent_id FROM pedigree_edges ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut edges = Vec::new();
            for row in rows {
                edges.push(row.map_err(HerdbookError::Database)?);
            }

            Ok((animal_ids, edges))
        })
        .await?;

    // child -> parents, in edge-recording order. The first two entries
    // are the parents the screen compares.
    let mut parents: HashMap<i64, Vec<i64>> = HashMap::new();
    for (child_id, parent_id) in edges {
        parents.entry(child_id).or_default().push(parent_id);
    }

    let mut flagged = Vec::new();
    let mut total_ancestors_known = 0usize;

    for &id in &animal_ids {
        let ancestors = ancestors_within(&parents, id, generations);
        total_ancestors_known += ancestors.len();

        let direct = parents.get(&id).map(Vec::as_slice).unwrap_or(&[]);
        if direct.len() >= 2 {
            let side_a = ancestors_within(&parents, direct[0], generations);
            let side_b = ancestors_within(&parents, direct[1], generations);
            if !side_a.is_disjoint(&side_b) {
                flagged.push(InbreedingFlag {
                    animal_id: id,
                    ancestors_known: ancestors.len(),
                });
            }
        }
    }

    let avg_ancestors_known = if animal_ids.is_empty() {
        0.0
    } else {
        round2(total_ancestors_known as f64 / animal_ids.len() as f64)
    };

    log::debug!(
        "Genetic screen: {} of {} animals flagged within {} generations",
        flagged.len(),
        animal_ids.len(),
        generations
    );

    Ok(GeneticReport {
        flagged_inbreeding_count: flagged.len(),
        flagged,
        avg_ancestors_known,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pedigree::{store, ParentKind};
    use crate::registry::{self, HealthStatus, NewAnimal, Sex};
    use chrono::NaiveDate;
    use std::path::Path;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Db, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.migrate(&migrations_dir).await.unwrap();
        (db, temp_dir)
    }

    async fn animal(db: &Db, tag: &str) -> i64 {
        registry::create_animal(
            db,
            NewAnimal {
                tag_number: tag.to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                sex: Sex::Female,
                breed: None,
                health_status: HealthStatus::Healthy,
                notes: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn parent_map(edges: &[(i64, i64)]) -> HashMap<i64, Vec<i64>> {
        let mut map: HashMap<i64, Vec<i64>> = HashMap::new();
        for &(child, parent) in edges {
            map.entry(child).or_default().push(parent);
        }
        map
    }

    #[test]
    fn test_ancestors_within_depth_bound() {
        // 1 -> 2 -> 3 -> 4 -> 5, three generations stop at 4.
        let map = parent_map(&[(1, 2), (2, 3), (3, 4), (4, 5)]);
        let anc = ancestors_within(&map, 1, 3);
        assert_eq!(anc, HashSet::from([2, 3, 4]));
    }

    #[test]
    fn test_ancestors_within_nearest_occurrence_wins() {
        // 6 is both a great-grandparent (via 2 -> 3) and a direct parent
        // of 1. Seen from its nearest position it is one hop away, so its
        // own parent 7 still falls inside three generations.
        let map = parent_map(&[(1, 2), (1, 6), (2, 3), (3, 6), (6, 7)]);
        let anc = ancestors_within(&map, 1, 3);
        assert_eq!(anc, HashSet::from([2, 3, 6, 7]));
    }

    #[test]
    fn test_ancestors_within_excludes_start_on_cycle() {
        let map = parent_map(&[(1, 2), (2, 1)]);
        let anc = ancestors_within(&map, 1, 3);
        assert_eq!(anc, HashSet::from([2]));
    }

    #[tokio::test]
    async fn test_shared_grandfather_flags_kid() {
        let (db, _temp) = setup_test_db().await;
        let kid = animal(&db, "KID").await;
        let sire = animal(&db, "SIRE").await;
        let dam = animal(&db, "DAM").await;
        let grandsire = animal(&db, "GRANDSIRE").await;

        store::add_edge(&db, kid, sire, ParentKind::Sire).await.unwrap();
        store::add_edge(&db, kid, dam, ParentKind::Dam).await.unwrap();
        store::add_edge(&db, sire, grandsire, ParentKind::Sire).await.unwrap();
        store::add_edge(&db, dam, grandsire, ParentKind::Sire).await.unwrap();

        let report = genetic_report(&db, 3).await.unwrap();
        assert_eq!(report.flagged_inbreeding_count, 1);
        assert_eq!(
            report.flagged,
            vec![InbreedingFlag {
                animal_id: kid,
                ancestors_known: 3
            }]
        );
        // kid knows 3, sire and dam know 1 each, grandsire none: 5/4.
        assert_eq!(report.avg_ancestors_known, 1.25);
    }

    #[tokio::test]
    async fn test_unrelated_parents_not_flagged() {
        let (db, _temp) = setup_test_db().await;
        let kid = animal(&db, "KID").await;
        let sire = animal(&db, "SIRE").await;
        let dam = animal(&db, "DAM").await;
        let gs_a = animal(&db, "GS-A").await;
        let gs_b = animal(&db, "GS-B").await;

        store::add_edge(&db, kid, sire, ParentKind::Sire).await.unwrap();
        store::add_edge(&db, kid, dam, ParentKind::Dam).await.unwrap();
        store::add_edge(&db, sire, gs_a, ParentKind::Sire).await.unwrap();
        store::add_edge(&db, dam, gs_b, ParentKind::Sire).await.unwrap();

        let report = genetic_report(&db, 3).await.unwrap();
        assert_eq!(report.flagged_inbreeding_count, 0);
        assert!(report.flagged.is_empty());
    }

    #[tokio::test]
    async fn test_common_ancestor_beyond_horizon_not_flagged() {
        let (db, _temp) = setup_test_db().await;
        let kid = animal(&db, "KID").await;
        let sire = animal(&db, "SIRE").await;
        let dam = animal(&db, "DAM").await;
        // Two chains of three animals each, meeting only at the far end.
        let a1 = animal(&db, "A1").await;
        let a2 = animal(&db, "A2").await;
        let a3 = animal(&db, "A3").await;
        let b1 = animal(&db, "B1").await;
        let b2 = animal(&db, "B2").await;
        let b3 = animal(&db, "B3").await;
        let far = animal(&db, "FAR").await;

        store::add_edge(&db, kid, sire, ParentKind::Sire).await.unwrap();
        store::add_edge(&db, kid, dam, ParentKind::Dam).await.unwrap();
        for &(child, parent) in &[(sire, a1), (a1, a2), (a2, a3), (a3, far)] {
            store::add_edge(&db, child, parent, ParentKind::Sire).await.unwrap();
        }
        for &(child, parent) in &[(dam, b1), (b1, b2), (b2, b3), (b3, far)] {
            store::add_edge(&db, child, parent, ParentKind::Sire).await.unwrap();
        }

        // The shared animal sits four hops above each parent.
        let report = genetic_report(&db, 3).await.unwrap();
        assert_eq!(report.flagged_inbreeding_count, 0);

        let report = genetic_report(&db, 4).await.unwrap();
        assert_eq!(report.flagged_inbreeding_count, 1);
        assert_eq!(report.flagged[0].animal_id, kid);
    }

    #[tokio::test]
    async fn test_empty_herd() {
        let (db, _temp) = setup_test_db().await;
        let report = genetic_report(&db, 3).await.unwrap();
        assert_eq!(report.flagged_inbreeding_count, 0);
        assert!(report.flagged.is_empty());
        assert_eq!(report.avg_ancestors_known, 0.0);
    }

    #[tokio::test]
    async fn test_avg_counts_parentless_animals() {
        let (db, _temp) = setup_test_db().await;
        let kid = animal(&db, "KID").await;
        let dam = animal(&db, "DAM").await;
        store::add_edge(&db, kid, dam, ParentKind::Dam).await.unwrap();

        let report = genetic_report(&db, 3).await.unwrap();
        // One animal knows one ancestor, the other none.
        assert_eq!(report.avg_ancestors_known, 0.5);
    }
}
