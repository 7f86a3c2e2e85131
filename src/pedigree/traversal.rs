//! BFS traversal over the pedigree graph.
//!
//! Both directions use the same shape: a worklist seeded with the start
//! animal, a visited set that also holds the start so it can never appear
//! in its own lineage, and first-seen ordering. Because the walk is
//! breadth first, direct parents and children land at the front of the
//! flattened lists. Cycles in recorded data (bad bookkeeping, not
//! biology) terminate instead of hanging.

use std::collections::{HashSet, VecDeque};

use rusqlite::params;
use serde::Serialize;

use crate::db::Db;
use crate::error::{HerdbookError, Result};
use crate::pedigree::ParentKind;
use crate::registry::{self, Animal};

/// Lightweight handle to an animal inside a lineage listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimalRef {
    pub id: i64,
    pub tag_number: String,
}

/// An animal one edge away, annotated with the parental role the edge
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedAnimal {
    pub id: i64,
    pub tag_number: String,
    pub kind: ParentKind,
}

/// Full upward view from one animal.
#[derive(Debug, Serialize)]
pub struct Ancestry {
    pub animal: Animal,
    pub direct_parents: Vec<RelatedAnimal>,
    /// Every distinct ancestor, direct parents first, then grandparents,
    /// and so on outward.
    pub all_ancestors: Vec<AnimalRef>,
    pub total_ancestors: usize,
}

/// Full downward view from one animal.
#[derive(Debug, Serialize)]
pub struct Progeny {
    pub animal: Animal,
    pub direct_children: Vec<RelatedAnimal>,
    pub all_descendants: Vec<AnimalRef>,
    pub total_descendants: usize,
}

/// One entry of the whole-herd family tree.
#[derive(Debug, Serialize)]
pub struct FamilyNode {
    pub animal: Animal,
    pub parents: Vec<RelatedAnimal>,
}

const PARENTS_OF_SQL: &str = "SELECT e.parent_id, a.tag_number, e.kind \
                              FROM pedigree_edges e JOIN animals a ON a.id = e.parent_id \
                              WHERE e.child_id = ?1 ORDER BY e.id";

const CHILDREN_OF_SQL: &str = "SELECT e.child_id, a.tag_number, e.kind \
                               FROM pedigree_edges e JOIN animals a ON a.id = e.child_id \
                               WHERE e.parent_id = ?1 ORDER BY e.id";

fn related_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RelatedAnimal> {
    let kind: String = row.get(2)?;
    Ok(RelatedAnimal {
        id: row.get(0)?,
        tag_number: row.get(1)?,
        kind: kind.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
        })?,
    })
}

async fn neighbours(db: &Db, sql: &'static str, animal_id: i64) -> Result<Vec<RelatedAnimal>> {
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(sql).map_err(HerdbookError::Database)?;
        let rows = stmt
            .query_map(params![animal_id], related_from_row)
            .map_err(HerdbookError::Database)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(HerdbookError::Database)?);
        }
        Ok(out)
    })
    .await
}

/// Walk every recorded ancestor of an animal.
pub async fn ancestors_of(db: &Db, animal_id: i64) -> Result<Ancestry> {
    let animal = registry::get_animal(db, animal_id).await?;
    let direct_parents = neighbours(db, PARENTS_OF_SQL, animal_id).await?;

    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut all_ancestors = Vec::new();

    // The start animal is marked visited up front, so even a cyclic
    // record can never list an animal as its own ancestor.
    visited.insert(animal_id);
    for parent in &direct_parents {
        if !visited.contains(&parent.id) {
            visited.insert(parent.id);
            queue.push_back(parent.id);
            all_ancestors.push(AnimalRef {
                id: parent.id,
                tag_number: parent.tag_number.clone(),
            });
        }
    }

    while let Some(current) = queue.pop_front() {
        for parent in neighbours(db, PARENTS_OF_SQL, current).await? {
            if !visited.contains(&parent.id) {
                visited.insert(parent.id);
                queue.push_back(parent.id);
                all_ancestors.push(AnimalRef {
                    id: parent.id,
                    tag_number: parent.tag_number,
                });
            }
        }
    }

    let total_ancestors = all_ancestors.len();
    Ok(Ancestry {
        animal,
        direct_parents,
        all_ancestors,
        total_ancestors,
    })
}

/// Walk every recorded descendant of an animal.
pub async fn descendants_of(db: &Db, animal_id: i64) -> Result<Progeny> {
    let animal = registry::get_animal(db, animal_id).await?;
    let direct_children = neighbours(db, CHILDREN_OF_SQL, animal_id).await?;

    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut all_descendants = Vec::new();

    visited.insert(animal_id);
    for child in &direct_children {
        if !visited.contains(&child.id) {
            visited.insert(child.id);
            queue.push_back(child.id);
            all_descendants.push(AnimalRef {
                id: child.id,
                tag_number: child.tag_number.clone(),
            });
        }
    }

    while let Some(current) = queue.pop_front() {
        for child in neighbours(db, CHILDREN_OF_SQL, current).await? {
            if !visited.contains(&child.id) {
                visited.insert(child.id);
                queue.push_back(child.id);
                all_descendants.push(AnimalRef {
                    id: child.id,
                    tag_number: child.tag_number,
                });
            }
        }
    }

    let total_descendants = all_descendants.len();
    Ok(Progeny {
        animal,
        direct_children,
        all_descendants,
        total_descendants,
    })
}

/// Every animal in tag order, each with its direct parents. One blocking
/// task with a reused prepared statement, since this touches the whole
/// herd.
pub async fn family_tree(db: &Db) -> Result<Vec<FamilyNode>> {
    db.with_connection(|conn| {
        let animals = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM animals ORDER BY tag_number",
                registry::ANIMAL_COLUMNS
            ))?;
            let rows = stmt.query_map([], registry::animal_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(HerdbookError::Database)?);
            }
            out
        };

        let mut parents_stmt = conn.prepare(PARENTS_OF_SQL)?;
        let mut nodes = Vec::with_capacity(animals.len());
        for animal in animals {
            let rows = parents_stmt.query_map(params![animal.id], related_from_row)?;
            let mut parents = Vec::new();
            for row in rows {
                parents.push(row.map_err(HerdbookError::Database)?);
            }
            nodes.push(FamilyNode { animal, parents });
        }
        Ok(nodes)
    })
    .await
}
