//! Pedigree edge writes and the rules that keep the graph well formed.
//!
//! Every mutation runs inside a transaction and re-checks the invariants
//! before touching the table: both animals must exist, an animal can never
//! be its own parent, the exact link must not already be recorded, and
//! each child holds at most one sire and one dam. The schema carries the
//! same rules as UNIQUE and CHECK constraints, so a racing writer that
//! slips past the pre-checks still cannot corrupt the graph.

use rusqlite::{params, Connection, Row};

use crate::db::Db;
use crate::error::{HerdbookError, Result};
use crate::pedigree::{ParentKind, PedigreeEdge};

const EDGE_COLUMNS: &str = "id, child_id, parent_id, kind";

pub(crate) fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<PedigreeEdge> {
    let kind: String = row.get(3)?;
    Ok(PedigreeEdge {
        id: row.get(0)?,
        child_id: row.get(1)?,
        parent_id: row.get(2)?,
        kind: kind.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
        })?,
    })
}

fn ensure_animal_exists(conn: &Connection, id: i64) -> Result<()> {
    let mut stmt = conn.prepare("SELECT 1 FROM animals WHERE id = ?1")?;
    if !stmt.exists(params![id])? {
        return Err(HerdbookError::AnimalNotFound { id });
    }
    Ok(())
}

/// Validate a prospective edge against the live table. Callers run this
/// inside the same transaction as the insert so the answer cannot go
/// stale between check and write.
fn check_edge_invariants(
    conn: &Connection,
    child_id: i64,
    parent_id: i64,
    kind: ParentKind,
) -> Result<()> {
    ensure_animal_exists(conn, child_id)?;
    ensure_animal_exists(conn, parent_id)?;

    if child_id == parent_id {
        return Err(HerdbookError::SelfParentage { id: child_id });
    }

    let mut stmt = conn.prepare(
        "SELECT 1 FROM pedigree_edges WHERE child_id = ?1 AND parent_id = ?2 AND kind = ?3",
    )?;
    if stmt.exists(params![child_id, parent_id, kind.as_str()])? {
        return Err(HerdbookError::DuplicateRelationship {
            child_id,
            parent_id,
            kind,
        });
    }

    let mut stmt =
        conn.prepare("SELECT id FROM pedigree_edges WHERE child_id = ?1 AND kind = ?2")?;
    match stmt.query_row(params![child_id, kind.as_str()], |row| row.get::<_, i64>(0)) {
        Ok(existing_edge_id) => Err(match kind {
            ParentKind::Dam => HerdbookError::DamAlreadyAssigned {
                child_id,
                existing_edge_id,
            },
            ParentKind::Sire => HerdbookError::SireAlreadyAssigned {
                child_id,
                existing_edge_id,
            },
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(()),
        Err(e) => Err(HerdbookError::Database(e)),
    }
}

/// Record `parent_id` as the sire or dam of `child_id`.
pub async fn add_edge(
    db: &Db,
    child_id: i64,
    parent_id: i64,
    kind: ParentKind,
) -> Result<PedigreeEdge> {
    let edge = db
        .with_connection(move |conn| {
            let tx = conn.transaction()?;
            check_edge_invariants(&tx, child_id, parent_id, kind)?;
            tx.execute(
                "INSERT INTO pedigree_edges (child_id, parent_id, kind) VALUES (?1, ?2, ?3)",
                params![child_id, parent_id, kind.as_str()],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(PedigreeEdge {
                id,
                child_id,
                parent_id,
                kind,
            })
        })
        .await?;

    log::info!(
        "Recorded animal {} as {} of animal {}",
        edge.parent_id,
        edge.kind,
        edge.child_id
    );
    Ok(edge)
}

/// Delete an edge by id.
pub async fn remove_edge(db: &Db, edge_id: i64) -> Result<()> {
    db.with_connection(move |conn| {
        let changed = conn.execute("DELETE FROM pedigree_edges WHERE id = ?1", params![edge_id])?;
        if changed == 0 {
            return Err(HerdbookError::EdgeNotFound { id: edge_id });
        }
        Ok(())
    })
    .await?;

    log::info!("Removed pedigree edge {}", edge_id);
    Ok(())
}

/// Point an existing edge at a different parent, keeping its child and
/// kind. Delete and insert happen in one transaction; if the new parent
/// fails validation the original edge survives untouched.
pub async fn replace_edge(db: &Db, edge_id: i64, new_parent_id: i64) -> Result<PedigreeEdge> {
    let edge = db
        .with_connection(move |conn| {
            let tx = conn.transaction()?;

            let (child_id, kind) = {
                let mut stmt =
                    tx.prepare("SELECT child_id, kind FROM pedigree_edges WHERE id = ?1")?;
                match stmt.query_row(params![edge_id], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                }) {
                    Ok((child_id, kind)) => {
                        let kind: ParentKind = kind.parse().map_err(|e: String| {
                            rusqlite::Error::FromSqlConversionFailure(
                                1,
                                rusqlite::types::Type::Text,
                                e.into(),
                            )
                        })?;
                        (child_id, kind)
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => {
                        return Err(HerdbookError::EdgeNotFound { id: edge_id });
                    }
                    Err(e) => return Err(HerdbookError::Database(e)),
                }
            };

            // Free the (child, kind) slot before re-validating, so pointing
            // at the new parent does not trip over the edge being replaced.
            tx.execute("DELETE FROM pedigree_edges WHERE id = ?1", params![edge_id])?;
            check_edge_invariants(&tx, child_id, new_parent_id, kind)?;
            tx.execute(
                "INSERT INTO pedigree_edges (child_id, parent_id, kind) VALUES (?1, ?2, ?3)",
                params![child_id, new_parent_id, kind.as_str()],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(PedigreeEdge {
                id,
                child_id,
                parent_id: new_parent_id,
                kind,
            })
        })
        .await?;

    log::info!(
        "Replaced edge {}: animal {} is now {} of animal {}",
        edge_id,
        edge.parent_id,
        edge.kind,
        edge.child_id
    );
    Ok(edge)
}

/// Edges naming `child_id` as the child, oldest first.
pub async fn edges_for_child(db: &Db, child_id: i64) -> Result<Vec<PedigreeEdge>> {
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pedigree_edges WHERE child_id = ?1 ORDER BY id",
            EDGE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![child_id], edge_from_row)?;
        let mut edges = Vec::new();
        for row in rows {
            edges.push(row.map_err(HerdbookError::Database)?);
        }
        Ok(edges)
    })
    .await
}

/// Edges naming `parent_id` as the parent, oldest first.
pub async fn edges_for_parent(db: &Db, parent_id: i64) -> Result<Vec<PedigreeEdge>> {
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pedigree_edges WHERE parent_id = ?1 ORDER BY id",
            EDGE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![parent_id], edge_from_row)?;
        let mut edges = Vec::new();
        for row in rows {
            edges.push(row.map_err(HerdbookError::Database)?);
        }
        Ok(edges)
    })
    .await
}
