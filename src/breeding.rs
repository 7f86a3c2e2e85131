//! Delivery recording.
//!
//! A delivery is one transaction: register the kid, reset the dam's
//! health, link the dam edge. Either all three land or none do, so a
//! failed step can never leave a kid without its maternal record.

use chrono::NaiveDate;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::error::{HerdbookError, Result};
use crate::pedigree::ParentKind;
use crate::registry::{self, Animal, HealthStatus, Sex};

/// Details of a newborn. Breed left empty inherits the dam's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewKid {
    pub tag_number: String,
    pub sex: Sex,
    #[serde(default)]
    pub breed: Option<String>,
}

/// Outcome of a recorded delivery: the kid as registered and the dam
/// after her health reset.
#[derive(Debug, Serialize)]
pub struct Delivery {
    pub kid: Animal,
    pub dam: Animal,
}

/// Record that `dam_id` delivered `kid` on `born_on`.
///
/// The dam must exist and be recorded pregnant; afterwards she is
/// healthy again and the kid carries a dam edge pointing at her.
pub async fn record_delivery(
    db: &Db,
    dam_id: i64,
    kid: NewKid,
    born_on: NaiveDate,
) -> Result<Delivery> {
    let delivery = db
        .with_connection(move |conn| {
            let tx = conn.transaction()?;

            let dam = registry::fetch_animal(&tx, dam_id)?;
            if dam.health_status != HealthStatus::Pregnant {
                return Err(HerdbookError::NotPregnant { id: dam_id });
            }

            let breed = kid.breed.or_else(|| dam.breed.clone());
            let notes = format!("Born from dam #{}", dam.tag_number);
            let inserted = tx.execute(
                "INSERT INTO animals (tag_number, date_of_birth, sex, breed, health_status, notes) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    kid.tag_number,
                    born_on.format("%Y-%m-%d").to_string(),
                    kid.sex.as_str(),
                    breed,
                    HealthStatus::Healthy.as_str(),
                    notes,
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if registry::is_unique_violation(&e) => {
                    return Err(HerdbookError::DuplicateTag(kid.tag_number));
                }
                Err(e) => return Err(HerdbookError::Database(e)),
            }
            let kid_id = tx.last_insert_rowid();

            tx.execute(
                "UPDATE animals SET health_status = ?1 WHERE id = ?2",
                params![HealthStatus::Healthy.as_str(), dam_id],
            )?;

            // A newborn has no edges yet, so this cannot collide with the
            // one-dam rule or duplicate an existing link.
            tx.execute(
                "INSERT INTO pedigree_edges (child_id, parent_id, kind) VALUES (?1, ?2, ?3)",
                params![kid_id, dam_id, ParentKind::Dam.as_str()],
            )?;

            let kid = registry::fetch_animal(&tx, kid_id)?;
            let dam = registry::fetch_animal(&tx, dam_id)?;
            tx.commit()?;
            Ok(Delivery { kid, dam })
        })
        .await?;

    log::info!(
        "Recorded delivery: kid #{} born to dam #{}",
        delivery.kid.tag_number,
        delivery.dam.tag_number
    );
    Ok(delivery)
}
