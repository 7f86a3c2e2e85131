//! Animal registry: the record store the genealogy core reads.
//!
//! Owns the `animals` table. The pedigree modules treat these records as
//! reference data, reading sex, date of birth, and health status for
//! validation and statistics; the only write they perform back is the
//! health reset on delivery.

use chrono::NaiveDate;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::Db;
use crate::error::{HerdbookError, Result};

/// Biological sex of an animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            other => Err(format!("invalid sex: {}", other)),
        }
    }
}

/// Health state, as recorded by the herd operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Sick,
    Pregnant,
    Injured,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Sick => "sick",
            HealthStatus::Pregnant => "pregnant",
            HealthStatus::Injured => "injured",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "healthy" => Ok(HealthStatus::Healthy),
            "sick" => Ok(HealthStatus::Sick),
            "pregnant" => Ok(HealthStatus::Pregnant),
            "injured" => Ok(HealthStatus::Injured),
            other => Err(format!("invalid health status: {}", other)),
        }
    }
}

/// A registered animal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animal {
    pub id: i64,
    /// Human-facing herd tag, unique across the registry.
    pub tag_number: String,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
    pub breed: Option<String>,
    pub health_status: HealthStatus,
    pub is_sold: bool,
    pub date_sold: Option<NaiveDate>,
    pub is_dead: bool,
    pub date_of_death: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Fields required to register an animal. Lifecycle flags start cleared;
/// marking an animal sold or deceased belongs to the surrounding CRUD
/// layer, not this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAnimal {
    pub tag_number: String,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default = "default_health")]
    pub health_status: HealthStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_health() -> HealthStatus {
    HealthStatus::Healthy
}

/// Age in fractional years on the given date (365.25-day years).
pub fn age_years(date_of_birth: NaiveDate, on: NaiveDate) -> f64 {
    (on - date_of_birth).num_days() as f64 / 365.25
}

pub(crate) const ANIMAL_COLUMNS: &str =
    "id, tag_number, date_of_birth, sex, breed, health_status, \
     is_sold, date_sold, is_dead, date_of_death, notes";

/// Map one `animals` row (selected with [`ANIMAL_COLUMNS`]) to an [`Animal`].
pub(crate) fn animal_from_row(row: &Row<'_>) -> rusqlite::Result<Animal> {
    Ok(Animal {
        id: row.get(0)?,
        tag_number: row.get(1)?,
        date_of_birth: parse_date(row.get::<_, String>(2)?, 2)?,
        sex: parse_col(row.get::<_, String>(3)?, 3)?,
        breed: row.get(4)?,
        health_status: parse_col(row.get::<_, String>(5)?, 5)?,
        is_sold: row.get(6)?,
        date_sold: row
            .get::<_, Option<String>>(7)?
            .map(|s| parse_date(s, 7))
            .transpose()?,
        is_dead: row.get(8)?,
        date_of_death: row
            .get::<_, Option<String>>(9)?
            .map(|s| parse_date(s, 9))
            .transpose()?,
        notes: row.get(10)?,
    })
}

pub(crate) fn parse_date(s: String, idx: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

pub(crate) fn parse_col<T: FromStr<Err = String>>(s: String, idx: usize) -> rusqlite::Result<T> {
    s.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

/// Register a new animal. Fails with `DuplicateTag` if the tag number is
/// already taken.
pub async fn create_animal(db: &Db, new: NewAnimal) -> Result<Animal> {
    let animal = db
        .with_connection(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO animals (tag_number, date_of_birth, sex, breed, health_status, notes) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new.tag_number,
                    new.date_of_birth.format("%Y-%m-%d").to_string(),
                    new.sex.as_str(),
                    new.breed,
                    new.health_status.as_str(),
                    new.notes,
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(HerdbookError::DuplicateTag(new.tag_number));
                }
                Err(e) => return Err(HerdbookError::Database(e)),
            }

            let id = conn.last_insert_rowid();
            fetch_animal(conn, id)
        })
        .await?;

    log::debug!("Registered animal {} (#{})", animal.id, animal.tag_number);
    Ok(animal)
}

/// Fetch a single animal by id.
pub async fn get_animal(db: &Db, id: i64) -> Result<Animal> {
    db.with_connection(move |conn| fetch_animal(conn, id)).await
}

/// All animals in tag order.
pub async fn list_animals(db: &Db) -> Result<Vec<Animal>> {
    db.with_connection(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM animals ORDER BY tag_number",
            ANIMAL_COLUMNS
        ))?;
        let rows = stmt.query_map([], animal_from_row)?;
        let mut animals = Vec::new();
        for row in rows {
            animals.push(row.map_err(HerdbookError::Database)?);
        }
        Ok(animals)
    })
    .await
}

/// Update an animal's health status.
pub async fn update_health(db: &Db, id: i64, status: HealthStatus) -> Result<()> {
    db.with_connection(move |conn| {
        let changed = conn.execute(
            "UPDATE animals SET health_status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(HerdbookError::AnimalNotFound { id });
        }
        Ok(())
    })
    .await
}

/// Delete an animal. The pedigree foreign keys cascade, removing every
/// edge that names it as child or parent.
pub async fn delete_animal(db: &Db, id: i64) -> Result<()> {
    db.with_connection(move |conn| {
        let changed = conn.execute("DELETE FROM animals WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(HerdbookError::AnimalNotFound { id });
        }
        Ok(())
    })
    .await?;

    log::debug!("Deleted animal {} (pedigree edges cascade)", id);
    Ok(())
}

/// Connection-level fetch, shared with modules that compose multi-step
/// transactions (pedigree store, breeding).
pub(crate) fn fetch_animal(conn: &rusqlite::Connection, id: i64) -> Result<Animal> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM animals WHERE id = ?1",
        ANIMAL_COLUMNS
    ))?;
    let mut rows = stmt.query_map(params![id], animal_from_row)?;
    match rows.next() {
        Some(row) => row.map_err(HerdbookError::Database),
        None => Err(HerdbookError::AnimalNotFound { id }),
    }
}

pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn doe(tag: &str, dob: &str) -> NewAnimal {
        NewAnimal {
            tag_number: tag.to_string(),
            date_of_birth: NaiveDate::parse_from_str(dob, "%Y-%m-%d").unwrap(),
            sex: Sex::Female,
            breed: Some("Boer".to_string()),
            health_status: HealthStatus::Healthy,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_roundtrip() {
        let (db, _temp) = setup_test_db().await;

        let created = create_animal(&db, doe("G-001", "2022-03-15")).await.unwrap();
        assert!(created.id > 0);
        assert!(!created.is_sold);
        assert!(!created.is_dead);

        let fetched = get_animal(&db, created.id).await.unwrap();
        assert_eq!(fetched.tag_number, "G-001");
        assert_eq!(fetched.sex, Sex::Female);
        assert_eq!(
            fetched.date_of_birth,
            NaiveDate::from_ymd_opt(2022, 3, 15).unwrap()
        );
        assert_eq!(fetched.breed.as_deref(), Some("Boer"));
    }

    #[tokio::test]
    async fn test_duplicate_tag_rejected() {
        let (db, _temp) = setup_test_db().await;

        create_animal(&db, doe("G-001", "2022-03-15")).await.unwrap();
        let err = create_animal(&db, doe("G-001", "2023-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, HerdbookError::DuplicateTag(tag) if tag == "G-001"));
    }

    #[tokio::test]
    async fn test_get_missing_animal() {
        let (db, _temp) = setup_test_db().await;
        let err = get_animal(&db, 999).await.unwrap_err();
        assert!(matches!(err, HerdbookError::AnimalNotFound { id: 999 }));
    }

    #[tokio::test]
    async fn test_list_orders_by_tag() {
        let (db, _temp) = setup_test_db().await;

        create_animal(&db, doe("G-010", "2022-01-01")).await.unwrap();
        create_animal(&db, doe("G-002", "2022-01-01")).await.unwrap();
        create_animal(&db, doe("G-007", "2022-01-01")).await.unwrap();

        let tags: Vec<String> = list_animals(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.tag_number)
            .collect();
        assert_eq!(tags, vec!["G-002", "G-007", "G-010"]);
    }

    #[tokio::test]
    async fn test_update_health() {
        let (db, _temp) = setup_test_db().await;

        let animal = create_animal(&db, doe("G-001", "2021-06-01")).await.unwrap();
        update_health(&db, animal.id, HealthStatus::Pregnant)
            .await
            .unwrap();

        let fetched = get_animal(&db, animal.id).await.unwrap();
        assert_eq!(fetched.health_status, HealthStatus::Pregnant);

        let err = update_health(&db, 999, HealthStatus::Sick).await.unwrap_err();
        assert!(matches!(err, HerdbookError::AnimalNotFound { id: 999 }));
    }

    #[tokio::test]
    async fn test_delete_missing_animal() {
        let (db, _temp) = setup_test_db().await;
        let err = delete_animal(&db, 42).await.unwrap_err();
        assert!(matches!(err, HerdbookError::AnimalNotFound { id: 42 }));
    }

    #[test]
    fn test_age_years() {
        let dob = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let on = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        // 365 days is fractionally short of a 365.25-day year
        assert!(age_years(dob, on) > 0.99);
        assert!(age_years(dob, on) < 1.0);

        let on = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(age_years(dob, on) >= 2.0);
    }

    #[test]
    fn test_enum_parsing_case_insensitive() {
        assert_eq!("Female".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!(
            "PREGNANT".parse::<HealthStatus>().unwrap(),
            HealthStatus::Pregnant
        );
        assert!("unknown".parse::<HealthStatus>().is_err());
    }
}
