//! Reproductive statistics for the herd.
//!
//! Takes the reporting date as a parameter rather than reading the
//! clock, so callers control the window and tests are deterministic.
//! Ages use 365.25-day years and intervals 30.44-day months, matching
//! how the herd books have always been kept.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::db::Db;
use crate::error::{HerdbookError, Result};
use crate::registry::{self, HealthStatus, Sex};
use crate::reports::{round1, round2};

const DAYS_PER_MONTH: f64 = 30.44;

/// An adult female is at least this many years old on the reporting date.
const ADULT_AGE_YEARS: f64 = 1.0;

#[derive(Debug, Serialize)]
pub struct ReproductiveReport {
    /// Share of adult females currently recorded pregnant, as a
    /// percentage with two decimals. Zero when there are no adult
    /// females.
    pub pregnancy_prevalence: f64,
    pub adult_females: usize,
    pub pregnant_females: usize,
    /// Births per calendar month over the trailing twelve months,
    /// current month included. Every month appears, zero or not, keyed
    /// "YYYY-MM" so the map iterates chronologically.
    pub births_by_month: BTreeMap<String, u32>,
    /// Gaps between consecutive births per dam, in months, pooled over
    /// the herd.
    pub inter_birth_intervals_months: Vec<f64>,
    /// Mean interval at one decimal. `None` only when no dam has two
    /// recorded births; a genuine zero-month mean is reported as such.
    pub avg_inter_birth_months: Option<f64>,
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Twelve zero-seeded buckets ending at the month of `today`.
fn month_buckets(today: NaiveDate) -> BTreeMap<String, u32> {
    let mut buckets = BTreeMap::new();
    let latest = today.year() * 12 + today.month() as i32 - 1;
    for back in 0..12 {
        let index = latest - back;
        let (year, month) = (index.div_euclid(12), index.rem_euclid(12) + 1);
        buckets.insert(format!("{:04}-{:02}", year, month), 0);
    }
    buckets
}

/// Compute the herd's reproductive report as of `today`.
pub async fn reproductive_report(db: &Db, today: NaiveDate) -> Result<ReproductiveReport> {
    let (animals, dam_births) = db
        .with_connection(|conn| {
            let mut stmt =
                conn.prepare("SELECT date_of_birth, sex, health_status FROM animals")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    registry::parse_date(row.get::<_, String>(0)?, 0)?,
                    registry::parse_col::<Sex>(row.get::<_, String>(1)?, 1)?,
                    registry::parse_col::<HealthStatus>(row.get::<_, String>(2)?, 2)?,
                ))
            })?;
            let mut animals: Vec<(NaiveDate, Sex, HealthStatus)> = Vec::new();
            for row in rows {
                animals.push(row.map_err(HerdbookError::Database)?);
            }

            // Every dam edge with the child's date of birth attached.
            let mut stmt = conn.prepare(
                "SELECT e.parent_id, a.date_of_birth \
                 FROM pedigree_edges e JOIN animals a ON a.id = e.child_id \
                 WHERE e.kind = 'dam'",
            )?;
            let rows = stmt.query_map([], |row| {
                let dam_id: i64 = row.get(0)?;
                let dob = registry::parse_date(row.get::<_, String>(1)?, 1)?;
                Ok((dam_id, dob))
            })?;
            let mut dam_births: Vec<(i64, NaiveDate)> = Vec::new();
            for row in rows {
                dam_births.push(row.map_err(HerdbookError::Database)?);
            }

            Ok((animals, dam_births))
        })
        .await?;

    let adult_females: Vec<_> = animals
        .iter()
        .filter(|(dob, sex, _)| {
            *sex == Sex::Female && registry::age_years(*dob, today) >= ADULT_AGE_YEARS
        })
        .collect();
    let pregnant_females = adult_females
        .iter()
        .filter(|(_, _, health)| *health == HealthStatus::Pregnant)
        .count();
    let pregnancy_prevalence = if adult_females.is_empty() {
        0.0
    } else {
        round2(pregnant_females as f64 / adult_females.len() as f64 * 100.0)
    };

    let mut births_by_month = month_buckets(today);
    for (dob, _, _) in &animals {
        if let Some(count) = births_by_month.get_mut(&month_key(*dob)) {
            *count += 1;
        }
    }

    // Group birth dates per dam, then take consecutive gaps.
    let mut litters: BTreeMap<i64, Vec<NaiveDate>> = BTreeMap::new();
    for (dam_id, dob) in dam_births {
        litters.entry(dam_id).or_default().push(dob);
    }

    let mut inter_birth_intervals_months = Vec::new();
    for dates in litters.values_mut() {
        dates.sort();
        for pair in dates.windows(2) {
            let days = (pair[1] - pair[0]).num_days() as f64;
            inter_birth_intervals_months.push(days / DAYS_PER_MONTH);
        }
    }

    let avg_inter_birth_months = if inter_birth_intervals_months.is_empty() {
        None
    } else {
        let sum: f64 = inter_birth_intervals_months.iter().sum();
        Some(round1(sum / inter_birth_intervals_months.len() as f64))
    };

    Ok(ReproductiveReport {
        pregnancy_prevalence,
        adult_females: adult_females.len(),
        pregnant_females,
        births_by_month,
        inter_birth_intervals_months,
        avg_inter_birth_months,
    })
}
