//! Herd-level analytics computed over the registry and pedigree graph.

pub mod genetic;
pub mod reproductive;

pub use genetic::{genetic_report, GeneticReport, InbreedingFlag};
pub use reproductive::{reproductive_report, ReproductiveReport};

/// Percentages and averages are reported at two decimal places.
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Month figures are reported at one decimal place.
pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
