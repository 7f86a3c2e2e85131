pub mod config;
pub mod error;
pub mod db;
pub mod registry;
pub mod pedigree;
pub mod breeding;
pub mod reports;

pub use config::Config;
pub use error::{HerdbookError, Result};
pub use pedigree::{ancestors_of, descendants_of, family_tree, ParentKind, PedigreeEdge};
