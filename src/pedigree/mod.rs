//! Parent-child relationship graph.
//!
//! Edges point child -> parent and are labelled sire or dam. The store
//! submodule owns writes and invariant checks; traversal walks the graph
//! in both directions.

pub mod store;
pub mod traversal;

pub use store::{add_edge, edges_for_child, edges_for_parent, remove_edge, replace_edge};
pub use traversal::{
    ancestors_of, descendants_of, family_tree, Ancestry, AnimalRef, FamilyNode, Progeny,
    RelatedAnimal,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which parental role an edge records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentKind {
    Sire,
    Dam,
}

impl ParentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentKind::Sire => "sire",
            ParentKind::Dam => "dam",
        }
    }
}

impl fmt::Display for ParentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sire" => Ok(ParentKind::Sire),
            "dam" => Ok(ParentKind::Dam),
            other => Err(format!("invalid parent kind: {}", other)),
        }
    }
}

/// One recorded parent-child link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedigreeEdge {
    pub id: i64,
    pub child_id: i64,
    pub parent_id: i64,
    pub kind: ParentKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_kind_strings() {
        assert_eq!(ParentKind::Sire.as_str(), "sire");
        assert_eq!(ParentKind::Dam.to_string(), "dam");
        assert_eq!("DAM".parse::<ParentKind>().unwrap(), ParentKind::Dam);
        assert!("mother".parse::<ParentKind>().is_err());
    }

    #[test]
    fn test_parent_kind_serde() {
        let json = serde_json::to_string(&ParentKind::Sire).unwrap();
        assert_eq!(json, "\"sire\"");
        let kind: ParentKind = serde_json::from_str("\"dam\"").unwrap();
        assert_eq!(kind, ParentKind::Dam);
    }
}
