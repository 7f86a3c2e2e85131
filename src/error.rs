use thiserror::Error;

use crate::pedigree::ParentKind;

/// Main error type for herdbook
#[derive(Error, Debug)]
pub enum HerdbookError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A migration file is misnamed or its SQL failed to apply
    #[error("Migration {file}: {reason}")]
    Migration { file: String, reason: String },

    /// Referenced animal does not exist
    #[error("Animal not found: {id}")]
    AnimalNotFound { id: i64 },

    /// Referenced pedigree edge does not exist
    #[error("Pedigree edge not found: {id}")]
    EdgeNotFound { id: i64 },

    /// Tag numbers are unique across the herd
    #[error("Tag number already in use: {0}")]
    DuplicateTag(String),

    /// Exact (child, parent, kind) edge already present
    #[error("Relationship already exists: animal {child_id} already lists {parent_id} as {kind}")]
    DuplicateRelationship {
        child_id: i64,
        parent_id: i64,
        kind: ParentKind,
    },

    /// Single-dam invariant: the existing edge must be removed explicitly first
    #[error("Animal {child_id} already has a dam assigned (edge {existing_edge_id}); remove it explicitly before assigning another")]
    DamAlreadyAssigned {
        child_id: i64,
        existing_edge_id: i64,
    },

    /// Single-sire invariant, symmetric to the dam rule
    #[error("Animal {child_id} already has a sire assigned (edge {existing_edge_id}); remove it explicitly before assigning another")]
    SireAlreadyAssigned {
        child_id: i64,
        existing_edge_id: i64,
    },

    /// An animal cannot be its own parent
    #[error("Animal {id} cannot be its own parent")]
    SelfParentage { id: i64 },

    /// Deliveries can only be recorded against pregnant dams
    #[error("Animal {id} is not pregnant; cannot record a delivery")]
    NotPregnant { id: i64 },
}

/// Convenient Result type using HerdbookError
pub type Result<T> = std::result::Result<T, HerdbookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HerdbookError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: HerdbookError = rusqlite_err.into();
        assert!(matches!(err, HerdbookError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HerdbookError = io_err.into();
        assert!(matches!(err, HerdbookError::Io(_)));
    }

    #[test]
    fn test_dam_already_assigned_points_at_existing_edge() {
        let err = HerdbookError::DamAlreadyAssigned {
            child_id: 7,
            existing_edge_id: 42,
        };
        let msg = err.to_string();
        assert!(msg.contains("dam"));
        assert!(msg.contains("42"));
        assert!(msg.contains("remove it explicitly"));
    }

    #[test]
    fn test_duplicate_relationship_names_kind() {
        let err = HerdbookError::DuplicateRelationship {
            child_id: 1,
            parent_id: 2,
            kind: ParentKind::Sire,
        };
        assert!(err.to_string().contains("sire"));
    }
}
