// ⚠️ Error types for the entity/state core
//
// Storage and CLI layers use anyhow; these typed errors are what callers of
// the core match on.

use crate::schema::ValidationError;
use crate::units::Dimension;
use thiserror::Error;

/// Rejected state operations. The entity is left untouched in every case.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("unknown state '{requested}' for {owner} (expected one of: {})", .known.join(", "))]
    UnknownState {
        owner: String,
        requested: String,
        known: Vec<String>,
    },

    #[error("transition {from} -> {to} is not allowed for {owner}")]
    TransitionNotAllowed {
        owner: String,
        from: String,
        to: String,
    },

    #[error("{owner} declares no states")]
    NoStates { owner: String },

    #[error("{owner} declares state '{name}' more than once")]
    DuplicateState { owner: String, name: String },

    #[error("initial state '{initial}' is not declared by {owner}")]
    InvalidInitialState { owner: String, initial: String },

    #[error("stored transition {from} -> {to} does not start from current state '{current}'")]
    ReplayMismatch {
        from: String,
        to: String,
        current: String,
    },
}

/// Problems building or reading a parameter set
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("parameter '{0}' is not set")]
    Missing(String),

    #[error("parameter '{name}' is not declared for {kind}")]
    Unknown { kind: String, name: String },

    #[error("parameter '{name}' expects {expected}, got {found}")]
    DimensionMismatch {
        name: String,
        expected: Dimension,
        found: Dimension,
    },

    #[error("no parameter schema registered for '{0}'")]
    UnknownKind(String),

    #[error("parameter set for {kind} failed validation: {}", join_errors(.errors))]
    Invalid {
        kind: String,
        errors: Vec<ValidationError>,
    },

    #[error("parameter set is for '{found}', expected '{expected}'")]
    WrongKind { expected: String, found: String },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_state_message_lists_known_states() {
        let err = StateError::UnknownState {
            owner: "mooring_system".to_string(),
            requested: "Sunk".to_string(),
            known: vec!["LayDown".to_string(), "InSitu".to_string()],
        };

        let msg = err.to_string();
        assert!(msg.contains("Sunk"));
        assert!(msg.contains("LayDown, InSitu"));
    }

    #[test]
    fn test_invalid_parameters_message() {
        let err = ParameterError::Invalid {
            kind: "site".to_string(),
            errors: vec![ValidationError {
                field: "MeanSeaLevel".to_string(),
                message: "Must be positive".to_string(),
                context: "site".to_string(),
            }],
        };

        assert!(err.to_string().contains("[site] MeanSeaLevel: Must be positive"));
    }
}
