//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violated merge rules.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("at least {required} KML files are required to perform a merge, {selected} selected")]
    EmptySelection { required: usize, selected: usize },

    #[error("invalid selection: {0}")]
    InvalidSelection(String),
}

impl DomainError {
    /// The operator can correct the input and try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DomainError::EmptySelection { .. } | DomainError::InvalidSelection(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_errors_are_recoverable() {
        assert!(DomainError::EmptySelection {
            required: 2,
            selected: 1
        }
        .is_recoverable());
        assert!(DomainError::InvalidSelection("x".into()).is_recoverable());
    }
}
