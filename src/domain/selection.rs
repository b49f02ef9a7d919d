//! Operator selection of the sources to merge

use std::path::PathBuf;

use crate::domain::entities::MIN_MERGE_SOURCES;
use crate::domain::error::DomainError;

/// Parsed answer to the "which files?" prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionInput {
    /// Leave the program
    Exit,
    /// Merge every listed file
    All,
    /// Zero-based indices into the listing, deduplicated, in input order
    Indices(Vec<usize>),
}

impl SelectionInput {
    /// Parse `input` against a listing of `available` files.
    ///
    /// Accepts `e` (exit), an empty line (all) or comma-separated 1-based
    /// numbers. Tokens that are not a listed number are skipped; an input
    /// without a single valid number is rejected.
    pub fn parse(input: &str, available: usize) -> Result<Self, DomainError> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("e") {
            return Ok(SelectionInput::Exit);
        }
        if input.is_empty() {
            return Ok(SelectionInput::All);
        }

        let mut indices = Vec::new();
        for token in input.split(',').map(str::trim) {
            let Ok(number) = token.parse::<usize>() else {
                continue;
            };
            if (1..=available).contains(&number) && !indices.contains(&(number - 1)) {
                indices.push(number - 1);
            }
        }

        if indices.is_empty() {
            return Err(DomainError::InvalidSelection(format!(
                "no valid file number in '{input}'"
            )));
        }
        Ok(SelectionInput::Indices(indices))
    }

    /// Resolve against the listed paths. `Exit` resolves to nothing.
    pub fn resolve(&self, listed: &[PathBuf]) -> Vec<PathBuf> {
        match self {
            SelectionInput::Exit => Vec::new(),
            SelectionInput::All => listed.to_vec(),
            SelectionInput::Indices(indices) => indices
                .iter()
                .filter_map(|&i| listed.get(i).cloned())
                .collect(),
        }
    }
}

/// Sources accepted for one merge request: unique, at least two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection(Vec<PathBuf>);

impl Selection {
    pub fn new(sources: Vec<PathBuf>) -> Result<Self, DomainError> {
        let mut unique: Vec<PathBuf> = Vec::with_capacity(sources.len());
        for source in sources {
            if !unique.contains(&source) {
                unique.push(source);
            }
        }

        if unique.len() < MIN_MERGE_SOURCES {
            return Err(DomainError::EmptySelection {
                required: MIN_MERGE_SOURCES,
                selected: unique.len(),
            });
        }
        Ok(Self(unique))
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("e", SelectionInput::Exit)]
    #[case(" E ", SelectionInput::Exit)]
    #[case("", SelectionInput::All)]
    #[case("   ", SelectionInput::All)]
    #[case("1, 2, 5", SelectionInput::Indices(vec![0, 1, 4]))]
    #[case("3,1", SelectionInput::Indices(vec![2, 0]))]
    #[case("2, 2, 9, x", SelectionInput::Indices(vec![1]))]
    fn test_parse_selection(#[case] input: &str, #[case] expected: SelectionInput) {
        assert_eq!(SelectionInput::parse(input, 5).unwrap(), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("6")]
    #[case("a, b")]
    #[case(",,")]
    fn given_no_valid_number_when_parse_then_invalid_selection(#[case] input: &str) {
        let result = SelectionInput::parse(input, 5);
        assert!(matches!(result, Err(DomainError::InvalidSelection(_))));
    }

    #[test]
    fn given_indices_when_resolve_then_maps_to_paths() {
        let listed = vec![
            PathBuf::from("a.kml"),
            PathBuf::from("b.kml"),
            PathBuf::from("c.kml"),
        ];
        let resolved = SelectionInput::Indices(vec![2, 0]).resolve(&listed);
        assert_eq!(resolved, vec![PathBuf::from("c.kml"), PathBuf::from("a.kml")]);
        assert_eq!(SelectionInput::All.resolve(&listed), listed);
        assert!(SelectionInput::Exit.resolve(&listed).is_empty());
    }

    #[test]
    fn given_single_source_when_selection_then_empty_selection_error() {
        let result = Selection::new(vec![PathBuf::from("a.kml")]);
        assert!(matches!(
            result,
            Err(DomainError::EmptySelection {
                required: 2,
                selected: 1
            })
        ));
    }

    #[test]
    fn given_duplicate_sources_when_selection_then_deduplicated_before_check() {
        let result = Selection::new(vec![PathBuf::from("a.kml"), PathBuf::from("a.kml")]);
        assert!(matches!(
            result,
            Err(DomainError::EmptySelection { selected: 1, .. })
        ));
    }

    #[test]
    fn given_two_sources_when_selection_then_accepted_in_order() {
        let selection =
            Selection::new(vec![PathBuf::from("b.kml"), PathBuf::from("a.kml")]).unwrap();
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.sources()[0], PathBuf::from("b.kml"));
    }
}
