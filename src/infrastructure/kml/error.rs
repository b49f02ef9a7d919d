//! Per-source extraction errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A source could not be read or is not usable XML.
///
/// Always carries the source path; the coordinator records it against that
/// source and carries on with the others.
#[derive(Error, Debug)]
#[error("{}: {kind}", .source_path.display())]
pub struct ParseError {
    pub source_path: PathBuf,
    #[source]
    pub kind: ParseErrorKind,
}

#[derive(Error, Debug)]
pub enum ParseErrorKind {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: usize,
        source: quick_xml::Error,
    },

    #[error("malformed XML at byte {position}: {message}")]
    Structure { position: usize, message: String },
}

impl ParseError {
    pub fn new(source_path: impl Into<PathBuf>, kind: ParseErrorKind) -> Self {
        Self {
            source_path: source_path.into(),
            kind,
        }
    }
}

/// Attach a source path to a reader-level error.
pub(crate) trait ParseResultExt<T> {
    fn for_source(self, path: &std::path::Path) -> Result<T, ParseError>;
}

impl<T, E: Into<ParseErrorKind>> ParseResultExt<T> for Result<T, E> {
    fn for_source(self, path: &std::path::Path) -> Result<T, ParseError> {
        self.map_err(|e| ParseError::new(path, e.into()))
    }
}
