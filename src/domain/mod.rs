//! Domain layer: entities and merge rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod document;
pub mod entities;
pub mod error;
pub mod node;
pub mod qname;
pub mod selection;

pub use document::{DocumentAssembler, MergedDocument};
pub use entities::*;
pub use error::DomainError;
pub use node::{Binding, Element, Placemark, XmlNode};
pub use qname::{QualifiedName, KML_NAMESPACE, PLACEMARK};
pub use selection::{Selection, SelectionInput};

/// Expand environment variables in a path string.
///
/// Supports `$VAR`, `${VAR}` and `~`. Uses shellexpand crate for robust expansion.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
