//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (PlacemarkExtractor, Clock, etc.)
//! but are themselves concrete structs, not traits.

mod catalog;
mod merge;
mod output;

pub use catalog::CatalogService;
pub use merge::{MergeResult, MergeRun, MergeService};
pub use output::{OutputWriter, Published};
