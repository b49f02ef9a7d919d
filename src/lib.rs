//! kmlmerge: merge placemark files (KML) exported from forensic extractions
//!
//! Layering (inner to outer): `domain` → `application` → `infrastructure` → `cli`.
//! Each layer wraps the errors of the one below it.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
