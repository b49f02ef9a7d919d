//! KML reading and writing on top of quick-xml

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{ParseError, ParseErrorKind};
pub use reader::{extract_streaming, extract_whole_document, KmlExtractor};
pub use writer::write_document;
