//! SynthBio Corpus
//!
//! Turns PMC article XML (JATS) into the plain-text files GraphRAG indexes:
//! - `xml`: a small element tree built from quick-xml events
//! - `jats`: title, identifiers, abstracts, body sections and tables
//! - `prepare`: batch conversion of a directory

pub mod error;
pub mod jats;
pub mod prepare;
pub mod xml;

pub use error::CorpusError;
pub use jats::{extract_table, extract_text, extract_text_from_str, TableFormat};
pub use prepare::{output_name, prepare_dir, PrepareReport};
