//! Row extraction over a document snapshot.
//!
//! Runs on the HTML serialized from the live page: container discovery
//! picks the repeating row elements, the field extractor reads each
//! configured field out of every container, and the pass assembles the
//! surviving rows with their provenance.

pub mod discovery;
pub mod fields;
pub mod pass;
pub mod scan;

pub use pass::extract_rows;
pub use scan::scan_document;
