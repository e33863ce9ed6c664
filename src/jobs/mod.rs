//! Job postings: the record type, sanitizing, deduplication and sources

pub mod dedup;
pub mod record;
pub mod sanitizer;
pub mod source;

pub use record::JobRecord;
pub use source::{JobSource, JsonFileSource, ScrapeServiceSource};
