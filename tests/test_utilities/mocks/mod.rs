//! Mock implementations for testing
#![allow(dead_code)]

mod mock_progress_reporter;
mod mock_sbom_reader;
mod mock_source;

pub use mock_progress_reporter::MockProgressReporter;
pub use mock_sbom_reader::MockSbomReader;
pub use mock_source::{describe, MockRecord, MockSource};
