//! Grading and summary statistics for property inspections.
//!
//! The core is [`report::compute_inspection_grade`]: it tallies item
//! statuses across an [`model::Inspection`] and classifies the pass/fail
//! percentages against a [`grading::GradeTable`]. Everything else (config,
//! storage, rendering, CLI) feeds that function or consumes its output.

pub mod cli;
pub mod config;
pub mod error;
pub mod grading;
pub mod model;
pub mod report;
pub mod stats;
pub mod store;
pub mod util;
