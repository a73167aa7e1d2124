//! Migration pipeline.
//!
//! Loads the export, cleans it and rewrites the sales table, reporting
//! progress along the way.

mod migration;
pub mod progress;

pub use migration::{Migration, MigrationBuilder, MigrationSummary};
pub use progress::{ClosureProgressReporter, MigrationStage, ProgressReporter, ProgressUpdate};
