//! Progress reporting for the migration pipeline.
//!
//! A migration runs through [`MigrationStage::Loading`],
//! [`MigrationStage::Cleaning`] and [`MigrationStage::Persisting`], then ends
//! in `Complete` or `Failed`. Callers observe it through a
//! [`ProgressReporter`], or a plain closure via [`ClosureProgressReporter`].

use serde::{Deserialize, Serialize};

/// Stages of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStage {
    /// Reading the workbook or CSV export
    Loading,
    /// Trimming headers, coercing dates, normalizing amounts
    Cleaning,
    /// Rewriting the table in SQLite
    Persisting,
    /// Migration finished
    Complete,
    /// Migration stopped with an error
    Failed,
}

impl MigrationStage {
    /// Human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Source",
            Self::Cleaning => "Cleaning Data",
            Self::Persisting => "Writing Database",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run spent in this stage.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.40,
            Self::Cleaning => 0.20,
            Self::Persisting => 0.40,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Overall progress when this stage starts.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::Cleaning => 0.40,
            Self::Persisting => 0.60,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }

    /// True for `Complete` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// A single progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: MigrationStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    pub message: String,

    /// Items done in the current stage (columns while cleaning)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    /// Update at `stage_progress` (0.0 - 1.0) through `stage`.
    pub fn new(stage: MigrationStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + stage.weight() * stage_progress.clamp(0.0, 1.0);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Update carrying `current` of `total` items.
    pub fn with_items(
        stage: MigrationStage,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let fraction = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::new(stage, fraction, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(MigrationStage::Complete, 1.0, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(MigrationStage::Failed, 0.0, message)
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

/// Receives progress updates from a running migration.
///
/// Implementations must be `Send + Sync` so one reporter can be shared
/// between runs.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}
