//! End-to-end runs: prediction and description generation.
//!
//! - [`Predictor`] classifies every query against every category and returns
//!   the accepted categories per query.
//! - [`Describer`] turns class example tables into one-sentence category
//!   descriptions.
//!
//! Both hold their backend behind an `Arc<dyn Trait>` so tests can swap in a
//! mock.

mod describer;
mod predictor;

use thiserror::Error;

pub use describer::{DEFAULT_DESCRIPTION_TOKENS, Describer, DescriberBuilder, clean_generation};
pub use predictor::{PredictionRun, Predictor, PredictorBuilder};

use crate::backend::BackendError;
use crate::loader::LoadError;
use crate::writer::WriteError;

/// Errors that can occur during a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to load input: {0}")]
    Load(#[from] LoadError),

    #[error("Backend request failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Failed to write output: {0}")]
    Write(#[from] WriteError),

    #[error("Cutoff must be a percentage between 0 and 100, got {0}")]
    InvalidCutoff(f64),

    #[error("No backend configured")]
    MissingBackend,

    /// A batch response did not cover every submitted request.
    #[error("Backend returned no result for request {request_id}")]
    MissingEvidence { request_id: usize },
}

impl PipelineError {
    /// Whether the error was caused by the caller's input rather than the
    /// backend or the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Load(_) | Self::InvalidCutoff(_))
    }
}

/// How far a run has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Completion as a percentage. An empty run is complete.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}
