pub mod backend;
pub mod decision;
pub mod eval;
pub mod loader;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod writer;

pub use backend::{BackendError, DecisionBackend, Evidence, TextGenerator};
pub use decision::{Decision, DecisionTally, Verdict};
pub use loader::LoadError;
pub use models::{Category, CategorySet, Prediction, Predictions, QuerySet, clean_category_name};
pub use pipeline::{Describer, PipelineError, Predictor, Progress};
pub use writer::WriteError;
