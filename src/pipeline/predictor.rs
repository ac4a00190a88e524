use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{PipelineError, Progress};
use crate::backend::{DecisionBackend, Evidence};
use crate::decision::{self, DEFAULT_CUTOFF, DecisionPolicy, DecisionTally, Verdict};
use crate::prompt::PromptBatch;
use crate::{CategorySet, Prediction, Predictions, QuerySet, loader, writer};

/// Builder for constructing `Predictor` instances.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use pretzel::backend::ChatCompletionClientBuilder;
/// use pretzel::decision::Verdict;
/// use pretzel::pipeline::PredictorBuilder;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ChatCompletionClientBuilder::new().build()?;
/// let predictor = PredictorBuilder::new()
///     .backend(Arc::new(client))
///     .cutoff(99.5)
///     .fallback(Verdict::No)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct PredictorBuilder {
    backend: Option<Arc<dyn DecisionBackend>>,
    cutoff: Option<f64>,
    fallback: Option<Verdict>,
}

impl PredictorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend that answers classification prompts.
    pub fn backend(mut self, backend: Arc<dyn DecisionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the minimum "yes" percentage for probability-mode acceptance.
    /// Defaults to [`DEFAULT_CUTOFF`].
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    /// Sets the verdict used for responses that mention neither "yes" nor
    /// "no". Defaults to `No`.
    pub fn fallback(mut self, fallback: Verdict) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Builds the predictor.
    ///
    /// # Errors
    ///
    /// - `PipelineError::MissingBackend` if no backend was set.
    /// - `PipelineError::InvalidCutoff` unless the cutoff is a finite value in
    ///   `0..=100`.
    pub fn build(self) -> Result<Predictor, PipelineError> {
        let backend = self.backend.ok_or(PipelineError::MissingBackend)?;
        let cutoff = self.cutoff.unwrap_or(DEFAULT_CUTOFF);
        if !cutoff.is_finite() || !(0.0..=100.0).contains(&cutoff) {
            return Err(PipelineError::InvalidCutoff(cutoff));
        }

        Ok(Predictor {
            backend,
            policy: DecisionPolicy {
                cutoff,
                fallback: self.fallback.unwrap_or(Verdict::No),
            },
        })
    }
}

/// The outcome of a prediction run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionRun {
    pub predictions: Predictions,
    pub tally: DecisionTally,
}

/// Classifies queries against categories through a [`DecisionBackend`].
///
/// Every (query, category) pair is asked exactly once. A backend failure
/// aborts the run with no partial result.
pub struct Predictor {
    backend: Arc<dyn DecisionBackend>,
    policy: DecisionPolicy,
}

impl Predictor {
    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Classifies every query against every category.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Backend` on the first failed request.
    pub fn predict(&self, queries: &QuerySet, categories: &CategorySet) -> Result<PredictionRun, PipelineError> {
        self.predict_with_progress(queries, categories, |_| {})
    }

    /// Like [`Predictor::predict`], reporting progress after each decision.
    ///
    /// Predictions for a query follow category order, whichever path the
    /// backend takes.
    pub fn predict_with_progress(
        &self,
        queries: &QuerySet,
        categories: &CategorySet,
        mut on_progress: impl FnMut(Progress),
    ) -> Result<PredictionRun, PipelineError> {
        let batch = PromptBatch::cross_product(queries, categories);
        let total = batch.len();
        info!(
            queries = queries.len(),
            categories = categories.len(),
            prompts = total,
            "Starting prediction run"
        );

        let mut run = PredictionRun::default();
        let mut report = |completed| on_progress(Progress { completed, total });

        if self.backend.submits_batches() {
            let answers = self.batch_evidence(&batch, &mut report)?;
            for (id, evidence) in answers.iter().enumerate() {
                self.record(&batch, id, evidence, &mut run)?;
            }
        } else {
            for request in batch.requests() {
                let evidence = self.backend.evidence(request)?;
                self.record(&batch, request.id, &evidence, &mut run)?;
                debug!(completed = request.id + 1, total, "Prompt answered");
                report(request.id + 1);
            }
        }

        info!(
            accepted = run.tally.accepted,
            rejected = run.tally.rejected,
            unclear = run.tally.unclear,
            "Prediction run finished"
        );
        Ok(run)
    }

    /// Applies the decision policy to one response and records the outcome.
    fn record(
        &self,
        batch: &PromptBatch,
        request_id: usize,
        evidence: &Evidence,
        run: &mut PredictionRun,
    ) -> Result<(), PipelineError> {
        let (query, category) = batch
            .pair(request_id)
            .ok_or(PipelineError::MissingEvidence { request_id })?;

        let decision = decision::decide(evidence, &self.policy);
        if decision.unclear {
            warn!(query, category = category.name(), "Unclear response, using fallback");
        }
        run.tally.record(&decision);

        if decision.accepted() {
            debug!(
                query,
                category = category.name(),
                confidence = ?decision.confidence,
                "Category accepted"
            );
            run.predictions
                .push(query, Prediction::new(category.name(), decision.confidence));
        }
        Ok(())
    }

    /// Submits the whole batch in one call and puts the results back in
    /// request order. Progress is reported as the backend collects answers.
    fn batch_evidence(
        &self,
        batch: &PromptBatch,
        report: &mut dyn FnMut(usize),
    ) -> Result<Vec<Evidence>, PipelineError> {
        let tagged = self.backend.evidence_batch(batch.requests(), &mut |completed| {
            debug!(completed, total = batch.len(), "Prompt answered");
            report(completed);
        })?;
        let mut by_id: HashMap<usize, Evidence> = tagged
            .into_iter()
            .map(|tagged| (tagged.request_id, tagged.evidence))
            .collect();

        (0..batch.len())
            .map(|request_id| {
                by_id
                    .remove(&request_id)
                    .ok_or(PipelineError::MissingEvidence { request_id })
            })
            .collect()
    }

    /// Loads queries and categories, predicts, and writes the result table.
    ///
    /// Returns the run so the caller can report on it.
    ///
    /// # Errors
    ///
    /// Fails on unreadable or malformed input, on backend errors, and on
    /// write errors. Nothing is written unless prediction succeeded.
    pub fn run_files(
        &self,
        queries: impl AsRef<Path>,
        categories: impl AsRef<Path>,
        output: impl AsRef<Path>,
        on_progress: impl FnMut(Progress),
    ) -> Result<PredictionRun, PipelineError> {
        let queries = loader::read_queries(queries)?;
        let categories = loader::read_categories(categories)?;

        let run = self.predict_with_progress(&queries, &categories, on_progress)?;

        let rows = writer::write_predictions(output.as_ref(), &run.predictions)?;
        info!(rows, "Wrote predictions to {}", output.as_ref().display());
        info!("Number of unclear classifications: {}", run.tally.unclear);

        Ok(run)
    }
}
