use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use super::PipelineError;
use crate::backend::{SamplingParams, TextGenerator};
use crate::loader::{self, ClassExamples};
use crate::prompt::{PromptRequest, description_prompt};
use crate::{Category, CategorySet, writer};

/// Default generation length for a class description.
pub const DEFAULT_DESCRIPTION_TOKENS: u32 = 100;

/// Strips leaked chat-template tags from a generation.
///
/// Keeps only the text after the last `>` and trims it.
///
/// # Examples
///
/// ```
/// use pretzel::pipeline::clean_generation;
///
/// assert_eq!(
///     clean_generation("<|start_header_id|>assistant<|end_header_id|>\n\nSamples from lakes."),
///     "Samples from lakes."
/// );
/// assert_eq!(clean_generation("  Plain text. "), "Plain text.");
/// ```
pub fn clean_generation(text: &str) -> &str {
    let tail = match text.rfind('>') {
        Some(position) => &text[position + 1..],
        None => text,
    };
    tail.trim()
}

/// Builder for constructing `Describer` instances.
#[derive(Default)]
pub struct DescriberBuilder {
    generator: Option<Arc<dyn TextGenerator>>,
    max_tokens: Option<u32>,
}

impl DescriberBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Caps the length of each description. Defaults to
    /// [`DEFAULT_DESCRIPTION_TOKENS`].
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// # Errors
    ///
    /// Returns `PipelineError::MissingBackend` if no generator was set.
    pub fn build(self) -> Result<Describer, PipelineError> {
        Ok(Describer {
            generator: self.generator.ok_or(PipelineError::MissingBackend)?,
            params: SamplingParams::greedy(self.max_tokens.unwrap_or(DEFAULT_DESCRIPTION_TOKENS)),
        })
    }
}

/// Generates one-sentence category descriptions from example sources.
///
/// All prompts go to the generator as a single batch with greedy decoding.
/// The resulting [`CategorySet`] can be written with
/// [`crate::writer::write_descriptions`] and fed back to the predictor.
pub struct Describer {
    generator: Arc<dyn TextGenerator>,
    params: SamplingParams,
}

impl Describer {
    pub fn params(&self) -> &SamplingParams {
        &self.params
    }

    /// Describes every class, keeping the input order.
    ///
    /// # Errors
    ///
    /// - `PipelineError::Backend` if generation fails.
    /// - `PipelineError::MissingEvidence` if a class got no generation back.
    pub fn describe(&self, classes: &[ClassExamples]) -> Result<CategorySet, PipelineError> {
        let requests: Vec<PromptRequest> = classes
            .iter()
            .enumerate()
            .map(|(id, class)| PromptRequest::new(id, description_prompt(&class.class_name, &class.examples)))
            .collect();
        info!(classes = requests.len(), "Generating category descriptions");

        let mut by_id: HashMap<usize, String> = self
            .generator
            .generate_batch(&requests, &self.params)?
            .into_iter()
            .map(|generation| (generation.request_id, generation.text))
            .collect();

        let mut descriptions = CategorySet::new();
        for (request_id, class) in classes.iter().enumerate() {
            let text = by_id
                .remove(&request_id)
                .ok_or(PipelineError::MissingEvidence { request_id })?;
            let description = clean_generation(&text);
            debug!(class = %class.class_name, description, "Generated description");
            descriptions.insert(Category::new(&class.class_name, description));
        }

        Ok(descriptions)
    }

    /// Reads an example table, describes every class and writes the result
    /// as JSON.
    pub fn run_files(&self, examples: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<CategorySet, PipelineError> {
        let classes = loader::read_examples(examples)?;
        let descriptions = self.describe(&classes)?;

        writer::write_descriptions(output.as_ref(), &descriptions)?;
        info!(
            classes = descriptions.len(),
            "Wrote descriptions to {}",
            output.as_ref().display()
        );

        Ok(descriptions)
    }
}
