//! Prompt construction for classification and description generation.

use crate::{Category, CategorySet, QuerySet};

/// System instruction sent with every classification prompt.
///
/// Sets the classifier persona: answer YES or NO, judge only where the sample
/// was taken from, stay objective, and read through small spelling mistakes.
pub const SYSTEM_PROMPT: &str = "You are Pretzel, an expert free-text classifier. Whenever you receive biological sample metadata and a \
category you carefully analyze whether the metadata fits the category and reply with a simple YES or NO.
You focus on where the sample is taken from and ignore the rest regardless of whether it fits a category.
You are very objective, you do not make assumptions about the data, neither do you have any bias.
However, you do realize you are standardizing free text fields that might have tiny spelling mistakes which you try to interpret.
";

/// Builds the user prompt asking whether `query` belongs to `category`.
///
/// The category description is included when it is non-empty.
///
/// # Examples
///
/// ```
/// use pretzel::Category;
/// use pretzel::prompt::classification_prompt;
///
/// let prompt = classification_prompt("marine sediment", &Category::new("Marine", "ocean-related"));
/// assert!(prompt.contains("Metadata: \"marine sediment\""));
/// assert!(prompt.contains("Category: \"Marine\""));
/// assert!(prompt.contains("ocean-related"));
/// ```
pub fn classification_prompt(query: &str, category: &Category) -> String {
    let description = if category.has_description() {
        format!("Category description: \"{}\"\n", category.description())
    } else {
        String::new()
    };

    format!(
        "You are an expert in categorizing biological samples. Given the following metadata description, \
determine if the sample belongs to the category specified. Respond only with \"YES\" or \"NO\".

Metadata: \"{query}\"
Category: \"{name}\"
{description}
The metadata is clearly a child of the category: [YES or NO]?
",
        name = category.name(),
    )
}

/// Builds the prompt asking the model to describe a class from examples.
pub fn description_prompt(class_name: &str, examples: &str) -> String {
    format!(
        "Describe the category {class_name} in one sentence, provide two examples. \
Examples of samples within this category are: {examples}"
    )
}

/// One prompt ready to be sent to a backend.
///
/// `id` tags the request so that batch outputs, which may come back in any
/// order, can be mapped back to the request that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub id: usize,
    pub system: Option<String>,
    pub user: String,
}

impl PromptRequest {
    pub fn new(id: usize, user: impl Into<String>) -> Self {
        Self {
            id,
            system: None,
            user: user.into(),
        }
    }

    /// Attaches a system instruction.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// The full query × category cross product as prompt requests.
///
/// Requests are ordered query-major: all categories of the first query, then
/// all categories of the second, and so on. Request ids are positions in
/// that order.
#[derive(Debug, Clone, Default)]
pub struct PromptBatch {
    requests: Vec<PromptRequest>,
    pairs: Vec<(String, Category)>,
}

impl PromptBatch {
    /// Builds one classification request per (query, category) pair.
    pub fn cross_product(queries: &QuerySet, categories: &CategorySet) -> Self {
        let capacity = queries.len() * categories.len();
        let mut requests = Vec::with_capacity(capacity);
        let mut pairs = Vec::with_capacity(capacity);

        for query in queries {
            for category in categories {
                let id = requests.len();
                requests.push(
                    PromptRequest::new(id, classification_prompt(query, category))
                        .with_system(SYSTEM_PROMPT),
                );
                pairs.push((query.clone(), category.clone()));
            }
        }

        Self { requests, pairs }
    }

    /// Total number of prompts, i.e. |queries| × |categories|.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[PromptRequest] {
        &self.requests
    }

    /// Returns the (query, category) pair behind a request id.
    pub fn pair(&self, id: usize) -> Option<(&str, &Category)> {
        self.pairs
            .get(id)
            .map(|(query, category)| (query.as_str(), category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> CategorySet {
        [
            Category::new("Marine", "ocean-related"),
            Category::named("Soil"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn classification_prompt_omits_empty_description() {
        let prompt = classification_prompt("soil sample", &Category::named("Soil"));

        assert!(prompt.contains("Category: \"Soil\""));
        assert!(!prompt.contains("Category description"));
        assert!(prompt.contains("[YES or NO]"));
    }

    #[test]
    fn classification_prompt_embeds_description() {
        let prompt = classification_prompt("sea water", &Category::new("Marine", "ocean-related"));
        assert!(prompt.contains("Category description: \"ocean-related\""));
    }

    #[test]
    fn system_prompt_sets_binary_answer_and_source_focus() {
        assert!(SYSTEM_PROMPT.contains("YES or NO"));
        assert!(SYSTEM_PROMPT.contains("where the sample is taken from"));
        assert!(SYSTEM_PROMPT.contains("spelling mistakes"));
    }

    #[test]
    fn description_prompt_includes_examples() {
        let prompt = description_prompt("Aquatic", "lake water, river sediment");

        assert!(prompt.starts_with("Describe the category Aquatic"));
        assert!(prompt.ends_with("lake water, river sediment"));
    }

    #[test]
    fn cross_product_covers_every_pair() {
        let queries: QuerySet = ["marine sediment", "garden soil", "blood"].into_iter().collect();
        let batch = PromptBatch::cross_product(&queries, &categories());

        assert_eq!(batch.len(), 6);
        for (position, request) in batch.requests().iter().enumerate() {
            assert_eq!(request.id, position);
            assert_eq!(request.system.as_deref(), Some(SYSTEM_PROMPT));
        }
    }

    #[test]
    fn pair_maps_request_ids_back_query_major() {
        let queries: QuerySet = ["a", "b"].into_iter().collect();
        let batch = PromptBatch::cross_product(&queries, &categories());

        let (query, category) = batch.pair(1).unwrap();
        assert_eq!(query, "a");
        assert_eq!(category.name(), "Soil");

        let (query, category) = batch.pair(2).unwrap();
        assert_eq!(query, "b");
        assert_eq!(category.name(), "Marine");

        assert!(batch.pair(4).is_none());
    }

    #[test]
    fn empty_inputs_give_empty_batch() {
        let batch = PromptBatch::cross_product(&QuerySet::new(), &categories());
        assert!(batch.is_empty());
    }
}
