//! Turning backend evidence into yes/no verdicts.
//!
//! Two extraction strategies exist, one per kind of [`Evidence`]:
//!
//! - [`text::extract`] matches "yes"/"no" in generated text and falls back to
//!   a configured verdict when neither appears.
//! - [`probability::extract`] sums the probability mass of "yes" and "no"
//!   candidate tokens and accepts only above a cutoff percentage.
//!
//! Both are pure. Unclear answers are reported on the returned [`Decision`]
//! and counted by the caller in a [`DecisionTally`].

pub mod probability;
pub mod text;
mod tally;

use std::fmt;
use std::str::FromStr;

pub use tally::DecisionTally;

use crate::backend::Evidence;

/// Default minimum "yes" percentage for probability-mode acceptance.
pub const DEFAULT_CUTOFF: f64 = 99.9;

/// A binary classification answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Yes,
    No,
}

impl Verdict {
    pub fn is_yes(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
        }
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(Self::Yes),
            "no" | "n" => Ok(Self::No),
            other => Err(format!("expected \"yes\" or \"no\", got {other:?}")),
        }
    }
}

/// The outcome of extracting a verdict from one backend response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub verdict: Verdict,
    /// "Yes" probability percentage, when the evidence carried probabilities.
    pub confidence: Option<f64>,
    /// Set when the verdict came from the fallback rather than the response.
    pub unclear: bool,
}

impl Decision {
    /// A decision read directly from the response.
    pub fn clear(verdict: Verdict) -> Self {
        Self {
            verdict,
            confidence: None,
            unclear: false,
        }
    }

    /// A decision that had to fall back to a default verdict.
    pub fn fallback(verdict: Verdict) -> Self {
        Self {
            verdict,
            confidence: None,
            unclear: true,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn accepted(&self) -> bool {
        self.verdict.is_yes()
    }
}

/// Parameters shared by both extraction strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    /// Minimum "yes" percentage (exclusive) in probability mode.
    pub cutoff: f64,
    /// Verdict used for text that mentions neither "yes" nor "no".
    pub fallback: Verdict,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            fallback: Verdict::No,
        }
    }
}

/// Dispatches evidence to the matching extractor.
pub fn decide(evidence: &Evidence, policy: &DecisionPolicy) -> Decision {
    match evidence {
        Evidence::Text(text) => text::extract(text, policy.fallback),
        Evidence::TokenLogprobs(candidates) => probability::extract(candidates, policy.cutoff),
    }
}
