//! Text-match verdict extraction for backends that return generated text.

use super::{Decision, Verdict};

/// Extracts a verdict from generated text.
///
/// The text is lower-cased and searched for "yes" first, then "no". Text
/// containing neither resolves to `fallback` and is marked unclear.
///
/// # Examples
///
/// ```
/// use pretzel::decision::{Verdict, text};
///
/// assert_eq!(text::extract("Yes, this fits.", Verdict::No).verdict, Verdict::Yes);
/// assert!(text::extract("maybe", Verdict::No).unclear);
/// ```
pub fn extract(text: &str, fallback: Verdict) -> Decision {
    let lowered = text.to_lowercase();
    if lowered.contains("yes") {
        Decision::clear(Verdict::Yes)
    } else if lowered.contains("no") {
        Decision::clear(Verdict::No)
    } else {
        Decision::fallback(fallback)
    }
}
