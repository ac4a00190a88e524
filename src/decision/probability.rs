//! Probability-mode verdict extraction for backends that return token
//! log-probabilities.
//!
//! A category is attached only when the "yes" mass is above the cutoff, and
//! never when "yes" and "no" are tied.

use super::{Decision, Verdict};
use crate::backend::TokenLogprob;

/// Converts a natural-log probability to a percentage rounded to two
/// decimals.
///
/// # Examples
///
/// ```
/// use pretzel::decision::probability::to_percent;
///
/// assert_eq!(to_percent(0.0), 100.0);
/// assert_eq!(to_percent(-0.01), 99.0);
/// ```
pub fn to_percent(logprob: f64) -> f64 {
    round_hundredths(logprob.exp() * 100.0)
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Probability mass, in percent, assigned to "yes" and "no" tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct YesNoMass {
    pub yes: f64,
    pub no: f64,
}

/// Sums the percentage mass of candidates equal to "yes" and to "no",
/// ignoring case. Other candidates are ignored.
pub fn yes_no_mass(candidates: &[TokenLogprob]) -> YesNoMass {
    let mut mass = YesNoMass::default();
    for candidate in candidates {
        let percent = to_percent(candidate.logprob);
        if candidate.token.eq_ignore_ascii_case("yes") {
            mass.yes += percent;
        } else if candidate.token.eq_ignore_ascii_case("no") {
            mass.no += percent;
        }
    }
    mass.yes = round_hundredths(mass.yes);
    mass.no = round_hundredths(mass.no);
    mass
}

/// Accepts when the "yes" mass is strictly above `cutoff`, unless the "yes"
/// and "no" masses are tied.
///
/// The returned decision carries the "yes" mass as its confidence. It is
/// never marked unclear: absent "yes" tokens simply mean zero mass.
pub fn extract(candidates: &[TokenLogprob], cutoff: f64) -> Decision {
    let mass = yes_no_mass(candidates);
    let verdict = if mass.yes > cutoff && mass.yes != mass.no {
        Verdict::Yes
    } else {
        Verdict::No
    };
    Decision::clear(verdict).with_confidence(mass.yes)
}
