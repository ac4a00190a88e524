use super::Decision;

/// Running counts of decisions made during a prediction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionTally {
    pub accepted: usize,
    pub rejected: usize,
    /// Responses resolved through the fallback verdict.
    pub unclear: usize,
}

impl DecisionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one decision.
    pub fn record(&mut self, decision: &Decision) {
        if decision.accepted() {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
        if decision.unclear {
            self.unclear += 1;
        }
    }

    /// Total number of decisions recorded.
    pub fn total(&self) -> usize {
        self.accepted + self.rejected
    }
}
