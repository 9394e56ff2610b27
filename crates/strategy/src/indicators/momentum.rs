use aggregator::Bin;

/// Weighted open-to-close rate of change over the last two bins.
///
/// score = p1 · change(last) + p2 · change(prior), where
/// change = close / open − 1.
#[derive(Debug, Clone)]
pub struct MomentumIndicator {
    pub p1: f64,
    pub p2: f64,
}

impl MomentumIndicator {
    pub fn new(p1: f64, p2: f64) -> Self {
        Self { p1, p2 }
    }

    /// Returns `None` with fewer than two bins or when either of the last
    /// two bins has no prices.
    pub fn compute(&self, bins: &[Bin]) -> Option<f64> {
        let [.., prior, last] = bins else {
            return None;
        };
        let prior_change = prior.prices?.change();
        let last_change = last.prices?.change();
        Some(self.p1 * last_change + self.p2 * prior_change)
    }
}
