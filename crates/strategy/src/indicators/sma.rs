use aggregator::Bin;

/// Simple moving average of bin closes.
///
/// Returns `None` until `period` bins are available, or when any close in
/// the window is undefined.
#[derive(Debug, Clone)]
pub struct SmaIndicator {
    pub period: usize,
}

impl SmaIndicator {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// Compute the SMA over the last `period` bins (oldest first).
    pub fn compute(&self, bins: &[Bin]) -> Option<f64> {
        if self.period == 0 || bins.len() < self.period {
            return None;
        }
        let window = &bins[bins.len() - self.period..];
        let sum = window
            .iter()
            .map(Bin::close)
            .sum::<Option<f64>>()?;
        Some(sum / self.period as f64)
    }
}
