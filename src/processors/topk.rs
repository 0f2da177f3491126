//! Top-k extraction from probability vectors.

/// One ranked entry: class index and its probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    pub index: usize,
    pub probability: f64,
}

/// Extracts the `k` most probable classes.
///
/// Ranking is deterministic: equal probabilities keep index order, so ties go
/// to the lowest index. NaN ranks below every number.
#[derive(Debug, Clone, Copy)]
pub struct Topk {
    k: usize,
}

impl Topk {
    /// Creates an extractor for the top `k` entries.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` is 0.
    pub fn new(k: usize) -> Result<Self, String> {
        if k == 0 {
            return Err("k must be greater than 0".to_string());
        }
        Ok(Self { k })
    }

    /// Returns up to `k` entries of `probs`, most probable first.
    pub fn select(&self, probs: &[f64]) -> Vec<Ranked> {
        let mut indexed: Vec<Ranked> = probs
            .iter()
            .enumerate()
            .map(|(index, &probability)| Ranked { index, probability })
            .collect();

        // sort_by is stable, which keeps ties in index order.
        indexed.sort_by(|a, b| match (a.probability.is_nan(), b.probability.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => b
                .probability
                .partial_cmp(&a.probability)
                .unwrap_or(std::cmp::Ordering::Equal),
        });
        indexed.truncate(self.k);
        indexed
    }
}
