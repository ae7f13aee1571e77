use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Offline sanity metric produced by the trainer. Has no effect on serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub k: usize,
    pub users_evaluated: usize,
    pub mean_precision_at_k: f64,
}

#[derive(Debug, Clone)]
pub struct MetricsCalculator {
    k: usize,
}

impl MetricsCalculator {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Hits among the first `k` recommendations, divided by `k`.
    ///
    /// Short recommendation lists are not rewarded: the denominator stays `k`.
    pub fn calculate_precision_at_k(&self, recommended: &[String], relevant: &[String]) -> f64 {
        if self.k == 0 {
            return 0.0;
        }

        let relevant_set: HashSet<&String> = relevant.iter().collect();
        let hits = recommended
            .iter()
            .take(self.k)
            .collect::<HashSet<_>>()
            .into_iter()
            .filter(|item| relevant_set.contains(item))
            .count();

        hits as f64 / self.k as f64
    }

    pub fn mean(scores: &[f64]) -> f64 {
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_precision_at_k() {
        let calculator = MetricsCalculator::new(5);
        let recommended = ids(&["V1", "V2", "V3"]);
        let relevant = ids(&["V1", "V3", "V9"]);

        let precision = calculator.calculate_precision_at_k(&recommended, &relevant);
        assert!((precision - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_precision_ignores_items_past_k() {
        let calculator = MetricsCalculator::new(1);
        let recommended = ids(&["V2", "V1"]);
        let relevant = ids(&["V1"]);
        assert_eq!(calculator.calculate_precision_at_k(&recommended, &relevant), 0.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(MetricsCalculator::mean(&[]), 0.0);
        assert!((MetricsCalculator::mean(&[0.2, 0.4]) - 0.3).abs() < 1e-9);
    }
}
