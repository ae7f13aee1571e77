pub mod metrics;
pub mod validation;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Indices of the `k` highest scores, best first.
///
/// Equal scores keep their original order, so the result is deterministic.
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    top_k_by(scores.iter().copied().enumerate(), k)
        .into_iter()
        .map(|(i, _)| i)
        .collect()
}

/// Stable descending selection over `(index, score)` pairs.
pub fn top_k_by<I>(scored: I, k: usize) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = (usize, f32)>,
{
    let mut indexed_scores: Vec<(usize, f32)> = scored.into_iter().collect();

    indexed_scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed_scores.truncate(k);
    indexed_scores
}
