use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

/// Pairwise cosine similarity between the rows of `matrix`.
///
/// Rows are processed in parallel on the current rayon pool. A row with no
/// interactions has zero norm and is 0-similar to everything, itself included.
pub fn cosine_similarity_matrix(matrix: &Array2<f32>) -> Array2<f32> {
    let n = matrix.nrows();
    let norms: Vec<f32> = matrix.outer_iter().map(|row| row.dot(&row).sqrt()).collect();

    let rows: Vec<Vec<f32>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let row_i = matrix.row(i);
            (0..n)
                .map(|j| {
                    if i == j {
                        return if norms[i] > 0.0 { 1.0 } else { 0.0 };
                    }
                    pair_similarity(row_i, matrix.row(j), norms[i], norms[j])
                })
                .collect()
        })
        .collect();

    let data: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n, n), data).unwrap_or_else(|_| Array2::zeros((n, n)))
}

fn pair_similarity(a: ArrayView1<f32>, b: ArrayView1<f32>, norm_a: f32, norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        a.dot(&b) / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::cosine_similarity;
    use ndarray::array;

    #[test]
    fn test_matches_pairwise_cosine() {
        let m = array![[1.0, 0.0, 2.0], [0.5, 0.5, 0.0], [2.0, 0.0, 4.0]];
        let sim = cosine_similarity_matrix(&m);

        assert_eq!(sim.dim(), (3, 3));
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j {
                    1.0
                } else {
                    cosine_similarity(m.row(i).as_slice().unwrap(), m.row(j).as_slice().unwrap())
                };
                assert!((sim[[i, j]] - expected).abs() < 1e-6, "({i},{j})");
            }
        }
        assert!((sim[[0, 2]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_symmetric_with_unit_diagonal() {
        let m = array![[0.3, 0.9, 0.0, 0.1], [0.0, 0.4, 0.4, 0.0], [0.7, 0.0, 0.2, 0.6]];
        let sim = cosine_similarity_matrix(&m);

        for i in 0..3 {
            assert_eq!(sim[[i, i]], 1.0);
            for j in 0..3 {
                assert_eq!(sim[[i, j]], sim[[j, i]]);
            }
        }
    }

    #[test]
    fn test_zero_row_is_zero_similar() {
        let m = array![[0.0, 0.0], [1.0, 1.0]];
        let sim = cosine_similarity_matrix(&m);
        assert_eq!(sim.row(0).to_vec(), vec![0.0, 0.0]);
        assert_eq!(sim[[1, 0]], 0.0);
        assert_eq!(sim[[1, 1]], 1.0);
    }
}
