pub mod encoder;
pub mod similarity;

use ndarray::{Array1, Axis};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::artifacts::ArtifactSet;
use crate::error::RecommendError;
use crate::utils::top_k_by;
use crate::utils::validation::UserId;

pub const DEFAULT_NEIGHBORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredVideo {
    pub index: usize,
    pub video_id: String,
    pub score: f32,
}

/// Everything `recommend` decided for one user, best video first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub user: UserId,
    pub row: usize,
    pub neighbors: Vec<usize>,
    pub videos: Vec<ScoredVideo>,
    /// Every candidate was already watched, so nothing was masked.
    pub fallback: bool,
}

impl Ranking {
    pub fn video_ids(&self) -> Vec<String> {
        self.videos.iter().map(|v| v.video_id.clone()).collect()
    }
}

/// User-based collaborative filtering over an immutable artifact snapshot.
#[derive(Debug, Clone)]
pub struct CollaborativeFiltering {
    artifacts: Arc<ArtifactSet>,
    neighbors: usize,
}

impl CollaborativeFiltering {
    pub fn new(artifacts: Arc<ArtifactSet>, neighbors: usize) -> Self {
        Self {
            artifacts,
            neighbors,
        }
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    /// Top `top_k` unseen videos for `user_id`.
    ///
    /// A malformed id is an error; a well-formed id missing from the model
    /// yields an empty list.
    pub fn recommend(&self, user_id: &str, top_k: usize) -> Result<Vec<String>, RecommendError> {
        Ok(self
            .rank(user_id, top_k)?
            .map(|ranking| ranking.video_ids())
            .unwrap_or_default())
    }

    /// `None` when the user is not part of the model.
    pub fn rank(&self, user_id: &str, top_k: usize) -> Result<Option<Ranking>, RecommendError> {
        let user = UserId::parse(user_id)?;
        Ok(self.rank_user(user, top_k))
    }

    pub fn rank_user(&self, user: UserId, top_k: usize) -> Option<Ranking> {
        let row = self.artifacts.encoders().users.transform(&user.to_string())?;
        let neighbors = self.nearest_neighbors(row);

        let Some(scores) = self.candidate_scores(&neighbors) else {
            debug!(%user, "No other users in the model, nothing to recommend");
            return Some(Ranking {
                user,
                row,
                neighbors,
                videos: Vec::new(),
                fallback: false,
            });
        };

        let watched = self.artifacts.interactions().row(row);
        let unwatched: Vec<usize> = (0..scores.len()).filter(|&j| watched[j] <= 0.0).collect();

        let fallback = unwatched.is_empty();
        let candidates: Vec<usize> = if fallback {
            (0..scores.len()).collect()
        } else {
            unwatched
        };

        let videos = top_k_by(candidates.into_iter().map(|j| (j, scores[j])), top_k)
            .into_iter()
            .filter_map(|(index, score)| {
                let video_id = self.artifacts.encoders().videos.inverse_transform(index)?;
                Some(ScoredVideo {
                    index,
                    video_id: video_id.to_string(),
                    score,
                })
            })
            .collect();

        debug!(%user, ?neighbors, fallback, "Ranked candidate videos");

        Some(Ranking {
            user,
            row,
            neighbors,
            videos,
            fallback,
        })
    }

    /// The most similar other users, by descending similarity. Ties keep row
    /// order. The user's own row is never returned.
    pub fn nearest_neighbors(&self, row: usize) -> Vec<usize> {
        let similarities = self.artifacts.similarity().row(row);
        let others = similarities
            .iter()
            .copied()
            .enumerate()
            .filter(|&(i, _)| i != row);

        top_k_by(others, self.neighbors)
            .into_iter()
            .map(|(i, _)| i)
            .collect()
    }

    /// Per-video mean of the neighbours' interaction rows.
    pub fn candidate_scores(&self, neighbors: &[usize]) -> Option<Array1<f32>> {
        self.artifacts
            .interactions()
            .select(Axis(0), neighbors)
            .mean_axis(Axis(0))
    }
}

#[cfg(test)]
mod tests {
    use super::encoder::{Encoders, LabelEncoder};
    use super::*;
    use ndarray::{array, Array2};

    /// U0001 has watched video7; its five nearest neighbours score
    /// video7 0.8, video2 0.5, video9 0.5 on average.
    fn example_model() -> CollaborativeFiltering {
        let users: Vec<String> = (1..=7).map(|n| UserId::new(n).to_string()).collect();
        let encoders = Encoders {
            users: LabelEncoder::fit(users),
            videos: LabelEncoder::fit(["video2", "video7", "video9"]),
        };

        let interactions = array![
            [0.0, 1.0, 0.0],
            [0.5, 0.8, 0.5],
            [0.5, 0.8, 0.5],
            [0.5, 0.8, 0.5],
            [0.5, 0.8, 0.5],
            [0.5, 0.8, 0.5],
            [1.0, 0.0, 0.0],
        ];

        let mut similarity = Array2::<f32>::eye(7);
        let row0 = [1.0, 0.9, 0.85, 0.4, 0.3, 0.1, 0.05];
        for (j, s) in row0.iter().enumerate() {
            similarity[[0, j]] = *s;
            similarity[[j, 0]] = *s;
        }

        let artifacts = ArtifactSet::new(interactions, similarity, encoders).unwrap();
        CollaborativeFiltering::new(Arc::new(artifacts), DEFAULT_NEIGHBORS)
    }

    #[test]
    fn test_masks_watched_and_breaks_ties_by_column() {
        let model = example_model();
        assert_eq!(model.recommend("U0001", 2).unwrap(), vec!["video2", "video9"]);
    }

    #[test]
    fn test_neighbors_exclude_self_and_take_most_similar() {
        let model = example_model();
        let ranking = model.rank("U0001", 3).unwrap().unwrap();
        assert_eq!(ranking.neighbors, vec![1, 2, 3, 4, 5]);
        assert!(!ranking.neighbors.contains(&ranking.row));
        assert!(!ranking.fallback);
    }

    #[test]
    fn test_neighbor_ties_keep_row_order() {
        let model = example_model();
        // U0003's row: self 1.0, U0001 0.85, everyone else 0.0.
        assert_eq!(model.nearest_neighbors(2), vec![0, 1, 3, 4, 5]);
    }

    #[test]
    fn test_unknown_user_is_empty() {
        let model = example_model();
        assert!(model.recommend("U9999", 5).unwrap().is_empty());
        assert!(model.rank("U9999", 5).unwrap().is_none());
    }

    #[test]
    fn test_malformed_user_is_an_error() {
        let model = example_model();
        let err = model.recommend("abc", 5).unwrap_err();
        assert!(matches!(err, RecommendError::InvalidUserId(_)));
    }

    #[test]
    fn test_id_variants_resolve_to_same_user() {
        let model = example_model();
        let canonical = model.recommend("U0001", 3).unwrap();
        assert_eq!(model.recommend("1", 3).unwrap(), canonical);
        assert_eq!(model.recommend("u001", 3).unwrap(), canonical);
    }

    #[test]
    fn test_top_k_bounds_output() {
        let model = example_model();
        assert_eq!(model.recommend("U0001", 0).unwrap().len(), 0);
        // Only two unwatched videos exist.
        assert_eq!(model.recommend("U0001", 10).unwrap().len(), 2);
    }

    #[test]
    fn test_fallback_when_everything_watched() {
        let encoders = Encoders {
            users: LabelEncoder::fit(["U0001", "U0002"]),
            videos: LabelEncoder::fit(["V1", "V2"]),
        };
        let artifacts = ArtifactSet::new(
            array![[0.4, 0.2], [0.1, 0.9]],
            array![[1.0, 0.5], [0.5, 1.0]],
            encoders,
        )
        .unwrap();
        let model = CollaborativeFiltering::new(Arc::new(artifacts), DEFAULT_NEIGHBORS);

        let ranking = model.rank("U0001", 5).unwrap().unwrap();
        assert!(ranking.fallback);
        assert_eq!(ranking.video_ids(), vec!["V2", "V1"]);
    }

    #[test]
    fn test_single_user_model_recommends_nothing() {
        let encoders = Encoders {
            users: LabelEncoder::fit(["U0001"]),
            videos: LabelEncoder::fit(["V1"]),
        };
        let artifacts =
            ArtifactSet::new(array![[0.0]], array![[0.0]], encoders).unwrap();
        let model = CollaborativeFiltering::new(Arc::new(artifacts), DEFAULT_NEIGHBORS);

        assert!(model.recommend("U0001", 5).unwrap().is_empty());
    }

    #[test]
    fn test_is_idempotent() {
        let model = example_model();
        for user in ["U0001", "U0004", "U0007"] {
            assert_eq!(
                model.recommend(user, 3).unwrap(),
                model.recommend(user, 3).unwrap()
            );
        }
    }
}
