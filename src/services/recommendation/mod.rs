use std::sync::Arc;
use tracing::{error, info};

use crate::algorithms::CollaborativeFiltering;
use crate::artifacts::ArtifactSet;
use crate::config::Config;
use crate::error::ServeError;
use crate::models::{ModelSummary, RecommendationResponse};
use crate::utils::validation::{validate_top_k, UserId};

/// Serves recommendations from the snapshot loaded at startup.
///
/// When the artifacts could not be loaded the service still exists and
/// answers every request with [`ServeError::NotReady`].
pub struct RecommendationService {
    model: Option<CollaborativeFiltering>,
    config: Arc<Config>,
}

impl RecommendationService {
    pub fn new(config: Arc<Config>) -> Self {
        match ArtifactSet::load(&config.artifacts) {
            Ok(artifacts) => Self::from_artifacts(artifacts, config),
            Err(e) => {
                error!(
                    "Failed to load artifacts from {}: {}. Serving in not-ready mode",
                    config.artifacts.dir.display(),
                    e
                );
                Self::unavailable(config)
            }
        }
    }

    pub fn from_artifacts(artifacts: ArtifactSet, config: Arc<Config>) -> Self {
        let model = CollaborativeFiltering::new(
            Arc::new(artifacts),
            config.recommendation.neighbors,
        );
        info!(
            users = model.artifacts().num_users(),
            videos = model.artifacts().num_videos(),
            "Recommendation model ready"
        );

        Self {
            model: Some(model),
            config,
        }
    }

    pub fn unavailable(config: Arc<Config>) -> Self {
        Self {
            model: None,
            config,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_summary(&self) -> Option<ModelSummary> {
        self.model.as_ref().map(|model| ModelSummary {
            users: model.artifacts().num_users(),
            videos: model.artifacts().num_videos(),
        })
    }

    pub fn get_recommendations(
        &self,
        user_id: &str,
        top_k: Option<usize>,
    ) -> Result<RecommendationResponse, ServeError> {
        let user = UserId::parse(user_id)?;
        let top_k = validate_top_k(
            top_k.unwrap_or(self.config.recommendation.default_top_k),
            self.config.recommendation.max_top_k,
        )?;

        let model = self.model.as_ref().ok_or(ServeError::NotReady)?;

        let recommendations = model
            .rank_user(user, top_k)
            .map(|ranking| ranking.video_ids())
            .unwrap_or_default();

        info!(
            user = %user,
            top_k,
            returned = recommendations.len(),
            "Served recommendations"
        );

        Ok(RecommendationResponse {
            user: user.to_string(),
            recommendations,
        })
    }
}
