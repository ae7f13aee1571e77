use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::utils::validation::UserId;

/// Fixed engagement weighting. Changing any of these invalidates every trained
/// model, so they are constants rather than configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub watch_duration: f32,
    pub liked: f32,
    pub commented: f32,
    pub subscribed: f32,
    /// Divisor bringing `watch_duration` onto a 0..1 scale.
    pub duration_scale: f32,
}

pub const INTERACTION_WEIGHTS: ScoreWeights = ScoreWeights {
    watch_duration: 0.4,
    liked: 0.2,
    commented: 0.2,
    subscribed: 0.2,
    duration_scale: 100.0,
};

/// One row of the interaction CSV exactly as read, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInteractionRecord {
    pub user_id: Option<String>,
    pub video_id: Option<String>,
    pub watch_duration: Option<String>,
    pub liked: Option<String>,
    pub commented: Option<String>,
    pub subscribed_after_watching: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub user_id: UserId,
    pub video_id: String,
    pub watch_duration: f32,
    pub liked: bool,
    pub commented: bool,
    pub subscribed_after_watching: bool,
    pub timestamp: NaiveDateTime,
}

impl InteractionEvent {
    pub fn interaction_score(&self) -> f32 {
        self.weighted_score(&INTERACTION_WEIGHTS)
    }

    pub fn weighted_score(&self, weights: &ScoreWeights) -> f32 {
        let flag = |set: bool| if set { 1.0 } else { 0.0 };

        weights.watch_duration * (self.watch_duration / weights.duration_scale)
            + weights.liked * flag(self.liked)
            + weights.commented * flag(self.commented)
            + weights.subscribed * flag(self.subscribed_after_watching)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub users: usize,
    pub videos: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub model_loaded: bool,
    pub model: Option<ModelSummary>,
}
