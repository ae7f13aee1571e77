pub mod algorithms;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use models::*;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub recommendation_service: Arc<services::recommendation::RecommendationService>,
}

impl AppState {
    /// Loads the artifact snapshot once. A missing or broken snapshot leaves
    /// the service in not-ready mode instead of failing startup.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let recommendation_service = Arc::new(
            services::recommendation::RecommendationService::new(config.clone()),
        );

        Self {
            config,
            recommendation_service,
        }
    }

    pub fn with_service(
        config: Arc<Config>,
        recommendation_service: services::recommendation::RecommendationService,
    ) -> Self {
        Self {
            config,
            recommendation_service: Arc::new(recommendation_service),
        }
    }
}

/// `RUST_LOG` wins over `default_level` when set.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
