use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub training: TrainingConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port).parse()?;
        Ok(addr)
    }
}

/// Where the trainer writes the model and the server reads it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
    pub interaction_matrix_file: String,
    pub similarity_file: String,
    pub encoders_file: String,
}

impl ArtifactsConfig {
    pub fn interaction_matrix_path(&self) -> PathBuf {
        self.dir.join(&self.interaction_matrix_file)
    }

    pub fn similarity_path(&self) -> PathBuf {
        self.dir.join(&self.similarity_file)
    }

    pub fn encoders_path(&self) -> PathBuf {
        self.dir.join(&self.encoders_file)
    }

    pub fn with_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = dir.as_ref().to_path_buf();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub dataset_path: PathBuf,
    /// Threads for the similarity computation.
    pub threads: usize,
    pub eval_sample_users: usize,
    pub eval_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub neighbors: usize,
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            artifacts: ArtifactsConfig {
                dir: PathBuf::from("artifacts"),
                interaction_matrix_file: "interaction_matrix.bin".to_string(),
                similarity_file: "user_similarity.bin".to_string(),
                encoders_file: "encoders.bin".to_string(),
            },
            training: TrainingConfig {
                dataset_path: PathBuf::from("video_recommendation_sample_dataset.csv"),
                threads: num_cpus::get(),
                eval_sample_users: 20,
                eval_k: 5,
            },
            recommendation: RecommendationConfig {
                neighbors: 5,
                default_top_k: 5,
                max_top_k: 1000,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let defaults = config::Config::try_from(&Config::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("VIDREC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Reads `path` when it exists, otherwise starts from the defaults.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::info!("Config file {} not found, using default configuration", path);
            Ok(Config::default())
        }
    }
}
