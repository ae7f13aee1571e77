//! Persisted model snapshot: interaction matrix, user similarity matrix and
//! the id encoders. Written together by one training run and loaded together
//! by the server.

use ndarray::Array2;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::algorithms::encoder::Encoders;
use crate::config::ArtifactsConfig;
use crate::error::ArtifactError;

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    interactions: Array2<f32>,
    similarity: Array2<f32>,
    encoders: Encoders,
}

impl ArtifactSet {
    pub fn new(
        interactions: Array2<f32>,
        similarity: Array2<f32>,
        encoders: Encoders,
    ) -> Result<Self, ArtifactError> {
        let set = Self {
            interactions,
            similarity,
            encoders,
        };
        set.validate()?;
        Ok(set)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        let users = self.encoders.users.len();
        let videos = self.encoders.videos.len();

        if self.interactions.dim() != (users, videos) {
            return Err(ArtifactError::ShapeMismatch(format!(
                "interaction matrix is {:?}, encoders expect ({}, {})",
                self.interactions.dim(),
                users,
                videos
            )));
        }

        if self.similarity.dim() != (users, users) {
            return Err(ArtifactError::ShapeMismatch(format!(
                "similarity matrix is {:?}, expected ({}, {})",
                self.similarity.dim(),
                users,
                users
            )));
        }

        Ok(())
    }

    pub fn interactions(&self) -> &Array2<f32> {
        &self.interactions
    }

    pub fn similarity(&self) -> &Array2<f32> {
        &self.similarity
    }

    pub fn encoders(&self) -> &Encoders {
        &self.encoders
    }

    pub fn num_users(&self) -> usize {
        self.encoders.users.len()
    }

    pub fn num_videos(&self) -> usize {
        self.encoders.videos.len()
    }

    /// Writes all three blobs next to their final names first and renames
    /// them into place only once every write succeeded.
    pub fn save(&self, config: &ArtifactsConfig) -> Result<(), ArtifactError> {
        fs::create_dir_all(&config.dir).map_err(|source| ArtifactError::Io {
            path: config.dir.clone(),
            source,
        })?;

        let staged = [
            (encode(&self.interactions)?, config.interaction_matrix_path()),
            (encode(&self.similarity)?, config.similarity_path()),
            (encode(&self.encoders)?, config.encoders_path()),
        ];

        let mut pending = Vec::with_capacity(staged.len());
        for (bytes, target) in &staged {
            let tmp = staging_path(target);
            fs::write(&tmp, bytes).map_err(|source| ArtifactError::Io {
                path: tmp.clone(),
                source,
            })?;
            pending.push((tmp, target));
        }

        for (tmp, target) in pending {
            fs::rename(&tmp, target).map_err(|source| ArtifactError::Io {
                path: target.clone(),
                source,
            })?;
            debug!("Wrote artifact {}", target.display());
        }

        info!(
            users = self.num_users(),
            videos = self.num_videos(),
            "Saved artifacts to {}",
            config.dir.display()
        );
        Ok(())
    }

    pub fn load(config: &ArtifactsConfig) -> Result<Self, ArtifactError> {
        let interactions: Array2<f32> = decode(&config.interaction_matrix_path())?;
        let similarity: Array2<f32> = decode(&config.similarity_path())?;
        let encoders: Encoders = decode(&config.encoders_path())?;

        let set = Self::new(interactions, similarity, encoders)?;
        info!(
            users = set.num_users(),
            videos = set.num_videos(),
            "Loaded artifacts from {}",
            config.dir.display()
        );
        Ok(set)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ArtifactError> {
    bincode::serialize(value).map_err(ArtifactError::Encode)
}

fn decode<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    bincode::deserialize(&bytes).map_err(|source| ArtifactError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}
