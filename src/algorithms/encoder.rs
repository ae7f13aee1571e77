use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncoderError {
    #[error("encoder classes are not sorted and unique at position {0}")]
    NotSortedUnique(usize),
}

/// Bijection between external string ids and dense indices.
///
/// Classes are kept sorted, so index order matches lexical id order and a
/// refit on the same ids always produces the same mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn fit<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes: BTreeSet<String> = ids.into_iter().map(Into::into).collect();
        Self::from_sorted(classes.into_iter().collect())
    }

    fn from_sorted(classes: Vec<String>) -> Self {
        let index = classes
            .iter()
            .enumerate()
            .map(|(i, class)| (class.clone(), i))
            .collect();

        Self { classes, index }
    }

    pub fn transform(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl TryFrom<Vec<String>> for LabelEncoder {
    type Error = EncoderError;

    fn try_from(classes: Vec<String>) -> Result<Self, Self::Error> {
        if let Some(pos) = classes.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(EncoderError::NotSortedUnique(pos + 1));
        }
        Ok(Self::from_sorted(classes))
    }
}

impl From<LabelEncoder> for Vec<String> {
    fn from(encoder: LabelEncoder) -> Self {
        encoder.classes
    }
}

/// The user and video encoders of one trained model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoders {
    pub users: LabelEncoder,
    pub videos: LabelEncoder,
}
