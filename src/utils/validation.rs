use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Minimum digit count of the canonical `U0001` form.
const USER_ID_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid user id {raw:?}: expected an optional `U` followed by digits, e.g. U0001")]
pub struct InvalidUserId {
    pub raw: String,
}

/// Canonical user identifier.
///
/// Every spelling that denotes the same user number (`1`, `U1`, `u0001`,
/// `U0001`) parses to the same value, and [`fmt::Display`] always renders the
/// zero-padded `U0001` form used as encoder key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(u32);

impl UserId {
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn parse(raw: &str) -> Result<Self, InvalidUserId> {
        let invalid = || InvalidUserId {
            raw: raw.to_string(),
        };

        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix('U')
            .or_else(|| trimmed.strip_prefix('u'))
            .unwrap_or(trimmed);

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        digits.parse::<u32>().map(Self).map_err(|_| invalid())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U{:0width$}", self.0, width = USER_ID_WIDTH)
    }
}

impl FromStr for UserId {
    type Err = InvalidUserId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopKError {
    #[error("top_k must be greater than 0")]
    Zero,
    #[error("top_k too large: {requested} (max {max})")]
    TooLarge { requested: usize, max: usize },
}

pub fn validate_top_k(top_k: usize, max_top_k: usize) -> Result<usize, TopKError> {
    if top_k == 0 {
        return Err(TopKError::Zero);
    }

    if top_k > max_top_k {
        return Err(TopKError::TooLarge {
            requested: top_k,
            max: max_top_k,
        });
    }

    Ok(top_k)
}

/// Video ids are opaque; only surrounding whitespace is dropped.
pub fn normalize_video_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
