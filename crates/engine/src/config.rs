//! Recommender settings.

use crate::cache::{CachePolicy, FingerprintPolicy};
use pipeline::DEFAULT_CUTOFF;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which scorer answers a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationMode {
    /// User-based collaborative filtering
    User,
    /// Item-based collaborative filtering
    Item,
    /// Genre preference vector with softmax
    Content,
}

impl RecommendationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationMode::User => "user",
            RecommendationMode::Item => "item",
            RecommendationMode::Content => "content",
        }
    }
}

impl fmt::Display for RecommendationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown recommendation mode '{0}' (expected user, item or content)")]
pub struct ModeParseError(pub String);

/// A setting the recommenders cannot work with
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid rating range [{low}, {high}]: low must not exceed high")]
    InvalidRatingRange { low: f64, high: f64 },
}

impl FromStr for RecommendationMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(RecommendationMode::User),
            "item" => Ok(RecommendationMode::Item),
            "content" => Ok(RecommendationMode::Content),
            _ => Err(ModeParseError(s.to_string())),
        }
    }
}

/// Tunables shared by every request an orchestrator serves
///
/// ```ignore
/// let config = RecommenderConfig::default()
///     .with_cutoff(10)
///     .with_cache_policy(ReuseAlways);
/// ```
pub struct RecommenderConfig {
    /// Maximum number of recommendations returned
    pub cutoff: usize,
    /// Content mode clamps ratings into this range
    pub rating_range: (f64, f64),
    /// Collaborative modes ignore similarities at or below this
    pub min_similarity: f64,
    /// Freshness rule for the content-mode cache
    pub cache_policy: Box<dyn CachePolicy>,
}

impl RecommenderConfig {
    pub fn with_cutoff(mut self, cutoff: usize) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_rating_range(mut self, low: f64, high: f64) -> Self {
        self.rating_range = (low, high);
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn with_cache_policy(mut self, policy: impl CachePolicy + 'static) -> Self {
        self.cache_policy = Box::new(policy);
        self
    }

    /// Check the settings before any request is served
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (low, high) = self.rating_range;
        if low.is_nan() || high.is_nan() || low > high {
            return Err(ConfigError::InvalidRatingRange { low, high });
        }
        Ok(())
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            rating_range: (0.0, 5.0),
            min_similarity: 0.0,
            cache_policy: Box::new(FingerprintPolicy),
        }
    }
}

impl fmt::Debug for RecommenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecommenderConfig")
            .field("cutoff", &self.cutoff)
            .field("rating_range", &self.rating_range)
            .field("min_similarity", &self.min_similarity)
            .field("cache_policy", &self.cache_policy.name())
            .finish()
    }
}
