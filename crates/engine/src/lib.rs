//! Engine crate for the ReelRecs recommenders.
//!
//! This crate contains the orchestrator that wires the store, the scoring
//! sources, the selection pipeline and the recommendation cache together.

pub mod cache;
pub mod config;
pub mod orchestrator;

pub use cache::{Bypass, CachePolicy, FingerprintPolicy, ReuseAlways};
pub use config::{ConfigError, ModeParseError, RecommendationMode, RecommenderConfig};
pub use orchestrator::{MovieRecommendation, RecommendationOrchestrator};
