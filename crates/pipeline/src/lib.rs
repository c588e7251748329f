//! Selection pipeline for scored movie candidates.
//!
//! This crate provides:
//! - Filter trait and the stages that implement it
//! - FilterPipeline for composing stages
//! - RankAndCutoff, the selection policy every recommender shares
//!
//! ## Architecture
//! Sources hand over every candidate they scored. The pipeline then:
//! 1. Ranks candidates (score descending, ties by movie id) and drops duplicates
//! 2. Removes movies the user already rated
//! 3. Keeps the top N (default 5)
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::RankAndCutoff;
//!
//! let candidates = source.get_candidates(&matrix, user_id)?;
//! let top = RankAndCutoff::new(5).select(candidates, &context)?;
//! ```

pub mod filter_pipeline;
pub mod filters;
pub mod selector;
pub mod traits;

// Re-export main types
pub use filter_pipeline::FilterPipeline;
pub use filters::DEFAULT_CUTOFF;
pub use selector::RankAndCutoff;
pub use traits::Filter;
