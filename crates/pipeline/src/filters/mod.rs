//! Stage implementations for the selection pipeline.
//!
//! This module contains the concrete stages that can be composed into a
//! FilterPipeline.

pub mod already_rated;
pub mod cutoff;
pub mod rank;

// Re-export for convenience
pub use already_rated::AlreadyRatedFilter;
pub use cutoff::{CutoffFilter, DEFAULT_CUTOFF};
pub use rank::RankFilter;
