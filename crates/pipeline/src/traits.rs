//! Core traits for the selection pipeline.
//!
//! This module defines the Filter trait that allows composable,
//! extensible stages to be applied to candidate sets.

use anyhow::Result;
use sources::{Candidate, UserContext};

/// Core trait for one stage of candidate selection.
///
/// All stages must implement this trait to be used in the FilterPipeline.
///
/// ## Design Note
/// - `Send + Sync` allows stages to be shared across threads
/// - Stages take ownership of the Vec<Candidate> and return the survivors,
///   possibly reordered
pub trait Filter: Send + Sync {
    /// Returns the name of this stage (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this stage to a set of candidates.
    ///
    /// # Arguments
    /// * `candidates` - The candidates to process (takes ownership)
    /// * `context` - User context holding the rated set
    fn apply(
        &self,
        candidates: Vec<Candidate>,
        context: &UserContext,
    ) -> Result<Vec<Candidate>>;
}
