//! Stage that keeps only the first N candidates.

use crate::traits::Filter;
use anyhow::Result;
use sources::{Candidate, UserContext};

/// Result count used when nothing else is configured
pub const DEFAULT_CUTOFF: usize = 5;

/// Truncates the candidate list to `limit` entries.
///
/// Assumes the list is already ranked; see [`crate::filters::RankFilter`].
/// Fewer than `limit` candidates pass through unchanged.
pub struct CutoffFilter {
    limit: usize,
}

impl CutoffFilter {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for CutoffFilter {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF)
    }
}

impl Filter for CutoffFilter {
    fn name(&self) -> &str {
        "CutoffFilter"
    }

    fn apply(
        &self,
        mut candidates: Vec<Candidate>,
        _context: &UserContext,
    ) -> Result<Vec<Candidate>> {
        candidates.truncate(self.limit);
        Ok(candidates)
    }
}
