//! Ordering stage: best score first, one entry per movie.

use crate::traits::Filter;
use anyhow::Result;
use sources::{Candidate, UserContext};
use std::collections::HashSet;
use tracing::warn;

/// Sorts candidates by score and drops duplicate movies.
///
/// ## Algorithm
/// 1. Drop candidates whose score is NaN
/// 2. Sort by score descending, ties by ascending movie id
/// 3. Keep the first (best) occurrence of each movie id
pub struct RankFilter;

impl Filter for RankFilter {
    fn name(&self) -> &str {
        "RankFilter"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        _context: &UserContext,
    ) -> Result<Vec<Candidate>> {
        let before = candidates.len();
        let mut ranked: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| !candidate.score.is_nan())
            .collect();
        if ranked.len() < before {
            warn!("Dropped {} candidates with NaN scores", before - ranked.len());
        }

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.movie_id.cmp(&b.movie_id))
        });

        let mut seen = HashSet::new();
        ranked.retain(|candidate| seen.insert(candidate.movie_id));
        Ok(ranked)
    }
}
