//! The shared rank-and-cutoff policy.

use crate::filter_pipeline::FilterPipeline;
use crate::filters::{AlreadyRatedFilter, CutoffFilter, DEFAULT_CUTOFF, RankFilter};
use anyhow::Result;
use sources::{Candidate, UserContext};
use tracing::{debug, instrument};

/// Picks the final recommendations from a scored candidate list
///
/// Runs [`RankFilter`], [`AlreadyRatedFilter`] and [`CutoffFilter`] in that
/// order, so the result is sorted best first, holds each movie at most once,
/// never contains a movie the user rated, and has at most `limit` entries.
pub struct RankAndCutoff {
    limit: usize,
    pipeline: FilterPipeline,
}

impl RankAndCutoff {
    pub fn new(limit: usize) -> Self {
        let pipeline = FilterPipeline::new()
            .add_filter(RankFilter)
            .add_filter(AlreadyRatedFilter)
            .add_filter(CutoffFilter::new(limit));
        Self { limit, pipeline }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    #[instrument(skip(self, candidates, context), fields(user_id = context.user_id, limit = self.limit))]
    pub fn select(
        &self,
        candidates: Vec<Candidate>,
        context: &UserContext,
    ) -> Result<Vec<Candidate>> {
        let offered = candidates.len();
        let selected = self.pipeline.apply(candidates, context)?;
        debug!("Selected {} of {} candidates", selected.len(), offered);
        Ok(selected)
    }
}

impl Default for RankAndCutoff {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sources::CandidateSource;

    #[test]
    fn test_select_honours_limit_and_exclusions() {
        let mut context = UserContext::new(1);
        context.rated_movies.extend([2, 4]);

        let candidates: Vec<Candidate> = (1..=10)
            .map(|id| Candidate::new(id, CandidateSource::UserNeighborhood, id as f64))
            .collect();

        let selected = RankAndCutoff::default().select(candidates, &context).unwrap();
        let ids: Vec<u32> = selected.iter().map(|c| c.movie_id).collect();

        assert_eq!(ids, vec![10, 9, 8, 7, 6]);
    }

    #[test]
    fn test_exclusion_happens_before_cutoff() {
        let mut context = UserContext::new(1);
        context.rated_movies.insert(1);

        let candidates = vec![
            Candidate::new(1, CandidateSource::Content, 0.9),
            Candidate::new(2, CandidateSource::Content, 0.5),
        ];

        let selected = RankAndCutoff::new(1).select(candidates, &context).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].movie_id, 2);
    }

    #[test]
    fn test_empty_input() {
        let selected = RankAndCutoff::default()
            .select(Vec::new(), &UserContext::new(1))
            .unwrap();
        assert!(selected.is_empty());
    }
}
