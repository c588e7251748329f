//! The FilterPipeline runs stages in order.
//!
//! Stages are chained with the builder pattern; each one receives the
//! output of the previous one.

use crate::traits::Filter;
use anyhow::Result;
use sources::{Candidate, UserContext};
use tracing;

/// Chains multiple stages together into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(RankFilter)
///     .add_filter(AlreadyRatedFilter)
///     .add_filter(CutoffFilter::new(5));
///
/// let selected = pipeline.apply(candidates, &context)?;
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Append a stage (builder pattern).
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Apply all stages in sequence to the candidates.
    ///
    /// Stops at the first stage that returns an error.
    pub fn apply(
        &self,
        candidates: Vec<Candidate>,
        context: &UserContext,
    ) -> Result<Vec<Candidate>> {
        let mut current = candidates;
        for filter in &self.filters {
            tracing::debug!(
                "Applying filter: {} (input count: {})",
                filter.name(),
                current.len()
            );
            current = filter.apply(current, context)?;
            tracing::debug!(
                "Filter applied: {} (output count: {})",
                filter.name(),
                current.len()
            );
        }
        Ok(current)
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{AlreadyRatedFilter, CutoffFilter};
    use sources::{Candidate, CandidateSource};

    struct FailingFilter;

    impl Filter for FailingFilter {
        fn name(&self) -> &str {
            "FailingFilter"
        }

        fn apply(&self, _: Vec<Candidate>, _: &UserContext) -> Result<Vec<Candidate>> {
            anyhow::bail!("storage went away")
        }
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline = FilterPipeline::new();
        let context = UserContext::new(1);

        let candidates = vec![
            Candidate::new(1, CandidateSource::UserNeighborhood, 0.9),
            Candidate::new(2, CandidateSource::UserNeighborhood, 0.8),
        ];

        let filtered = pipeline.apply(candidates.clone(), &context).unwrap();
        assert_eq!(filtered, candidates);
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_filters_run_in_order() {
        let mut context = UserContext::new(1);
        context.rated_movies.insert(1);

        let pipeline = FilterPipeline::new()
            .add_filter(AlreadyRatedFilter)
            .add_filter(CutoffFilter::new(1));

        let candidates = vec![
            Candidate::new(1, CandidateSource::Content, 0.9),
            Candidate::new(2, CandidateSource::Content, 0.8),
            Candidate::new(3, CandidateSource::Content, 0.7),
        ];

        let filtered = pipeline.apply(candidates, &context).unwrap();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].movie_id, 2);
    }

    #[test]
    fn test_error_stops_pipeline() {
        let pipeline = FilterPipeline::new()
            .add_filter(FailingFilter)
            .add_filter(CutoffFilter::new(5));

        let result = pipeline.apply(Vec::new(), &UserContext::new(1));
        assert!(result.is_err());
    }
}
