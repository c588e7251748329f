//! # Recommendation Orchestrator
//!
//! This module coordinates one recommendation request:
//! 1. Build the user's context from the store (unknown user -> NotFound)
//! 2. Content mode only: consult the cache through the configured policy
//! 3. Build the interaction or feature matrix and score candidates
//! 4. Rank, exclude rated movies and cut to the configured size
//! 5. Content mode only: write the selection back to the cache
//! 6. Resolve titles and build explanations

use std::collections::HashMap;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use data_loader::{CacheStamp, MovieId, MovieSummary, Store, UserId};
use pipeline::RankAndCutoff;
use sources::user_context::{build_feature_matrix, build_interaction_matrix, build_user_context};
use sources::{
    Candidate, CandidateSource, CollaborativeSource, ContentSource, SimilarityMode, UserContext,
};

use crate::config::{RecommendationMode, RecommenderConfig};

/// Final recommendation returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecommendation {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    pub year: Option<u16>,
    pub score: f64,
    pub source: CandidateSource,
    pub explanation: String,
}

/// Main orchestrator that owns the store and serves requests against it
pub struct RecommendationOrchestrator {
    store: Store,
    config: RecommenderConfig,
    selector: RankAndCutoff,
}

impl RecommendationOrchestrator {
    /// Create an orchestrator over `store`
    ///
    /// Fails with [`crate::ConfigError`] if the configuration is unusable.
    pub fn new(store: Store, config: RecommenderConfig) -> Result<Self> {
        config.validate().context("Invalid recommender configuration")?;
        let selector = RankAndCutoff::new(config.cutoff);
        Ok(Self {
            store,
            config,
            selector,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Hand the store back, e.g. to run maintenance after a batch of requests
    pub fn into_store(self) -> Store {
        self.store
    }

    /// Main entry point: get recommendations for a user
    ///
    /// Returns at most `config.cutoff` recommendations, best first. An
    /// unknown user (no ratings in the store) is an error that downcasts to
    /// [`sources::RecommendError::UserNotFound`]; a known user with nothing
    /// left to recommend gets an empty list.
    #[instrument(skip(self), fields(cache = self.config.cache_policy.name()))]
    pub fn get_recommendations(
        &mut self,
        user_id: UserId,
        mode: RecommendationMode,
    ) -> Result<Vec<MovieRecommendation>> {
        let start_time = Instant::now();

        let context = build_user_context(&self.store, user_id)?;
        debug!("Built user context for user {}", user_id);

        let selected = match mode {
            RecommendationMode::User => self.collaborative(&context, SimilarityMode::User)?,
            RecommendationMode::Item => self.collaborative(&context, SimilarityMode::Item)?,
            RecommendationMode::Content => self.content(&context)?,
        };

        let recommendations = self.enrich(selected)?;

        info!(
            "Recommended {} movies for user {} ({} mode) in {:.2?}",
            recommendations.len(),
            user_id,
            mode,
            start_time.elapsed()
        );
        Ok(recommendations)
    }

    /// User- or item-based collaborative filtering
    fn collaborative(&self, context: &UserContext, mode: SimilarityMode) -> Result<Vec<Candidate>> {
        let matrix = build_interaction_matrix(&self.store, &[context.user_id])
            .context("Failed to build interaction matrix")?;

        let candidates = CollaborativeSource::new(mode)
            .with_min_similarity(self.config.min_similarity)
            .get_candidates(&matrix, context.user_id)?;
        debug!("Scored {} {:?} candidates", candidates.len(), mode);

        self.selector
            .select(candidates, context)
            .context("Failed to select recommendations")
    }

    /// Content-based scoring behind the recommendation cache
    fn content(&mut self, context: &UserContext) -> Result<Vec<Candidate>> {
        let user_id = context.user_id;
        let policy = &self.config.cache_policy;

        let current = self
            .store
            .ratings_fingerprint(user_id)
            .context("Failed to fingerprint ratings")?;
        let stamp = self
            .store
            .cached_stamp(user_id)
            .context("Failed to read cache stamp")?;

        if policy.is_fresh(stamp.map(|s| s.ratings), current) {
            let rows = self
                .store
                .cached_recommendations(user_id, self.config.cutoff)
                .context("Failed to read cached recommendations")?;
            let covered = stamp.is_some_and(|s| {
                s.covers(self.config.cutoff, self.config.rating_range, rows.len())
            });
            if rows.is_empty() {
                debug!("Cache for user {} is empty, recomputing", user_id);
            } else if !covered {
                debug!(
                    "Cache for user {} was written for a different request, recomputing",
                    user_id
                );
            } else {
                info!(
                    "Serving {} cached recommendations for user {} ({} policy)",
                    rows.len(),
                    user_id,
                    policy.name()
                );
                return Ok(rows
                    .into_iter()
                    .map(|row| Candidate::new(row.movie_id, CandidateSource::Cache, row.score))
                    .collect());
            }
        } else if stamp.is_some() {
            debug!("Cache for user {} is stale under {} policy", user_id, policy.name());
        }

        let features = build_feature_matrix(&self.store).context("Failed to build feature matrix")?;
        let (low, high) = self.config.rating_range;
        let candidates = ContentSource::new()
            .with_rating_range(low, high)
            .get_candidates(context, &features);
        let selected = self
            .selector
            .select(candidates, context)
            .context("Failed to select recommendations")?;

        if policy.write_back() && !selected.is_empty() {
            let scores: Vec<(MovieId, f64)> =
                selected.iter().map(|c| (c.movie_id, c.score)).collect();
            let stamp = CacheStamp {
                ratings: current,
                cutoff: self.config.cutoff,
                rating_range: self.config.rating_range,
            };
            self.store
                .store_recommendations(user_id, &scores, stamp)
                .context("Failed to write recommendation cache")?;
            debug!("Cached {} recommendations for user {}", scores.len(), user_id);
        }

        Ok(selected)
    }

    /// Attach titles, genres and an explanation to each selected candidate
    fn enrich(&self, candidates: Vec<Candidate>) -> Result<Vec<MovieRecommendation>> {
        let mut ids: Vec<MovieId> = candidates.iter().map(|c| c.movie_id).collect();
        ids.extend(candidates.iter().filter_map(|c| c.metadata.anchor_item));
        let movies = self
            .store
            .movies_by_ids(&ids)
            .context("Failed to look up movie titles")?;

        let recommendations = candidates
            .into_iter()
            .map(|candidate| {
                let explanation = explain(&candidate, &movies);
                let (title, genres, year) = match movies.get(&candidate.movie_id) {
                    Some(movie) => (movie.title.clone(), movie.genres.clone(), movie.year),
                    None => {
                        warn!("Movie {} is missing from the catalogue", candidate.movie_id);
                        (format!("Movie {}", candidate.movie_id), Vec::new(), None)
                    }
                };
                MovieRecommendation {
                    movie_id: candidate.movie_id,
                    title,
                    genres,
                    year,
                    score: candidate.score,
                    source: candidate.source,
                    explanation,
                }
            })
            .collect();
        Ok(recommendations)
    }
}

fn explain(candidate: &Candidate, movies: &HashMap<MovieId, MovieSummary>) -> String {
    match candidate.source {
        CandidateSource::UserNeighborhood => match candidate.metadata.neighbor_user {
            Some(neighbor) => format!(
                "Rated by similar user {} (similarity {:.3})",
                neighbor, candidate.score
            ),
            None => format!("Similarity {:.3}", candidate.score),
        },
        CandidateSource::ItemNeighborhood => match candidate.metadata.anchor_item {
            Some(anchor) => {
                let title = movies
                    .get(&anchor)
                    .map(|m| m.title.clone())
                    .unwrap_or_else(|| format!("movie {}", anchor));
                format!("Similar to {} (similarity {:.3})", title, candidate.score)
            }
            None => format!("Similarity {:.3}", candidate.score),
        },
        CandidateSource::Content => match candidate.metadata.raw_score {
            Some(raw) => format!("Genre match {:.3}, softmax {:.5}", raw, candidate.score),
            None => format!("Softmax {:.5}", candidate.score),
        },
        CandidateSource::Cache => format!("Cached score {:.5}", candidate.score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Bypass, ReuseAlways};
    use crate::config::ConfigError;
    use data_loader::{Genre, Movie, Rating};
    use sources::RecommendError;

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    fn movie(id: MovieId, title: &str) -> Movie {
        Movie {
            id,
            original_title: title.to_string(),
            english_title: title.to_string(),
            year: Some(1994),
            certificate: None,
            runtime_minutes: None,
            imdb_rating: None,
            overview: None,
            meta_score: None,
            director: None,
            gross: None,
            genres: Vec::new(),
            stars: Vec::new(),
        }
    }

    fn rate(store: &Store, user_id: UserId, movie_id: MovieId, rating: f32) {
        store
            .insert_rating(&Rating {
                user_id,
                movie_id,
                rating,
                rating_date: None,
            })
            .unwrap();
    }

    /// Small catalogue: dramas are odd ids, action titles even ids.
    fn build_test_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.insert_genre(&Genre { id: 1, name: "Drama".to_string() }).unwrap();
        store.insert_genre(&Genre { id: 2, name: "Action".to_string() }).unwrap();

        let titles = [
            "The Shawshank Redemption",
            "The Dark Knight",
            "The Godfather",
            "Inception",
            "Forrest Gump",
            "The Matrix",
            "Schindler's List",
            "Gladiator",
        ];
        for (i, title) in titles.iter().enumerate() {
            let id = i as MovieId + 1;
            store.insert_movie(&movie(id, title)).unwrap();
            store.link_movie_genre(id, if id % 2 == 1 { 1 } else { 2 }).unwrap();
        }

        rate(&store, 1, 1, 5.0);
        rate(&store, 1, 3, 4.0);
        rate(&store, 2, 1, 5.0);
        rate(&store, 2, 3, 4.0);
        rate(&store, 2, 5, 4.5);
        rate(&store, 2, 6, 2.0);
        rate(&store, 3, 2, 5.0);
        rate(&store, 3, 4, 4.0);
        store
    }

    fn build_test_orchestrator(config: RecommenderConfig) -> RecommendationOrchestrator {
        RecommendationOrchestrator::new(build_test_store(), config).unwrap()
    }

    fn ids(recs: &[MovieRecommendation]) -> Vec<MovieId> {
        recs.iter().map(|r| r.movie_id).collect()
    }

    // ============================================================================
    // Collaborative modes
    // ============================================================================

    #[test]
    fn test_user_mode_recommends_neighbor_movies() {
        let mut orchestrator = build_test_orchestrator(RecommenderConfig::default());
        let recs = orchestrator
            .get_recommendations(1, RecommendationMode::User)
            .unwrap();

        // User 2 mirrors user 1 and also rated 5 and 6; user 3 shares nothing
        assert_eq!(ids(&recs), vec![5, 6]);
        assert_eq!(recs[0].title, "Forrest Gump");
        assert_eq!(recs[0].source, CandidateSource::UserNeighborhood);
        assert!(recs[0].explanation.contains("similar user 2"));
    }

    #[test]
    fn test_item_mode_recommends_similar_movies() {
        let mut orchestrator = build_test_orchestrator(RecommenderConfig::default());
        let recs = orchestrator
            .get_recommendations(1, RecommendationMode::Item)
            .unwrap();

        // Movies 5 and 6 were only rated alongside user 1's movies
        let mut found = ids(&recs);
        found.sort();
        assert_eq!(found, vec![5, 6]);
        assert!(recs.iter().all(|r| r.source == CandidateSource::ItemNeighborhood));
        assert!(recs[0].explanation.starts_with("Similar to "));
    }

    #[test]
    fn test_unknown_user_is_not_found() {
        let mut orchestrator = build_test_orchestrator(RecommenderConfig::default());
        for mode in [
            RecommendationMode::User,
            RecommendationMode::Item,
            RecommendationMode::Content,
        ] {
            let err = orchestrator.get_recommendations(42, mode).unwrap_err();
            assert_eq!(
                err.downcast_ref::<RecommendError>(),
                Some(&RecommendError::UserNotFound(42))
            );
        }
    }

    #[test]
    fn test_no_overlap_gives_empty_result() {
        let store = build_test_store();
        rate(&store, 9, 8, 3.0);
        let mut orchestrator =
            RecommendationOrchestrator::new(store, RecommenderConfig::default()).unwrap();

        // Nobody else rated movie 8, so user 9 has no positive neighbors
        let recs = orchestrator
            .get_recommendations(9, RecommendationMode::User)
            .unwrap();
        assert!(recs.is_empty());
    }

    // ============================================================================
    // Content mode and the cache
    // ============================================================================

    #[test]
    fn test_content_mode_prefers_rated_genres() {
        let mut orchestrator =
            build_test_orchestrator(RecommenderConfig::default().with_cutoff(3));
        let recs = orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();

        // User 1 only rated dramas; unseen dramas are 5 and 7
        assert_eq!(ids(&recs), vec![5, 7, 2]);
        assert_eq!(recs[0].genres, vec!["Drama".to_string()]);
        assert!(recs.iter().all(|r| r.source == CandidateSource::Content));
    }

    #[test]
    fn test_content_results_are_cached() {
        let mut orchestrator = build_test_orchestrator(RecommenderConfig::default());
        let first = orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();
        let second = orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();

        assert_eq!(ids(&first), ids(&second));
        assert!(second.iter().all(|r| r.source == CandidateSource::Cache));
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.score, b.score);
        }
    }

    #[test]
    fn test_fingerprint_policy_recomputes_after_new_rating() {
        let mut orchestrator = build_test_orchestrator(RecommenderConfig::default());
        orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();

        rate(orchestrator.store(), 1, 5, 3.0);
        let recs = orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();

        assert!(recs.iter().all(|r| r.source == CandidateSource::Content));
        assert!(!ids(&recs).contains(&5));
    }

    #[test]
    fn test_reuse_policy_serves_stale_rows() {
        let mut orchestrator =
            build_test_orchestrator(RecommenderConfig::default().with_cache_policy(ReuseAlways));
        let first = orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();
        assert_eq!(first[0].movie_id, 5);

        rate(orchestrator.store(), 1, 5, 3.0);
        let stale = orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();

        // Movie 5 is now rated but the cached list still offers it
        assert_eq!(ids(&stale), ids(&first));
        assert!(stale.iter().all(|r| r.source == CandidateSource::Cache));
    }

    #[test]
    fn test_bypass_never_writes_cache() {
        let mut orchestrator =
            build_test_orchestrator(RecommenderConfig::default().with_cache_policy(Bypass));
        orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();

        assert!(orchestrator.store().cached_recommendations(1, 5).unwrap().is_empty());
    }

    #[test]
    fn test_cache_written_for_smaller_cutoff_is_recomputed() {
        let mut orchestrator =
            build_test_orchestrator(RecommenderConfig::default().with_cutoff(2));
        let first = orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();
        assert_eq!(ids(&first), vec![5, 7]);

        // Same store and ratings, larger cutoff: two cached rows are not enough
        let store = orchestrator.into_store();
        let mut orchestrator =
            RecommendationOrchestrator::new(store, RecommenderConfig::default().with_cutoff(5))
                .unwrap();
        let second = orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();
        assert_eq!(ids(&second), vec![5, 7, 2, 4, 6]);
        assert!(second.iter().all(|r| r.source == CandidateSource::Content));

        // A smaller request is answered from the top-5 entry
        let store = orchestrator.into_store();
        let mut orchestrator =
            RecommendationOrchestrator::new(store, RecommenderConfig::default().with_cutoff(3))
                .unwrap();
        let third = orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();
        assert_eq!(ids(&third), vec![5, 7, 2]);
        assert!(third.iter().all(|r| r.source == CandidateSource::Cache));
    }

    #[test]
    fn test_cache_written_for_other_rating_range_is_recomputed() {
        let mut orchestrator = build_test_orchestrator(RecommenderConfig::default());
        orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();

        let store = orchestrator.into_store();
        let mut orchestrator = RecommendationOrchestrator::new(
            store,
            RecommenderConfig::default().with_rating_range(0.0, 1.0),
        )
        .unwrap();
        let recs = orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();
        assert!(recs.iter().all(|r| r.source == CandidateSource::Content));
    }

    #[test]
    fn test_zero_cutoff_reads_nothing_from_cache() {
        let mut orchestrator = build_test_orchestrator(RecommenderConfig::default());
        orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();

        // The cache is fresh but a zero cutoff reads no rows; it recomputes to nothing
        let store = orchestrator.into_store();
        let mut orchestrator =
            RecommendationOrchestrator::new(store, RecommenderConfig::default().with_cutoff(0))
                .unwrap();
        let recs = orchestrator
            .get_recommendations(1, RecommendationMode::Content)
            .unwrap();
        assert!(recs.is_empty());
        assert_eq!(orchestrator.store().cached_recommendations(1, 10).unwrap().len(), 5);
    }

    #[test]
    fn test_inverted_rating_range_is_rejected() {
        let result = RecommendationOrchestrator::new(
            build_test_store(),
            RecommenderConfig::default().with_rating_range(5.0, 0.0),
        );
        let err = result.err().unwrap();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::InvalidRatingRange { low: 5.0, high: 0.0 })
        );
    }

    #[test]
    fn test_recommendation_serializes() {
        let mut orchestrator = build_test_orchestrator(RecommenderConfig::default());
        let recs = orchestrator
            .get_recommendations(1, RecommendationMode::User)
            .unwrap();

        let json = serde_json::to_string(&recs).unwrap();
        assert!(json.contains("\"title\":\"Forrest Gump\""));
        assert!(json.contains("\"source\":\"UserNeighborhood\""));
    }
}
