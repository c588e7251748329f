//! Shared types passed between the sources, the pipeline and the engine.

use data_loader::{MovieId, Rating, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which scorer produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateSource {
    /// Items rated by users whose rating rows resemble the query user's
    UserNeighborhood,
    /// Items whose rating columns resemble items the user already rated
    ItemNeighborhood,
    /// Genre preference vector scored through softmax
    Content,
    /// Read back from the recommendation cache without recomputing
    Cache,
}

/// Extra evidence attached to a candidate, used for explanations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    /// Neighbor whose ratings introduced this item (user mode)
    pub neighbor_user: Option<UserId>,
    /// Rated item this one is most similar to (item mode)
    pub anchor_item: Option<MovieId>,
    /// Dot product before softmax (content mode)
    pub raw_score: Option<f64>,
}

/// A scored item that may end up in the final recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub movie_id: MovieId,
    pub source: CandidateSource,
    pub score: f64,
    pub metadata: CandidateMetadata,
}

impl Candidate {
    pub fn new(movie_id: MovieId, source: CandidateSource, score: f64) -> Self {
        Self {
            movie_id,
            source,
            score,
            metadata: CandidateMetadata::default(),
        }
    }
}

/// Everything the scorers need to know about the user being served
///
/// Built once per request; see [`crate::user_context::build_user_context`].
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub user_id: UserId,
    /// (movie, raw score) in ascending movie order
    pub ratings: Vec<(MovieId, f64)>,
    /// Every movie the user has a rating for, including ratings of exactly 0
    pub rated_movies: HashSet<MovieId>,
}

impl UserContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Build a context from the user's rating rows
    ///
    /// Rows belonging to other users are ignored.
    pub fn from_ratings(user_id: UserId, ratings: &[Rating]) -> Self {
        let mut context = Self::new(user_id);
        for rating in ratings.iter().filter(|r| r.user_id == user_id) {
            if context.rated_movies.insert(rating.movie_id) {
                context
                    .ratings
                    .push((rating.movie_id, f64::from(rating.rating)));
            }
        }
        context.ratings.sort_by_key(|&(movie_id, _)| movie_id);
        context
    }

    pub fn has_rated(&self, movie_id: MovieId) -> bool {
        self.rated_movies.contains(&movie_id)
    }
}
