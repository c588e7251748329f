//! Collaborative filtering over the interaction matrix
//!
//! ## User mode
//! "Users who rate like you also rated..."
//! 1. Cosine similarity between the query user's row and every other row
//! 2. Walk neighbors from most to least similar (positive similarity only)
//! 3. Each unrated movie a neighbor liked becomes a candidate scored with the
//!    similarity of the best neighbor that introduced it
//!
//! ## Item mode
//! "Movies rated like the ones you rated..."
//! 1. Transpose so that movies are rows
//! 2. For every movie the user hasn't rated, take its highest cosine
//!    similarity to any movie the user has rated
//! 3. Movies with positive similarity become candidates
//!
//! Candidates come back sorted (score descending, movie id ascending) but not
//! cut; selecting the top N is the pipeline's job.

use crate::error::RecommendError;
use crate::matrix::InteractionMatrix;
use crate::types::{Candidate, CandidateSource};
use data_loader::UserId;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

/// Cosine of the angle between two equally sized vectors
///
/// Returns 0.0 when either vector has zero magnitude, so users with no
/// ratings never produce NaN. The result is clamped to [-1, 1].
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0)
}

/// Compare users (rows) or movies (columns)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimilarityMode {
    User,
    Item,
}

/// Cosine-similarity candidate source
pub struct CollaborativeSource {
    mode: SimilarityMode,

    /// Similarities must be strictly above this to count as evidence
    min_similarity: f64,
}

impl CollaborativeSource {
    pub fn new(mode: SimilarityMode) -> Self {
        Self {
            mode,
            min_similarity: 0.0,
        }
    }

    /// Raise the similarity floor (default: 0.0, exclusive)
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn mode(&self) -> SimilarityMode {
        self.mode
    }

    /// Rows most similar to `row_id`, best first
    ///
    /// Pass the user x item matrix to compare users, or its transpose to
    /// compare movies. The row itself is excluded, as is anything at or
    /// below the similarity floor. Ties go to the lower id.
    pub fn neighbors(
        &self,
        matrix: &InteractionMatrix,
        row_id: u32,
    ) -> Result<Vec<(u32, f64)>, RecommendError> {
        let pos = matrix.row_position(row_id).ok_or(match self.mode {
            SimilarityMode::User => RecommendError::UserNotFound(row_id),
            SimilarityMode::Item => RecommendError::ItemNotFound(row_id),
        })?;
        let query = matrix.row(pos);

        let mut neighbors: Vec<(u32, f64)> = matrix
            .row_ids()
            .par_iter()
            .enumerate()
            .filter(|&(other, _)| other != pos)
            .map(|(other, &other_id)| (other_id, cosine_similarity(query, matrix.row(other))))
            .filter(|&(_, sim)| sim > self.min_similarity)
            .collect();

        neighbors.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(neighbors)
    }

    /// Score every movie the user could be recommended
    ///
    /// `matrix` is always the user x item matrix; item mode transposes it.
    /// Returns `UserNotFound` when the user has no row. A user whose row is
    /// all zeros gets an empty list.
    #[instrument(skip(self, matrix), fields(mode = ?self.mode))]
    pub fn get_candidates(
        &self,
        matrix: &InteractionMatrix,
        user_id: UserId,
    ) -> Result<Vec<Candidate>, RecommendError> {
        if matrix.row_position(user_id).is_none() {
            return Err(RecommendError::UserNotFound(user_id));
        }

        let mut candidates = match self.mode {
            SimilarityMode::User => self.user_candidates(matrix, user_id)?,
            SimilarityMode::Item => self.item_candidates(matrix, user_id),
        };
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.movie_id.cmp(&b.movie_id))
        });

        debug!(
            "Generated {} {:?} candidates for user {}",
            candidates.len(),
            self.mode,
            user_id
        );
        Ok(candidates)
    }

    fn user_candidates(
        &self,
        matrix: &InteractionMatrix,
        user_id: UserId,
    ) -> Result<Vec<Candidate>, RecommendError> {
        let rated: HashSet<u32> = matrix.rated_items(user_id).into_iter().collect();
        let neighbors = self.neighbors(matrix, user_id)?;
        debug!("Found {} similar users", neighbors.len());

        // Neighbors arrive best first, so the first one to mention a movie sets its score
        let mut scores: HashMap<u32, Candidate> = HashMap::new();
        for (neighbor_id, similarity) in neighbors {
            let Some(pos) = matrix.row_position(neighbor_id) else {
                continue;
            };
            for (&movie_id, &value) in matrix.col_ids().iter().zip(matrix.row(pos)) {
                if value <= 0.0 || rated.contains(&movie_id) {
                    continue;
                }
                scores.entry(movie_id).or_insert_with(|| {
                    let mut candidate =
                        Candidate::new(movie_id, CandidateSource::UserNeighborhood, similarity);
                    candidate.metadata.neighbor_user = Some(neighbor_id);
                    candidate
                });
            }
        }
        Ok(scores.into_values().collect())
    }

    fn item_candidates(&self, matrix: &InteractionMatrix, user_id: UserId) -> Vec<Candidate> {
        let rated = matrix.rated_items(user_id);
        if rated.is_empty() {
            return Vec::new();
        }

        let items = matrix.transpose();
        let anchors: Vec<(u32, &[f64])> = rated
            .iter()
            .filter_map(|&movie_id| items.row_by_id(movie_id).map(|row| (movie_id, row)))
            .collect();
        let rated: HashSet<u32> = rated.into_iter().collect();

        items
            .row_ids()
            .par_iter()
            .enumerate()
            .filter(|&(_, movie_id)| !rated.contains(movie_id))
            .filter_map(|(pos, &movie_id)| {
                let row = items.row(pos);
                let mut best: Option<(u32, f64)> = None;
                // Anchors are in ascending id order; strict > keeps the lowest id on ties
                for &(anchor_id, anchor_row) in &anchors {
                    let sim = cosine_similarity(row, anchor_row);
                    if best.is_none_or(|(_, best_sim)| sim > best_sim) {
                        best = Some((anchor_id, sim));
                    }
                }
                let (anchor_id, similarity) = best?;
                (similarity > self.min_similarity).then(|| {
                    let mut candidate =
                        Candidate::new(movie_id, CandidateSource::ItemNeighborhood, similarity);
                    candidate.metadata.anchor_item = Some(anchor_id);
                    candidate
                })
            })
            .collect()
    }
}
