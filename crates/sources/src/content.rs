//! Content-based scoring from genre preferences
//!
//! ## Algorithm
//! 1. Clamp the user's ratings into the configured range (default [0, 5])
//! 2. Multiply the rating vector by the movie x genre membership matrix
//! 3. Divide by the clamped rating total to get a preference per genre
//! 4. Score each unrated movie by the dot product of its genre row with the
//!    preference vector
//! 5. Turn the raw scores into a probability distribution with softmax
//!
//! Softmax spreads a fixed mass over every candidate, so individual scores
//! shrink as the catalogue grows. Only their order is meaningful.

use crate::types::{Candidate, CandidateSource, UserContext};
use data_loader::{GenreId, MovieId};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument, warn};

/// Binary movie x genre matrix
///
/// Columns follow the vocabulary order passed to [`FeatureMatrix::new`];
/// rows are kept in ascending movie id order.
#[derive(Debug, Clone, Default)]
pub struct FeatureMatrix {
    vocabulary: Vec<GenreId>,
    rows: BTreeMap<MovieId, Vec<f64>>,
}

impl FeatureMatrix {
    /// Build the matrix from a genre vocabulary and (movie, genre) links
    ///
    /// Links to genres outside the vocabulary are skipped with a warning.
    pub fn new(vocabulary: &[GenreId], memberships: &[(MovieId, GenreId)]) -> Self {
        let column: HashMap<GenreId, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, &genre_id)| (genre_id, i))
            .collect();

        let mut rows: BTreeMap<MovieId, Vec<f64>> = BTreeMap::new();
        for &(movie_id, genre_id) in memberships {
            let Some(&col) = column.get(&genre_id) else {
                warn!(
                    "Movie {} links to unknown genre {}, skipping",
                    movie_id, genre_id
                );
                continue;
            };
            rows.entry(movie_id)
                .or_insert_with(|| vec![0.0; vocabulary.len()])[col] = 1.0;
        }

        Self {
            vocabulary: vocabulary.to_vec(),
            rows,
        }
    }

    /// Add movies that have no genre links, so they can still be scored
    pub fn with_items(mut self, items: impl IntoIterator<Item = MovieId>) -> Self {
        let width = self.vocabulary.len();
        for movie_id in items {
            self.rows.entry(movie_id).or_insert_with(|| vec![0.0; width]);
        }
        self
    }

    pub fn vocabulary(&self) -> &[GenreId] {
        &self.vocabulary
    }

    pub fn n_items(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn contains(&self, movie_id: MovieId) -> bool {
        self.rows.contains_key(&movie_id)
    }

    pub fn row(&self, movie_id: MovieId) -> Option<&[f64]> {
        self.rows.get(&movie_id).map(Vec::as_slice)
    }

    /// Movies with a row, ascending
    pub fn items(&self) -> impl Iterator<Item = MovieId> + '_ {
        self.rows.keys().copied()
    }
}

/// Rating-weighted genre affinity for one user
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceVector(Vec<f64>);

impl PreferenceVector {
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn dot(&self, other: &[f64]) -> f64 {
        self.0.iter().zip(other).map(|(a, b)| a * b).sum()
    }
}

/// Reduce a user's ratings to one weight per genre
///
/// Ratings are clamped to `range` first. Rated movies missing from the
/// feature matrix still add to the total but contribute no genres. A zero
/// total gives the zero vector. An inverted range is not an error here:
/// every rating then lands on `range.1`.
pub fn preference_vector(
    ratings: &[(MovieId, f64)],
    features: &FeatureMatrix,
    range: (f64, f64),
) -> PreferenceVector {
    let (low, high) = range;
    let mut preference = vec![0.0; features.n_features()];
    let mut total = 0.0;

    for &(movie_id, score) in ratings {
        let weight = score.max(low).min(high);
        total += weight;
        if let Some(row) = features.row(movie_id) {
            for (acc, &member) in preference.iter_mut().zip(row) {
                *acc += weight * member;
            }
        }
    }

    if total == 0.0 {
        return PreferenceVector::zeros(features.n_features());
    }
    for value in &mut preference {
        *value /= total;
    }
    PreferenceVector(preference)
}

/// Numerically stable softmax
///
/// The maximum is subtracted before exponentiating so large inputs don't
/// overflow. If the maximum itself is infinite the whole mass is shared by
/// the entries equal to it. NaN entries get zero weight. The output sums to
/// 1 for any non-empty input.
pub fn softmax(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if !max.is_finite() {
        let winners = values.iter().filter(|&&v| v == max).count();
        if winners == 0 {
            // Every entry was NaN
            return vec![1.0 / values.len() as f64; values.len()];
        }
        let share = 1.0 / winners as f64;
        return values
            .iter()
            .map(|&v| if v == max { share } else { 0.0 })
            .collect();
    }

    let exps: Vec<f64> = values
        .iter()
        .map(|&v| if v.is_nan() { 0.0 } else { (v - max).exp() })
        .collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Genre-preference candidate source
pub struct ContentSource {
    /// Ratings are clamped into this range before weighting
    rating_range: (f64, f64),
}

impl ContentSource {
    pub fn new() -> Self {
        Self {
            rating_range: (0.0, 5.0),
        }
    }

    /// Configure the clamp range (default: [0, 5])
    pub fn with_rating_range(mut self, low: f64, high: f64) -> Self {
        self.rating_range = (low, high);
        self
    }

    /// Score every movie in `features` that the user hasn't rated
    ///
    /// Scores are softmax probabilities; the dot product before softmax is
    /// kept in `metadata.raw_score`. Sorted best first, ties by movie id.
    #[instrument(skip(self, user_context, features), fields(user_id = user_context.user_id))]
    pub fn get_candidates(
        &self,
        user_context: &UserContext,
        features: &FeatureMatrix,
    ) -> Vec<Candidate> {
        let preference = preference_vector(&user_context.ratings, features, self.rating_range);
        debug!(
            "Preference vector over {} genres (zero: {})",
            features.n_features(),
            preference.is_zero()
        );

        let (movie_ids, raw_scores): (Vec<MovieId>, Vec<f64>) = features
            .rows
            .iter()
            .filter(|(movie_id, _)| !user_context.has_rated(**movie_id))
            .map(|(&movie_id, row)| (movie_id, preference.dot(row)))
            .unzip();

        let mut candidates: Vec<Candidate> = movie_ids
            .into_iter()
            .zip(raw_scores.iter().copied())
            .zip(softmax(&raw_scores))
            .map(|((movie_id, raw), score)| {
                let mut candidate = Candidate::new(movie_id, CandidateSource::Content, score);
                candidate.metadata.raw_score = Some(raw);
                candidate
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.movie_id.cmp(&b.movie_id))
        });

        debug!("Generated {} content candidates", candidates.len());
        candidates
    }
}

impl Default for ContentSource {
    fn default() -> Self {
        Self::new()
    }
}
