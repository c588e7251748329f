//! User x item interaction matrix
//!
//! A dense table with one row per user and one column per movie. Cells hold
//! the rating, or 0.0 where the user never rated the movie. Because a rating
//! of exactly 0 is legal, presence is tracked in a parallel bitmap instead of
//! being inferred from the value.
//!
//! Rows and columns are ordered by ascending id, so two matrices built from
//! the same set of ratings are identical regardless of input order.

use data_loader::{MovieId, Rating, UserId};
use std::collections::{BTreeSet, HashMap};

/// Dense row-major rating matrix
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionMatrix {
    row_ids: Vec<u32>,
    col_ids: Vec<u32>,
    row_index: HashMap<u32, usize>,
    col_index: HashMap<u32, usize>,
    values: Vec<f64>,
    observed: Vec<bool>,
}

impl InteractionMatrix {
    /// Start an empty builder
    pub fn builder() -> InteractionMatrixBuilder {
        InteractionMatrixBuilder::default()
    }

    /// Build a matrix from rating rows
    ///
    /// Every distinct user becomes a row and every distinct movie a column.
    pub fn from_ratings(ratings: &[Rating]) -> Self {
        Self::builder().ratings(ratings).build()
    }

    pub fn n_rows(&self) -> usize {
        self.row_ids.len()
    }

    pub fn n_cols(&self) -> usize {
        self.col_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty() || self.col_ids.is_empty()
    }

    /// Row identifiers (users, unless transposed) in ascending order
    pub fn row_ids(&self) -> &[u32] {
        &self.row_ids
    }

    /// Column identifiers (movies, unless transposed) in ascending order
    pub fn col_ids(&self) -> &[u32] {
        &self.col_ids
    }

    pub fn row_position(&self, row_id: u32) -> Option<usize> {
        self.row_index.get(&row_id).copied()
    }

    pub fn col_position(&self, col_id: u32) -> Option<usize> {
        self.col_index.get(&col_id).copied()
    }

    /// Slice of one row by position
    ///
    /// Panics if `pos >= n_rows()`; use [`row_position`](Self::row_position) first.
    pub fn row(&self, pos: usize) -> &[f64] {
        let width = self.n_cols();
        &self.values[pos * width..(pos + 1) * width]
    }

    /// Row slice by identifier
    pub fn row_by_id(&self, row_id: u32) -> Option<&[f64]> {
        self.row_position(row_id).map(|pos| self.row(pos))
    }

    /// The stored rating, or `None` if the pair was never rated
    pub fn get(&self, row_id: u32, col_id: u32) -> Option<f64> {
        let offset = self.offset(row_id, col_id)?;
        self.observed[offset].then(|| self.values[offset])
    }

    /// The cell value, 0.0 for absent pairs and unknown ids
    pub fn value(&self, row_id: u32, col_id: u32) -> f64 {
        self.offset(row_id, col_id)
            .map(|offset| self.values[offset])
            .unwrap_or(0.0)
    }

    pub fn is_observed(&self, row_id: u32, col_id: u32) -> bool {
        self.offset(row_id, col_id)
            .is_some_and(|offset| self.observed[offset])
    }

    /// Column ids with an observed rating in the given row, ascending
    pub fn rated_items(&self, row_id: u32) -> Vec<u32> {
        let Some(pos) = self.row_position(row_id) else {
            return Vec::new();
        };
        let width = self.n_cols();
        self.observed[pos * width..(pos + 1) * width]
            .iter()
            .zip(&self.col_ids)
            .filter_map(|(&seen, &col_id)| seen.then_some(col_id))
            .collect()
    }

    /// Swap rows and columns, so items can be compared like users
    pub fn transpose(&self) -> Self {
        let (rows, cols) = (self.n_rows(), self.n_cols());
        let mut values = vec![0.0; rows * cols];
        let mut observed = vec![false; rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                values[c * rows + r] = self.values[r * cols + c];
                observed[c * rows + r] = self.observed[r * cols + c];
            }
        }
        Self {
            row_ids: self.col_ids.clone(),
            col_ids: self.row_ids.clone(),
            row_index: self.col_index.clone(),
            col_index: self.row_index.clone(),
            values,
            observed,
        }
    }

    fn offset(&self, row_id: u32, col_id: u32) -> Option<usize> {
        let r = self.row_position(row_id)?;
        let c = self.col_position(col_id)?;
        Some(r * self.n_cols() + c)
    }
}

/// Collects users, items and ratings before laying out the dense matrix
#[derive(Debug, Clone, Default)]
pub struct InteractionMatrixBuilder {
    users: BTreeSet<UserId>,
    items: BTreeSet<MovieId>,
    cells: HashMap<(UserId, MovieId), f64>,
}

impl InteractionMatrixBuilder {
    /// Ensure these users get a row even with no ratings
    pub fn with_users(mut self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.users.extend(users);
        self
    }

    /// Ensure these movies get a column even with no ratings
    pub fn with_items(mut self, items: impl IntoIterator<Item = MovieId>) -> Self {
        self.items.extend(items);
        self
    }

    /// Record one rating; a repeated (user, movie) pair keeps the first score
    pub fn rating(mut self, user_id: UserId, movie_id: MovieId, score: f64) -> Self {
        self.users.insert(user_id);
        self.items.insert(movie_id);
        self.cells.entry((user_id, movie_id)).or_insert(score);
        self
    }

    pub fn ratings(self, ratings: &[Rating]) -> Self {
        ratings.iter().fold(self, |builder, r| {
            builder.rating(r.user_id, r.movie_id, f64::from(r.rating))
        })
    }

    pub fn build(self) -> InteractionMatrix {
        let row_ids: Vec<UserId> = self.users.into_iter().collect();
        let col_ids: Vec<MovieId> = self.items.into_iter().collect();
        let row_index: HashMap<u32, usize> =
            row_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let col_index: HashMap<u32, usize> =
            col_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let width = col_ids.len();
        let mut values = vec![0.0; row_ids.len() * width];
        let mut observed = vec![false; row_ids.len() * width];
        for ((user_id, movie_id), score) in self.cells {
            let offset = row_index[&user_id] * width + col_index[&movie_id];
            values[offset] = score;
            observed[offset] = true;
        }

        InteractionMatrix {
            row_ids,
            col_ids,
            row_index,
            col_index,
            values,
            observed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user_id: UserId, movie_id: MovieId, rating: f32) -> Rating {
        Rating {
            user_id,
            movie_id,
            rating,
            rating_date: None,
        }
    }

    fn create_test_matrix() -> InteractionMatrix {
        InteractionMatrix::from_ratings(&[
            rating(2, 20, 4.0),
            rating(1, 10, 5.0),
            rating(1, 30, 0.0),
            rating(3, 10, 2.5),
        ])
    }

    #[test]
    fn test_rows_and_columns_sorted() {
        let matrix = create_test_matrix();
        assert_eq!(matrix.row_ids(), &[1, 2, 3]);
        assert_eq!(matrix.col_ids(), &[10, 20, 30]);
        assert_eq!(matrix.row_by_id(1).unwrap(), &[5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_absent_cell_differs_from_zero_rating() {
        let matrix = create_test_matrix();

        // User 1 rated movie 30 with a 0
        assert_eq!(matrix.value(1, 30), 0.0);
        assert_eq!(matrix.get(1, 30), Some(0.0));
        assert!(matrix.is_observed(1, 30));

        // User 2 never rated movie 30
        assert_eq!(matrix.value(2, 30), 0.0);
        assert_eq!(matrix.get(2, 30), None);
        assert!(!matrix.is_observed(2, 30));

        assert_eq!(matrix.rated_items(1), vec![10, 30]);
    }

    #[test]
    fn test_empty_input() {
        let matrix = InteractionMatrix::from_ratings(&[]);
        assert!(matrix.is_empty());
        assert_eq!(matrix.n_rows(), 0);
        assert_eq!(matrix.value(1, 1), 0.0);
        assert!(matrix.rated_items(1).is_empty());
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let matrix = InteractionMatrix::from_ratings(&[rating(1, 10, 3.0), rating(1, 10, 1.0)]);
        assert_eq!(matrix.get(1, 10), Some(3.0));
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let a = InteractionMatrix::from_ratings(&[rating(1, 10, 5.0), rating(2, 20, 3.0)]);
        let b = InteractionMatrix::from_ratings(&[rating(2, 20, 3.0), rating(1, 10, 5.0)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_transpose() {
        let matrix = create_test_matrix();
        let items = matrix.transpose();

        assert_eq!(items.row_ids(), &[10, 20, 30]);
        assert_eq!(items.col_ids(), &[1, 2, 3]);
        assert_eq!(items.row_by_id(10).unwrap(), &[5.0, 0.0, 2.5]);
        assert_eq!(items.get(30, 1), Some(0.0));
        assert_eq!(items.get(30, 2), None);
        assert_eq!(items.transpose(), matrix);
    }

    #[test]
    fn test_extra_users_get_zero_rows() {
        let matrix = InteractionMatrix::builder()
            .with_users([7])
            .ratings(&[rating(1, 10, 4.0)])
            .build();

        assert_eq!(matrix.row_ids(), &[1, 7]);
        assert_eq!(matrix.row_by_id(7).unwrap(), &[0.0]);
        assert!(matrix.rated_items(7).is_empty());
    }
}
