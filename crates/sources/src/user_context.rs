//! Builders that gather per-request inputs from the ratings store
//!
//! Everything the scorers touch is read once here and handed over by
//! reference: the user's context, the interaction matrix and the genre
//! feature matrix. Nothing is cached between requests.

use crate::content::FeatureMatrix;
use crate::error::RecommendError;
use crate::matrix::InteractionMatrix;
use crate::types::UserContext;
use anyhow::{Context, Result};
use data_loader::{GenreId, Store, UserId};
use tracing::debug;

/// Build a UserContext for a user from their stored ratings
///
/// The store only knows users through their ratings, so a user with none
/// is reported as [`RecommendError::UserNotFound`].
pub fn build_user_context(store: &Store, user_id: UserId) -> Result<UserContext> {
    let ratings = store
        .user_ratings(user_id)
        .with_context(|| format!("Failed to read ratings for user {}", user_id))?;

    if ratings.is_empty() {
        return Err(RecommendError::UserNotFound(user_id).into());
    }

    let context = UserContext::from_ratings(user_id, &ratings);
    debug!(
        "User {} has rated {} movies",
        user_id,
        context.rated_movies.len()
    );
    Ok(context)
}

/// Lay out every stored rating as a user x movie matrix
///
/// `extra_users` get a row even without ratings.
pub fn build_interaction_matrix(
    store: &Store,
    extra_users: &[UserId],
) -> Result<InteractionMatrix> {
    let ratings = store.ratings().context("Failed to read ratings")?;
    let matrix = InteractionMatrix::builder()
        .with_users(extra_users.iter().copied())
        .ratings(&ratings)
        .build();
    debug!(
        "Built {}x{} interaction matrix",
        matrix.n_rows(),
        matrix.n_cols()
    );
    Ok(matrix)
}

/// Build the movie x genre matrix over the whole catalogue
///
/// Genre columns follow genre id order. Movies without genres get a zero row.
pub fn build_feature_matrix(store: &Store) -> Result<FeatureMatrix> {
    let vocabulary: Vec<GenreId> = store
        .genres()
        .context("Failed to read genres")?
        .into_iter()
        .map(|genre| genre.id)
        .collect();
    let memberships = store
        .movie_genres()
        .context("Failed to read movie genres")?;
    let movie_ids = store.movie_ids().context("Failed to read movies")?;

    let features = FeatureMatrix::new(&vocabulary, &memberships).with_items(movie_ids);
    debug!(
        "Built feature matrix: {} movies, {} genres",
        features.n_items(),
        features.n_features()
    );
    Ok(features)
}
