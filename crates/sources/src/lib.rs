//! # Sources Crate
//!
//! This crate scores candidate movies for a user. It holds the in-memory
//! structures built from the ratings store and the scorers that run on them.
//!
//! ## Components
//!
//! ### Interaction Matrix
//! Dense user x movie table of ratings, absent pairs stored as 0 with a
//! separate presence bitmap.
//!
//! ### Collaborative Source (user or item mode)
//! Cosine similarity over matrix rows:
//! - User mode: "Users who rate like you also rated..."
//! - Item mode: "Movies rated like the ones you rated..."
//!
//! ### Content Source
//! Genre preference vector from the user's ratings, dotted with each
//! unrated movie's genres and normalised with softmax.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{CollaborativeSource, SimilarityMode, user_context::*};
//! use data_loader::Store;
//!
//! let store = Store::open("movies.db")?;
//! let matrix = build_interaction_matrix(&store, &[])?;
//!
//! let source = CollaborativeSource::new(SimilarityMode::User);
//! let candidates = source.get_candidates(&matrix, user_id)?;
//! ```
//!
//! Sources return every scored candidate; the pipeline crate picks the top N.

// Public modules
pub mod content;
pub mod error;
pub mod matrix;
pub mod similarity;
pub mod types;
pub mod user_context;

// Re-export commonly used types
pub use content::{ContentSource, FeatureMatrix, PreferenceVector};
pub use error::RecommendError;
pub use matrix::{InteractionMatrix, InteractionMatrixBuilder};
pub use similarity::{CollaborativeSource, SimilarityMode};
pub use types::{Candidate, CandidateMetadata, CandidateSource, UserContext};

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Rating;

    #[test]
    fn test_candidate_creation() {
        let candidate = Candidate::new(1, CandidateSource::Content, 0.85);
        assert_eq!(candidate.movie_id, 1);
        assert_eq!(candidate.source, CandidateSource::Content);
        assert_eq!(candidate.score, 0.85);
        assert_eq!(candidate.metadata, CandidateMetadata::default());
    }

    #[test]
    fn test_user_context_from_ratings() {
        let ratings = [
            Rating { user_id: 1, movie_id: 20, rating: 4.0, rating_date: None },
            Rating { user_id: 2, movie_id: 30, rating: 1.0, rating_date: None },
            Rating { user_id: 1, movie_id: 10, rating: 0.0, rating_date: None },
            Rating { user_id: 1, movie_id: 20, rating: 2.0, rating_date: None },
        ];
        let context = UserContext::from_ratings(1, &ratings);

        // Other users are ignored, duplicates keep the first score
        assert_eq!(context.ratings, vec![(10, 0.0), (20, 4.0)]);
        assert!(context.has_rated(10));
        assert!(!context.has_rated(30));
    }

    #[test]
    fn test_sources_agree_on_unknown_user() {
        let matrix = InteractionMatrix::from_ratings(&[Rating {
            user_id: 1,
            movie_id: 1,
            rating: 5.0,
            rating_date: None,
        }]);
        let result = CollaborativeSource::new(SimilarityMode::Item).get_candidates(&matrix, 2);
        assert_eq!(result.unwrap_err(), RecommendError::UserNotFound(2));
    }
}
