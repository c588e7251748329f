//! # Data Loader Crate
//!
//! This crate owns everything on the storage side of the recommenders:
//! the SQLite ratings store, CSV ingestion into it, and the recommendation
//! cache table.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Movie, Rating, Genre, cache rows)
//! - **parser**: Parse the catalogue and ratings CSV files
//! - **store**: SQLite schema, inserts and the queries the recommenders need
//! - **etl**: The one loading path from CSV into the store
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{Store, etl};
//! use std::path::Path;
//!
//! let mut store = Store::open("movies.db")?;
//! etl::load_movies_csv(&mut store, Path::new("imdb_top_1000.csv"))?;
//!
//! let ratings = store.user_ratings(1)?;
//! println!("User 1 rated {} movies", ratings.len());
//! ```

// Public modules
pub mod error;
pub mod etl;
pub mod parser;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use etl::LoadSummary;
pub use store::Store;
pub use types::{
    // Type aliases
    GenreId,
    MovieId,
    StarId,
    UserId,
    // Core types
    CacheStamp,
    CachedRecommendation,
    Genre,
    Movie,
    MovieSummary,
    Rating,
    RatingsFingerprint,
};
