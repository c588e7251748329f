//! Core domain types for the movie ratings database.
//!
//! This module defines the rows that flow between the CSV files, the SQLite
//! store and the recommendation crates:
//! - Type aliases for domain clarity (UserId, MovieId, GenreId, StarId)
//! - `Movie` as parsed from the catalogue CSV
//! - `Rating`, `Genre` and the read-side `MovieSummary`
//! - Cache rows and the ratings fingerprint used to judge cache freshness

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// Type Aliases
// =============================================================================
// These make the domain clearer and prevent mixing up user IDs with movie IDs

/// Identifier of a user who rated movies
pub type UserId = u32;

/// Identifier of a movie (`mov_id` in the store)
pub type MovieId = u32;

/// Identifier of a genre (`gen_id` in the store)
pub type GenreId = u32;

/// Identifier of a credited star (`star_id` in the store)
pub type StarId = u32;

// =============================================================================
// Movie-related Types
// =============================================================================

/// A movie as described by one row of the catalogue CSV
///
/// Optional columns are `None` when the CSV cell is blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub original_title: String,
    /// The catalogue only carries one title, so this usually equals `original_title`
    pub english_title: String,
    pub year: Option<u16>,
    pub certificate: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub imdb_rating: Option<f32>,
    pub overview: Option<String>,
    pub meta_score: Option<u32>,
    pub director: Option<String>,
    /// Box office gross in whole dollars
    pub gross: Option<u64>,
    /// Genre names in the order the CSV lists them
    pub genres: Vec<String>,
    /// Star names in credit order (Star1..Star4)
    pub stars: Vec<String>,
}

/// A genre from the fixed feature vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

/// Read-side view of a movie used for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    pub year: Option<u16>,
    pub genres: Vec<String>,
}

// =============================================================================
// Rating Type
// =============================================================================

/// A single rating from a user for a movie
///
/// Small and `Copy`; the store hands out `Vec<Rating>` by value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Raw score. No range is enforced at ingestion time.
    pub rating: f32,
    /// Day the rating was recorded, when known
    pub rating_date: Option<NaiveDate>,
}

// =============================================================================
// Recommendation cache
// =============================================================================

/// One persisted row of the recommendation cache
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachedRecommendation {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub score: f64,
}

/// Summary of a user's ratings at a point in time
///
/// Any insert of a new rating changes `count`, so two equal fingerprints
/// mean the cached recommendations were computed from the same rating set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingsFingerprint {
    pub count: i64,
    pub total: f64,
}

/// Everything a user's cache entry was computed from
///
/// Rows are written best first and cut at `cutoff`, so an entry holding
/// fewer than `cutoff` rows means the candidates ran out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheStamp {
    pub ratings: RatingsFingerprint,
    pub cutoff: usize,
    pub rating_range: (f64, f64),
}

impl CacheStamp {
    /// Whether `served` rows read back from this entry fully answer a request
    /// for `cutoff` results scored with `rating_range`
    pub fn covers(&self, cutoff: usize, rating_range: (f64, f64), served: usize) -> bool {
        self.rating_range == rating_range && (served >= cutoff || served < self.cutoff)
    }
}
