//! Ingestion of parsed CSV rows into the ratings store.
//!
//! This is the single loading path for the database:
//! 1. Parse the catalogue or ratings CSV (see `parser`)
//! 2. Insert rows with `INSERT OR IGNORE` inside one transaction
//! 3. Assign genre and star ids by first-seen order, continuing after any
//!    ids already present so a second catalogue never collides with the first

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::store::Store;
use crate::types::*;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// What a load actually changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub movies: usize,
    pub genres: usize,
    pub stars: usize,
    pub ratings: usize,
}

/// Load a movie catalogue CSV into the store
pub fn load_movies_csv(store: &mut Store, path: &Path) -> Result<LoadSummary> {
    info!("Loading movie catalogue from {}", path.display());
    let movies = parser::parse_movies_file(path)?;
    load_movies(store, &movies)
}

/// Insert movies together with their genre and star links
pub fn load_movies(store: &mut Store, movies: &[Movie]) -> Result<LoadSummary> {
    let summary = store.in_transaction(|store| {
        let mut summary = LoadSummary::default();
        let mut next_genre_id = store.max_genre_id()? + 1;
        let mut next_star_id = store.max_star_id()? + 1;

        for movie in movies {
            if store.insert_movie(movie)? {
                summary.movies += 1;
            }

            for name in &movie.genres {
                let genre_id = match store.genre_id_by_name(name)? {
                    Some(id) => id,
                    None => {
                        let genre = Genre {
                            id: next_genre_id,
                            name: name.clone(),
                        };
                        store.insert_genre(&genre)?;
                        next_genre_id += 1;
                        summary.genres += 1;
                        genre.id
                    }
                };
                store.link_movie_genre(movie.id, genre_id)?;
            }

            for name in &movie.stars {
                let star_id = match store.star_id_by_name(name)? {
                    Some(id) => id,
                    None => {
                        let id = next_star_id;
                        store.insert_star(id, name)?;
                        next_star_id += 1;
                        summary.stars += 1;
                        id
                    }
                };
                store.link_movie_star(movie.id, star_id)?;
            }
        }
        Ok(summary)
    })?;

    info!(
        "Loaded {} movies, {} genres, {} stars",
        summary.movies, summary.genres, summary.stars
    );
    Ok(summary)
}

/// Load a ratings CSV into the store
pub fn load_ratings_csv(store: &mut Store, path: &Path) -> Result<LoadSummary> {
    info!("Loading ratings from {}", path.display());
    let ratings = parser::parse_ratings_file(path)?;
    load_ratings(store, &ratings)
}

/// Insert ratings, rejecting any that point at a movie the store doesn't know
pub fn load_ratings(store: &mut Store, ratings: &[Rating]) -> Result<LoadSummary> {
    let known: HashSet<MovieId> = store.movie_ids()?.into_iter().collect();

    let summary = store.in_transaction(|store| {
        let mut summary = LoadSummary::default();
        for rating in ratings {
            if !known.contains(&rating.movie_id) {
                return Err(DataLoadError::MissingReference {
                    entity: "Movie".to_string(),
                    id: rating.movie_id,
                });
            }
            if store.insert_rating(rating)? {
                summary.ratings += 1;
            }
        }
        Ok(summary)
    })?;

    info!("Loaded {} ratings", summary.ratings);
    Ok(summary)
}

/// Build one rating per movie for `user_id`, scored by `score`
///
/// This produces demo data for a fresh catalogue: the caller decides how
/// scores are drawn (e.g. uniformly from 0.5..=5.0).
pub fn synthesize_ratings(
    movie_ids: &[MovieId],
    user_id: UserId,
    date: NaiveDate,
    mut score: impl FnMut() -> f32,
) -> Vec<Rating> {
    movie_ids
        .iter()
        .map(|&movie_id| Rating {
            user_id,
            movie_id,
            rating: score(),
            rating_date: Some(date),
        })
        .collect()
}
