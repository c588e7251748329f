//! SQLite-backed ratings store.
//!
//! The store owns the relational layout the recommenders read from:
//!
//! | table                  | key                   |
//! |------------------------|-----------------------|
//! | `movie`                | `mov_id`              |
//! | `genre`                | `gen_id`              |
//! | `movie_genre`          | `(mov_id, gen_id)`    |
//! | `star`                 | `star_id`             |
//! | `movie_star`           | `(mov_id, star_id)`   |
//! | `rating`               | `rat_id`, unique `(user_id, mov_id)` |
//! | `user_recommendations` | `(user_id, mov_id)`   |
//!
//! Inserts are `INSERT OR IGNORE`, so loading the same rows twice is a no-op.
//! There is no locking beyond what SQLite does itself; two processes filling
//! the recommendation cache at once is not supported.

use crate::error::Result;
use crate::types::*;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS movie (
    mov_id INTEGER PRIMARY KEY,
    mov_orig_title TEXT NOT NULL,
    mov_eng_title TEXT,
    released_year INTEGER,
    certificate TEXT,
    runtime INTEGER,
    imdb_rating REAL,
    overview TEXT,
    meta_score INTEGER,
    director TEXT,
    gross INTEGER
);
CREATE TABLE IF NOT EXISTS genre (
    gen_id INTEGER PRIMARY KEY,
    gen_name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS movie_genre (
    mov_id INTEGER NOT NULL REFERENCES movie(mov_id),
    gen_id INTEGER NOT NULL REFERENCES genre(gen_id),
    PRIMARY KEY (mov_id, gen_id)
);
CREATE TABLE IF NOT EXISTS star (
    star_id INTEGER PRIMARY KEY,
    star_name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS movie_star (
    mov_id INTEGER NOT NULL REFERENCES movie(mov_id),
    star_id INTEGER NOT NULL REFERENCES star(star_id),
    PRIMARY KEY (mov_id, star_id)
);
CREATE TABLE IF NOT EXISTS rating (
    rat_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    mov_id INTEGER NOT NULL,
    rat_score REAL NOT NULL,
    rating_date TEXT,
    UNIQUE (user_id, mov_id)
);
CREATE INDEX IF NOT EXISTS rating_user_idx ON rating(user_id);
CREATE TABLE IF NOT EXISTS user_recommendations (
    user_id INTEGER NOT NULL,
    mov_id INTEGER NOT NULL,
    rec_score REAL NOT NULL,
    ratings_count INTEGER NOT NULL DEFAULT 0,
    ratings_total REAL NOT NULL DEFAULT 0,
    cutoff INTEGER NOT NULL DEFAULT 0,
    range_low REAL NOT NULL DEFAULT 0,
    range_high REAL NOT NULL DEFAULT 5,
    PRIMARY KEY (user_id, mov_id)
);
";

/// Handle to the ratings database
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the store at the provided sqlite path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        debug!("Opening ratings store at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a throwaway in-memory store (used by tests and dry runs)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Run `f` inside a single transaction, rolling back if it fails
    ///
    /// The transaction rolls back when dropped, so an error from `f` or from
    /// the commit itself leaves the connection outside any transaction.
    pub fn in_transaction<T>(&mut self, f: impl FnOnce(&Store) -> Result<T>) -> Result<T> {
        // `&mut self` rules out a second transaction on this connection
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Deferred)?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert a movie row. Returns false if the id already existed.
    pub fn insert_movie(&self, movie: &Movie) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO movie (
                mov_id, mov_orig_title, mov_eng_title, released_year, certificate,
                runtime, imdb_rating, overview, meta_score, director, gross
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                movie.id,
                movie.original_title,
                movie.english_title,
                movie.year,
                movie.certificate,
                movie.runtime_minutes,
                movie.imdb_rating.map(f64::from),
                movie.overview,
                movie.meta_score,
                movie.director,
                movie.gross.map(|g| g as i64),
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Insert a genre. Returns false if the id or name already existed.
    pub fn insert_genre(&self, genre: &Genre) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO genre (gen_id, gen_name) VALUES (?1, ?2)",
            params![genre.id, genre.name],
        )?;
        Ok(inserted > 0)
    }

    pub fn link_movie_genre(&self, movie_id: MovieId, genre_id: GenreId) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO movie_genre (mov_id, gen_id) VALUES (?1, ?2)",
            params![movie_id, genre_id],
        )?;
        Ok(())
    }

    pub fn insert_star(&self, star_id: StarId, name: &str) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO star (star_id, star_name) VALUES (?1, ?2)",
            params![star_id, name],
        )?;
        Ok(inserted > 0)
    }

    pub fn link_movie_star(&self, movie_id: MovieId, star_id: StarId) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO movie_star (mov_id, star_id) VALUES (?1, ?2)",
            params![movie_id, star_id],
        )?;
        Ok(())
    }

    /// Insert a rating. A second rating for the same (user, movie) is ignored.
    pub fn insert_rating(&self, rating: &Rating) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO rating (user_id, mov_id, rat_score, rating_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                rating.user_id,
                rating.movie_id,
                f64::from(rating.rating),
                rating.rating_date,
            ],
        )?;
        Ok(inserted > 0)
    }

    // =========================================================================
    // Lookups used during ingestion
    // =========================================================================

    pub fn genre_id_by_name(&self, name: &str) -> Result<Option<GenreId>> {
        Ok(self
            .conn
            .query_row(
                "SELECT gen_id FROM genre WHERE gen_name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn star_id_by_name(&self, name: &str) -> Result<Option<StarId>> {
        Ok(self
            .conn
            .query_row(
                "SELECT star_id FROM star WHERE star_name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Largest genre id in use, or 0 for an empty table
    pub fn max_genre_id(&self) -> Result<GenreId> {
        Ok(self
            .conn
            .query_row("SELECT COALESCE(MAX(gen_id), 0) FROM genre", [], |row| {
                row.get(0)
            })?)
    }

    /// Largest star id in use, or 0 for an empty table
    pub fn max_star_id(&self) -> Result<StarId> {
        Ok(self
            .conn
            .query_row("SELECT COALESCE(MAX(star_id), 0) FROM star", [], |row| {
                row.get(0)
            })?)
    }

    // =========================================================================
    // Reads used by the recommenders
    // =========================================================================

    /// Every rating in the store, ordered by (user, movie)
    pub fn ratings(&self) -> Result<Vec<Rating>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, mov_id, rat_score, rating_date
             FROM rating ORDER BY user_id, mov_id",
        )?;
        let rows = stmt.query_map([], decode_rating_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Ratings made by one user, ordered by movie id
    pub fn user_ratings(&self, user_id: UserId) -> Result<Vec<Rating>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, mov_id, rat_score, rating_date
             FROM rating WHERE user_id = ?1 ORDER BY mov_id",
        )?;
        let rows = stmt.query_map(params![user_id], decode_rating_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Distinct users that have at least one rating
    pub fn user_ids(&self) -> Result<Vec<UserId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT user_id FROM rating ORDER BY user_id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// All movie ids in the catalogue
    pub fn movie_ids(&self) -> Result<Vec<MovieId>> {
        let mut stmt = self.conn.prepare("SELECT mov_id FROM movie ORDER BY mov_id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// The genre vocabulary, ordered by id
    pub fn genres(&self) -> Result<Vec<Genre>> {
        let mut stmt = self
            .conn
            .prepare("SELECT gen_id, gen_name FROM genre ORDER BY gen_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Genre {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Every (movie, genre) membership pair
    pub fn movie_genres(&self) -> Result<Vec<(MovieId, GenreId)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT mov_id, gen_id FROM movie_genre ORDER BY mov_id, gen_id")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Look up one movie for display
    pub fn movie(&self, movie_id: MovieId) -> Result<Option<MovieSummary>> {
        let summary = self
            .conn
            .query_row(
                "SELECT mov_id, COALESCE(mov_eng_title, mov_orig_title), released_year
                 FROM movie WHERE mov_id = ?1",
                params![movie_id],
                |row| {
                    Ok(MovieSummary {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        year: row.get(2)?,
                        genres: Vec::new(),
                    })
                },
            )
            .optional()?;

        match summary {
            Some(mut summary) => {
                summary.genres = self.genre_names_for(movie_id)?;
                Ok(Some(summary))
            }
            None => Ok(None),
        }
    }

    /// Resolve many movies at once. Unknown ids are simply absent from the map.
    pub fn movies_by_ids(&self, ids: &[MovieId]) -> Result<HashMap<MovieId, MovieSummary>> {
        let mut found = HashMap::with_capacity(ids.len());
        for &id in ids {
            if let Some(movie) = self.movie(id)? {
                found.insert(id, movie);
            }
        }
        Ok(found)
    }

    /// Case-insensitive substring search over titles
    pub fn search_titles(&self, needle: &str, limit: usize) -> Result<Vec<MovieSummary>> {
        let pattern = format!("%{}%", needle.to_lowercase());
        let mut stmt = self.conn.prepare(
            "SELECT mov_id FROM movie
             WHERE LOWER(COALESCE(mov_eng_title, mov_orig_title)) LIKE ?1
             ORDER BY (LOWER(COALESCE(mov_eng_title, mov_orig_title)) = ?2) DESC, mov_id
             LIMIT ?3",
        )?;
        let ids = stmt
            .query_map(
                params![pattern, needle.to_lowercase(), limit as i64],
                |row| row.get::<_, MovieId>(0),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut movies = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(movie) = self.movie(id)? {
                movies.push(movie);
            }
        }
        Ok(movies)
    }

    fn genre_names_for(&self, movie_id: MovieId) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.gen_name FROM movie_genre mg
             JOIN genre g ON g.gen_id = mg.gen_id
             WHERE mg.mov_id = ?1 ORDER BY g.gen_id",
        )?;
        let rows = stmt.query_map(params![movie_id], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Row counts: (movies, genres, stars, ratings)
    pub fn counts(&self) -> Result<(usize, usize, usize, usize)> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        };
        Ok((count("movie")?, count("genre")?, count("star")?, count("rating")?))
    }

    // =========================================================================
    // Recommendation cache
    // =========================================================================

    /// Current fingerprint of a user's ratings
    pub fn ratings_fingerprint(&self, user_id: UserId) -> Result<RatingsFingerprint> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(rat_score), 0.0) FROM rating WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(RatingsFingerprint {
                    count: row.get(0)?,
                    total: row.get(1)?,
                })
            },
        )?)
    }

    /// Stamp recorded when the user's cache entries were written
    pub fn cached_stamp(&self, user_id: UserId) -> Result<Option<CacheStamp>> {
        Ok(self
            .conn
            .query_row(
                "SELECT ratings_count, ratings_total, cutoff, range_low, range_high
                 FROM user_recommendations WHERE user_id = ?1 LIMIT 1",
                params![user_id],
                |row| {
                    let cutoff: i64 = row.get(2)?;
                    Ok(CacheStamp {
                        ratings: RatingsFingerprint {
                            count: row.get(0)?,
                            total: row.get(1)?,
                        },
                        cutoff: cutoff as usize,
                        rating_range: (row.get(3)?, row.get(4)?),
                    })
                },
            )
            .optional()?)
    }

    /// Cached recommendations for a user, best first
    pub fn cached_recommendations(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<CachedRecommendation>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, mov_id, rec_score FROM user_recommendations
             WHERE user_id = ?1 ORDER BY rec_score DESC, mov_id ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok(CachedRecommendation {
                user_id: row.get(0)?,
                movie_id: row.get(1)?,
                score: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Replace a user's cache entries with a freshly computed list
    pub fn store_recommendations(
        &mut self,
        user_id: UserId,
        scores: &[(MovieId, f64)],
        stamp: CacheStamp,
    ) -> Result<()> {
        self.in_transaction(|store| {
            store.conn.execute(
                "DELETE FROM user_recommendations WHERE user_id = ?1",
                params![user_id],
            )?;
            let mut stmt = store.conn.prepare(
                "INSERT OR REPLACE INTO user_recommendations
                    (user_id, mov_id, rec_score, ratings_count, ratings_total,
                     cutoff, range_low, range_high)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            let (low, high) = stamp.rating_range;
            for &(movie_id, score) in scores {
                stmt.execute(params![
                    user_id,
                    movie_id,
                    score,
                    stamp.ratings.count,
                    stamp.ratings.total,
                    stamp.cutoff as i64,
                    low,
                    high
                ])?;
            }
            Ok(())
        })
    }

    /// Drop cache entries for one user, or for everyone. Returns rows removed.
    pub fn clear_cache(&self, user_id: Option<UserId>) -> Result<usize> {
        let removed = match user_id {
            Some(user_id) => self.conn.execute(
                "DELETE FROM user_recommendations WHERE user_id = ?1",
                params![user_id],
            )?,
            None => self.conn.execute("DELETE FROM user_recommendations", [])?,
        };
        Ok(removed)
    }
}

fn decode_rating_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Rating> {
    let score: f64 = row.get(2)?;
    Ok(Rating {
        user_id: row.get(0)?,
        movie_id: row.get(1)?,
        rating: score as f32,
        rating_date: row.get(3)?,
    })
}
