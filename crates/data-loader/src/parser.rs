//! Parsers for the CSV inputs.
//!
//! Two layouts are understood:
//! - the movie catalogue (IMDb top-1000 layout): `Series_Title`, `Released_Year`,
//!   `Certificate`, `Runtime`, `Genre`, `IMDB_Rating`, `Overview`, `Meta_score`,
//!   `Director`, `Star1`..`Star4`, `Gross` (other columns are ignored)
//! - ratings: `user_id,mov_id,rat_score[,rating_date]`
//!
//! Records are decoded with serde through the `csv` crate; the few fields that
//! need cleanup (`"142 min"`, `"28,341,469"`, `"Crime, Drama"`) are handled here.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Raw catalogue row, exactly as the CSV spells it
#[derive(Debug, Deserialize)]
struct MovieRow {
    #[serde(rename = "Series_Title")]
    series_title: String,
    #[serde(rename = "Released_Year", default, deserialize_with = "csv::invalid_option")]
    released_year: Option<u16>,
    #[serde(rename = "Certificate", default)]
    certificate: Option<String>,
    #[serde(rename = "Runtime", default)]
    runtime: Option<String>,
    #[serde(rename = "Genre", default)]
    genre: Option<String>,
    #[serde(rename = "IMDB_Rating", default, deserialize_with = "csv::invalid_option")]
    imdb_rating: Option<f32>,
    #[serde(rename = "Overview", default)]
    overview: Option<String>,
    #[serde(rename = "Meta_score", default, deserialize_with = "csv::invalid_option")]
    meta_score: Option<f32>,
    #[serde(rename = "Director", default)]
    director: Option<String>,
    #[serde(rename = "Star1", default)]
    star1: Option<String>,
    #[serde(rename = "Star2", default)]
    star2: Option<String>,
    #[serde(rename = "Star3", default)]
    star3: Option<String>,
    #[serde(rename = "Star4", default)]
    star4: Option<String>,
    #[serde(rename = "Gross", default)]
    gross: Option<String>,
}

/// Raw ratings row
#[derive(Debug, Deserialize)]
struct RatingRow {
    user_id: UserId,
    mov_id: MovieId,
    rat_score: f32,
    #[serde(default)]
    rating_date: Option<String>,
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(reader)
}

/// Parse the movie catalogue from any reader
///
/// Movie ids are assigned from the row position: the first data row is movie 1.
pub fn parse_movies<R: Read>(reader: R, source: &str) -> Result<Vec<Movie>> {
    let mut rdr = csv_reader(reader);
    let mut movies = Vec::new();

    for (idx, record) in rdr.deserialize::<MovieRow>().enumerate() {
        // Line 1 is the header
        let line_no = idx as u64 + 2;
        let row = record?;

        let parse_error = |reason: String| DataLoadError::ParseError {
            file: source.to_string(),
            line: line_no,
            reason,
        };

        let runtime_minutes = match row.runtime.as_deref() {
            Some(raw) => Some(
                parse_runtime(raw).ok_or_else(|| parse_error(format!("Invalid Runtime: {}", raw)))?,
            ),
            None => None,
        };

        let gross = match row.gross.as_deref() {
            Some(raw) => Some(
                parse_gross(raw).ok_or_else(|| parse_error(format!("Invalid Gross: {}", raw)))?,
            ),
            None => None,
        };

        let stars = [row.star1, row.star2, row.star3, row.star4]
            .into_iter()
            .flatten()
            .collect();

        movies.push(Movie {
            id: idx as MovieId + 1,
            original_title: row.series_title.clone(),
            english_title: row.series_title,
            year: row.released_year,
            certificate: row.certificate,
            runtime_minutes,
            imdb_rating: row.imdb_rating,
            overview: row.overview,
            meta_score: row.meta_score.map(|s| s.round() as u32),
            director: row.director,
            gross,
            genres: row.genre.as_deref().map(parse_genres).unwrap_or_default(),
            stars,
        });
    }

    Ok(movies)
}

/// Parse the movie catalogue from a file on disk
pub fn parse_movies_file(path: &Path) -> Result<Vec<Movie>> {
    let file = open_file(path)?;
    parse_movies(file, &path.display().to_string())
}

/// Parse ratings from any reader
pub fn parse_ratings<R: Read>(reader: R, source: &str) -> Result<Vec<Rating>> {
    let mut rdr = csv_reader(reader);
    let mut ratings = Vec::new();

    for (idx, record) in rdr.deserialize::<RatingRow>().enumerate() {
        let line_no = idx as u64 + 2;
        let row = record?;

        let rating_date = match row.rating_date.as_deref() {
            Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                DataLoadError::ParseError {
                    file: source.to_string(),
                    line: line_no,
                    reason: format!("Invalid rating_date {}: {}", raw, e),
                }
            })?),
            None => None,
        };

        if !row.rat_score.is_finite() {
            return Err(DataLoadError::InvalidValue {
                field: "rat_score".to_string(),
                value: row.rat_score.to_string(),
            });
        }

        ratings.push(Rating {
            user_id: row.user_id,
            movie_id: row.mov_id,
            rating: row.rat_score,
            rating_date,
        });
    }

    Ok(ratings)
}

/// Parse ratings from a file on disk
pub fn parse_ratings_file(path: &Path) -> Result<Vec<Rating>> {
    let file = open_file(path)?;
    parse_ratings(file, &path.display().to_string())
}

/// Extract minutes from a runtime cell
///
/// Example: "142 min" -> Some(142)
fn parse_runtime(s: &str) -> Option<u32> {
    s.trim().trim_end_matches("min").trim().parse().ok()
}

/// Parse a gross cell with thousands separators
///
/// Example: "28,341,469" -> Some(28341469)
fn parse_gross(s: &str) -> Option<u64> {
    s.replace(',', "").trim().parse().ok()
}

/// Split a comma-separated genre cell
///
/// Example: "Crime, Drama" -> ["Crime", "Drama"]
fn parse_genres(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOGUE: &str = "\
Poster_Link,Series_Title,Released_Year,Certificate,Runtime,Genre,IMDB_Rating,Overview,Meta_score,Director,Star1,Star2,Star3,Star4,No_of_Votes,Gross
http://x/1.jpg,The Shawshank Redemption,1994,A,142 min,Drama,9.3,Two imprisoned men bond.,80.0,Frank Darabont,Tim Robbins,Morgan Freeman,Bob Gunton,William Sadler,2343110,\"28,341,469\"
http://x/2.jpg,Apollo 13,PG,U,140 min,\"Adventure, Drama, History\",7.6,Houston.,77.0,Ron Howard,Tom Hanks,Bill Paxton,Kevin Bacon,Gary Sinise,269197,
";

    #[test]
    fn test_parse_runtime() {
        assert_eq!(parse_runtime("142 min"), Some(142));
        assert_eq!(parse_runtime("min"), None);
    }

    #[test]
    fn test_parse_gross() {
        assert_eq!(parse_gross("28,341,469"), Some(28_341_469));
        assert_eq!(parse_gross("n/a"), None);
    }

    #[test]
    fn test_parse_genres() {
        assert_eq!(parse_genres("Crime, Drama"), vec!["Crime", "Drama"]);
        assert!(parse_genres("").is_empty());
    }

    #[test]
    fn test_parse_movies() {
        let movies = parse_movies(CATALOGUE.as_bytes(), "imdb.csv").unwrap();
        assert_eq!(movies.len(), 2);

        let shawshank = &movies[0];
        assert_eq!(shawshank.id, 1);
        assert_eq!(shawshank.original_title, "The Shawshank Redemption");
        assert_eq!(shawshank.year, Some(1994));
        assert_eq!(shawshank.runtime_minutes, Some(142));
        assert_eq!(shawshank.meta_score, Some(80));
        assert_eq!(shawshank.gross, Some(28_341_469));
        assert_eq!(shawshank.stars.len(), 4);

        // "PG" in the year column and a blank gross both become None
        let apollo = &movies[1];
        assert_eq!(apollo.id, 2);
        assert_eq!(apollo.year, None);
        assert_eq!(apollo.gross, None);
        assert_eq!(apollo.genres, vec!["Adventure", "Drama", "History"]);
    }

    #[test]
    fn test_parse_movies_bad_runtime() {
        let csv = "Series_Title,Runtime\nBroken,long\n";
        let err = parse_movies(csv.as_bytes(), "bad.csv").unwrap_err();
        assert!(matches!(err, DataLoadError::ParseError { line: 2, .. }));
    }

    #[test]
    fn test_parse_ratings() {
        let csv = "user_id,mov_id,rat_score,rating_date\n1,10,4.5,2024-11-07\n2,10,3,\n";
        let ratings = parse_ratings(csv.as_bytes(), "ratings.csv").unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].rating, 4.5);
        assert_eq!(
            ratings[0].rating_date,
            NaiveDate::from_ymd_opt(2024, 11, 7)
        );
        assert_eq!(ratings[1].rating_date, None);
    }

    #[test]
    fn test_parse_ratings_bad_date() {
        let csv = "user_id,mov_id,rat_score,rating_date\n1,10,4.5,yesterday\n";
        assert!(parse_ratings(csv.as_bytes(), "ratings.csv").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = parse_ratings_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, DataLoadError::FileNotFound { .. }));
    }
}
