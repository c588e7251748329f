use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use data_loader::{etl, LoadSummary, MovieId, Store, UserId};
use engine::{
    Bypass, FingerprintPolicy, MovieRecommendation, RecommendationMode,
    RecommendationOrchestrator, RecommenderConfig, ReuseAlways,
};
use rand::seq::IndexedRandom;
use rand::Rng;
use sources::content::preference_vector;
use sources::user_context::build_feature_matrix;
use sources::RecommendError;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

/// ReelRecs - Movie Recommendation Engine
#[derive(Parser)]
#[command(name = "reel-recs")]
#[command(about = "Movie recommendations from a SQLite ratings database", long_about = None)]
struct Cli {
    /// Path to the SQLite database (created if missing)
    #[arg(long, global = true, default_value = "movies.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a movie catalogue and/or ratings into the database
    Load {
        /// IMDb top-1000 style catalogue CSV
        #[arg(long)]
        movies: Option<PathBuf>,

        /// Ratings CSV (user_id, mov_id, rat_score, rating_date)
        #[arg(long)]
        ratings: Option<PathBuf>,

        /// Give this user a random 0.5-5.0 rating for every movie in the catalogue
        #[arg(long)]
        synthetic_ratings_for: Option<UserId>,
    },

    /// Get movie recommendations for a user
    Recommend {
        /// User ID to get recommendations for
        user_id: UserId,

        /// Which recommender to run: user, item or content
        #[arg(long, default_value_t = RecommendationMode::User)]
        mode: RecommendationMode,

        /// How the content-mode cache is used
        #[arg(long, value_enum, default_value_t = CacheMode::Verify)]
        cache: CacheMode,

        /// Number of recommendations to return
        #[arg(long, default_value = "5")]
        limit: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Show why each movie was recommended
        #[arg(long)]
        explain: bool,
    },

    /// Show a user's ratings and genre preferences
    User {
        /// User ID to display
        user_id: UserId,
    },

    /// Search for movies by title
    Search {
        /// Title to search for (case-insensitive substring match)
        title: String,

        /// Maximum number of results
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Time recommendations for randomly drawn users
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Which recommender to run: user, item or content
        #[arg(long, default_value_t = RecommendationMode::User)]
        mode: RecommendationMode,

        /// How the content-mode cache is used
        #[arg(long, value_enum, default_value_t = CacheMode::Bypass)]
        cache: CacheMode,
    },

    /// Remove cached recommendations
    ClearCache {
        /// Only clear this user's entries
        #[arg(long)]
        user_id: Option<UserId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CacheMode {
    /// Serve cached rows even if the user's ratings changed
    Reuse,
    /// Serve cached rows only if the user's ratings are unchanged
    Verify,
    /// Ignore the cache entirely
    Bypass,
}

fn build_config(limit: usize, cache: CacheMode) -> RecommenderConfig {
    let config = RecommenderConfig::default().with_cutoff(limit);
    match cache {
        CacheMode::Reuse => config.with_cache_policy(ReuseAlways),
        CacheMode::Verify => config.with_cache_policy(FingerprintPolicy),
        CacheMode::Bypass => config.with_cache_policy(Bypass),
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let store = Store::open(&cli.db)
        .with_context(|| format!("Failed to open database {}", cli.db.display()))?;
    info!("Opened database {}", cli.db.display());

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Load {
            movies,
            ratings,
            synthetic_ratings_for,
        } => handle_load(store, movies, ratings, synthetic_ratings_for)?,
        Commands::Recommend {
            user_id,
            mode,
            cache,
            limit,
            json,
            explain,
        } => handle_recommend(store, user_id, mode, cache, limit, json, explain)?,
        Commands::User { user_id } => handle_user(&store, user_id)?,
        Commands::Search { title, limit } => handle_search(&store, &title, limit)?,
        Commands::Benchmark {
            requests,
            mode,
            cache,
        } => handle_benchmark(store, requests, mode, cache)?,
        Commands::ClearCache { user_id } => handle_clear_cache(&store, user_id)?,
    }

    Ok(())
}

/// Handle the 'load' command
fn handle_load(
    mut store: Store,
    movies: Option<PathBuf>,
    ratings: Option<PathBuf>,
    synthetic_ratings_for: Option<UserId>,
) -> Result<()> {
    if movies.is_none() && ratings.is_none() && synthetic_ratings_for.is_none() {
        bail!("Nothing to load: pass --movies, --ratings or --synthetic-ratings-for");
    }

    let start = Instant::now();
    let mut total = LoadSummary::default();

    if let Some(path) = movies {
        let summary = etl::load_movies_csv(&mut store, &path)
            .with_context(|| format!("Failed to load movies from {}", path.display()))?;
        add_summary(&mut total, summary);
    }

    if let Some(path) = ratings {
        let summary = etl::load_ratings_csv(&mut store, &path)
            .with_context(|| format!("Failed to load ratings from {}", path.display()))?;
        add_summary(&mut total, summary);
    }

    if let Some(user_id) = synthetic_ratings_for {
        let movie_ids = store.movie_ids()?;
        if movie_ids.is_empty() {
            bail!("The catalogue is empty; load movies before synthesizing ratings");
        }
        let mut rng = rand::rng();
        let today = chrono::Local::now().date_naive();
        let generated =
            etl::synthesize_ratings(&movie_ids, user_id, today, || rng.random_range(0.5f32..=5.0));
        let summary = etl::load_ratings(&mut store, &generated)?;
        add_summary(&mut total, summary);
    }

    println!(
        "{} Loaded {} movies, {} genres, {} stars, {} ratings in {:?}",
        "✓".green(),
        total.movies,
        total.genres,
        total.stars,
        total.ratings,
        start.elapsed()
    );
    Ok(())
}

fn add_summary(total: &mut LoadSummary, summary: LoadSummary) {
    total.movies += summary.movies;
    total.genres += summary.genres;
    total.stars += summary.stars;
    total.ratings += summary.ratings;
}

/// Handle the 'recommend' command
fn handle_recommend(
    store: Store,
    user_id: UserId,
    mode: RecommendationMode,
    cache: CacheMode,
    limit: usize,
    json: bool,
    explain: bool,
) -> Result<()> {
    let mut orchestrator = RecommendationOrchestrator::new(store, build_config(limit, cache))?;

    let start = Instant::now();
    let recommendations = match orchestrator.get_recommendations(user_id, mode) {
        Ok(recommendations) => recommendations,
        Err(err) => {
            if let Some(RecommendError::UserNotFound(_)) = err.downcast_ref::<RecommendError>() {
                eprintln!("{} User {} not found", "✗".red(), user_id);
                std::process::exit(1);
            }
            return Err(err);
        }
    };
    let elapsed = start.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(&recommendations)?);
        return Ok(());
    }

    if recommendations.is_empty() {
        println!("No recommendations available for user {}", user_id);
    } else {
        print_recommendations(user_id, mode, &recommendations, explain);
    }
    println!("{}", format!("Computed in {:.2?}", elapsed).dimmed());
    Ok(())
}

/// Handle the 'user' command
fn handle_user(store: &Store, user_id: UserId) -> Result<()> {
    let ratings = store.user_ratings(user_id)?;
    if ratings.is_empty() {
        return Err(RecommendError::UserNotFound(user_id).into());
    }

    println!("{}", format!("User ID: {}", user_id).bold().blue());

    let total: f64 = ratings.iter().map(|r| f64::from(r.rating)).sum();
    println!("{}Number of ratings: {}", "• ".cyan(), ratings.len());
    println!(
        "{}Average rating: {:.2}",
        "• ".cyan(),
        total / ratings.len() as f64
    );

    let mut top_rated = ratings.clone();
    top_rated.sort_by(|a, b| {
        b.rating
            .total_cmp(&a.rating)
            .then(a.movie_id.cmp(&b.movie_id))
    });
    top_rated.truncate(5);
    let ids: Vec<MovieId> = top_rated.iter().map(|r| r.movie_id).collect();
    let movies = store.movies_by_ids(&ids)?;

    println!("Top rated movies:");
    for rating in &top_rated {
        let title = movies
            .get(&rating.movie_id)
            .map(|m| m.title.as_str())
            .unwrap_or("(unknown)");
        println!("  - {} (Rating: {:.1})", title, rating.rating);
    }

    // Genre preferences as the content recommender sees them
    let features = build_feature_matrix(store)?;
    let pairs: Vec<(MovieId, f64)> = ratings
        .iter()
        .map(|r| (r.movie_id, f64::from(r.rating)))
        .collect();
    let preference = preference_vector(&pairs, &features, (0.0, 5.0));
    let names = store.genres()?;

    let mut weighted: Vec<(&str, f64)> = names
        .iter()
        .map(|g| g.name.as_str())
        .zip(preference.as_slice().iter().copied())
        .filter(|&(_, weight)| weight > 0.0)
        .collect();
    weighted.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    println!("Genre preferences:");
    if weighted.is_empty() {
        println!("  (none)");
    }
    for (genre, weight) in weighted {
        println!("  - {}: {:.3}", genre, weight);
    }
    Ok(())
}

/// Handle the 'search' command
fn handle_search(store: &Store, title: &str, limit: usize) -> Result<()> {
    let matches = store.search_titles(title, limit)?;

    println!("{}", format!("Search results for '{}':", title).bold().blue());
    if matches.is_empty() {
        println!("  No movies found");
    }
    for movie in matches {
        println!(
            "{}: {} ({}) [{}]",
            movie.id,
            movie.title,
            movie
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "????".to_string()),
            movie.genres.join(", ")
        );
    }
    Ok(())
}

/// Handle the 'benchmark' command
fn handle_benchmark(store: Store, requests: usize, mode: RecommendationMode, cache: CacheMode) -> Result<()> {
    if requests == 0 {
        bail!("--requests must be at least 1");
    }
    let user_ids = store.user_ids()?;
    if user_ids.is_empty() {
        bail!("No users with ratings in the database");
    }

    let mut orchestrator = RecommendationOrchestrator::new(store, build_config(5, cache))?;
    let mut rng = rand::rng();

    let mut timings: Vec<Duration> = Vec::with_capacity(requests);
    let mut empty = 0usize;
    for _ in 0..requests {
        let Some(&user_id) = user_ids.choose(&mut rng) else {
            break;
        };
        let start = Instant::now();
        let recommendations = orchestrator.get_recommendations(user_id, mode)?;
        timings.push(start.elapsed());
        if recommendations.is_empty() {
            empty += 1;
        }
    }

    let total_time: Duration = timings.iter().sum();
    let avg_latency = total_time / (timings.len() as u32);
    timings.sort();
    let p50 = timings[timings.len() / 2];
    let p95 = timings[(timings.len() as f32 * 0.95) as usize];
    let p99 = timings[(timings.len() as f32 * 0.99) as usize];
    let throughput = timings.len() as f32 / total_time.as_secs_f32();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {} ({} mode, {} empty)", timings.len(), mode, empty);
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", p50);
    println!("P95 latency: {:?}", p95);
    println!("P99 latency: {:?}", p99);
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

/// Handle the 'clear-cache' command
fn handle_clear_cache(store: &Store, user_id: Option<UserId>) -> Result<()> {
    let removed = store.clear_cache(user_id)?;
    match user_id {
        Some(user_id) => println!(
            "{} Removed {} cached recommendations for user {}",
            "✓".green(),
            removed,
            user_id
        ),
        None => println!("{} Removed {} cached recommendations", "✓".green(), removed),
    }
    Ok(())
}

/// Helper function to format and print recommendations
fn print_recommendations(
    user_id: UserId,
    mode: RecommendationMode,
    recommendations: &[MovieRecommendation],
    explain: bool,
) {
    println!(
        "{}",
        format!(
            "Recommendations for user {} ({} mode):",
            user_id,
            mode
        )
        .bold()
        .blue()
    );
    for (i, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} ({}) [{}] - Score: {:.4}",
            (i + 1).to_string().green(),
            rec.title,
            rec.year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "????".to_string()),
            rec.genres.join(", "),
            rec.score
        );
        if explain {
            println!("   {} ({:?})", rec.explanation.dimmed(), rec.source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flag_parses_case_insensitively() {
        let cli = Cli::try_parse_from(["reel-recs", "recommend", "7", "--mode", "Content"]).unwrap();
        match cli.command {
            Commands::Recommend { user_id, mode, .. } => {
                assert_eq!(user_id, 7);
                assert_eq!(mode, RecommendationMode::Content);
            }
            _ => panic!("expected the recommend command"),
        }

        let cli = Cli::try_parse_from(["reel-recs", "benchmark"]).unwrap();
        match cli.command {
            Commands::Benchmark { mode, .. } => assert_eq!(mode, RecommendationMode::User),
            _ => panic!("expected the benchmark command"),
        }

        assert!(Cli::try_parse_from(["reel-recs", "recommend", "7", "--mode", "hybrid"]).is_err());
    }
}
