use data_loader::{etl, Store};
use std::path::PathBuf;
use std::time::Instant;

fn main() -> data_loader::Result<()> {
    let csv_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/imdb_top_1000.csv"));

    println!("Loading {} into an in-memory store...\n", csv_path.display());

    let mut store = Store::open_in_memory()?;
    let start = Instant::now();
    let summary = etl::load_movies_csv(&mut store, &csv_path)?;
    let elapsed = start.elapsed();

    println!("=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Movies: {}", summary.movies);
    println!("Genres: {}", summary.genres);
    println!("Stars: {}", summary.stars);
    println!(
        "\nPerformance: {:.0} movies/second",
        summary.movies as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}
