//! Benchmarks for candidate generation
//!
//! Run with: cargo bench --package sources
//!
//! Uses a synthetic catalogue sized like the IMDb top-1000 file with a few
//! hundred raters, so no database is needed.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use data_loader::{MovieId, Rating, UserId};
use sources::{
    CollaborativeSource, ContentSource, FeatureMatrix, InteractionMatrix, SimilarityMode,
    UserContext,
};

const USERS: UserId = 300;
const MOVIES: MovieId = 1000;
const GENRES: u32 = 20;

/// Deterministic sparse ratings: each user rates roughly one movie in seven
fn synthetic_ratings() -> Vec<Rating> {
    let mut ratings = Vec::new();
    for user_id in 1..=USERS {
        for movie_id in 1..=MOVIES {
            let h = user_id.wrapping_mul(2_654_435_761) ^ movie_id.wrapping_mul(40_503);
            if h % 7 == 0 {
                ratings.push(Rating {
                    user_id,
                    movie_id,
                    rating: 0.5 + (h % 10) as f32 * 0.5,
                    rating_date: None,
                });
            }
        }
    }
    ratings
}

fn synthetic_features() -> FeatureMatrix {
    let vocabulary: Vec<u32> = (1..=GENRES).collect();
    let memberships: Vec<(MovieId, u32)> = (1..=MOVIES)
        .flat_map(|movie_id| {
            [
                (movie_id, movie_id % GENRES + 1),
                (movie_id, (movie_id * 7) % GENRES + 1),
            ]
        })
        .collect();
    FeatureMatrix::new(&vocabulary, &memberships)
}

fn bench_build_matrix(c: &mut Criterion) {
    let ratings = synthetic_ratings();

    c.bench_function("build_interaction_matrix", |b| {
        b.iter(|| black_box(InteractionMatrix::from_ratings(black_box(&ratings))))
    });
}

fn bench_user_candidates(c: &mut Criterion) {
    let matrix = InteractionMatrix::from_ratings(&synthetic_ratings());
    let source = CollaborativeSource::new(SimilarityMode::User);

    c.bench_function("user_mode_get_candidates", |b| {
        b.iter(|| black_box(source.get_candidates(black_box(&matrix), black_box(1))))
    });
}

fn bench_item_candidates(c: &mut Criterion) {
    let matrix = InteractionMatrix::from_ratings(&synthetic_ratings());
    let source = CollaborativeSource::new(SimilarityMode::Item);

    c.bench_function("item_mode_get_candidates", |b| {
        b.iter(|| black_box(source.get_candidates(black_box(&matrix), black_box(1))))
    });
}

fn bench_content_candidates(c: &mut Criterion) {
    let ratings = synthetic_ratings();
    let context = UserContext::from_ratings(1, &ratings);
    let features = synthetic_features();
    let source = ContentSource::new();

    c.bench_function("content_get_candidates", |b| {
        b.iter(|| black_box(source.get_candidates(black_box(&context), black_box(&features))))
    });
}

criterion_group!(
    benches,
    bench_build_matrix,
    bench_user_candidates,
    bench_item_candidates,
    bench_content_candidates
);
criterion_main!(benches);
