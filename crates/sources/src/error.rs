//! Errors raised by the scoring sources.

use data_loader::{MovieId, UserId};
use thiserror::Error;

/// A query referred to something the matrix doesn't contain
///
/// This is deliberately separate from an empty candidate list: "user 42 does
/// not exist" and "user 42 has already seen everything" are different answers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendError {
    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Movie {0} not found")]
    ItemNotFound(MovieId),
}
