//! Persistence contracts for classification results.

pub mod coordinate_repo;

pub use coordinate_repo::{
    CoordinateRepository, RepoError, RepoResult, SqliteCoordinateRepository,
};
