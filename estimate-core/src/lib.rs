pub mod calculations;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod schema;
pub mod session;
pub mod summary;

pub use db::repository::{EstimateRepository, RepositoryError};
pub use error::ValidationError;
pub use models::*;
