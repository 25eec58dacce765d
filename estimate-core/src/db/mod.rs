pub mod factory;
pub mod repository;

pub use factory::{DbConfig, RepositoryFactory, RepositoryRegistry};
pub use repository::{EstimateRepository, RepositoryError, load_cost_table_set};
