//! Loading unit-cost price lists from CSV.

mod loader;

pub use loader::{CostRecord, CostTableLoader, CostTableLoaderError};
