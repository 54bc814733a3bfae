//! Storage adapters for the order aggregate.
//!
//! Both repositories implement [`domain::OrderRepository`] and guard every
//! update with a compare-and-swap on the order's version.

pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
mod restore;

pub use config::StoreConfig;
pub use domain::{OrderRepository, OrderRepositoryExt, RepositoryError};
pub use error::{Result, StoreError};
pub use memory::InMemoryOrderRepository;
pub use postgres::PostgresOrderRepository;
