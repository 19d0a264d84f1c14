//! roomalloc-query — read-only projections of allocation results.
//!
//! Every query reads straight from the store gateway. Queries may run while
//! a round is in progress and will then see whatever has been committed so
//! far.

pub mod error;
pub mod service;
pub mod views;

pub use error::{QueryError, QueryResult};
pub use service::QueryService;
pub use views::*;
