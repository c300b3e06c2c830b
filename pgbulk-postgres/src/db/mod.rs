//! Database layer - connection context, bulk and typed clients
//!
//! # Design Principles
//!
//! - One connection per operation, taken from a lazily created pool
//! - Bulk writes go through binary COPY, never row-by-row INSERTs
//! - Multi-statement operations run inside one transaction
//! - Entity shape is validated before any connection is acquired

mod args;
pub mod bulk;
pub mod pool;
pub mod typed;

pub use bulk::{BulkClient, UpdateReport};
pub use pool::PgContext;
pub use typed::TypedClient;
