//! pgbulk-postgres: bulk repository over PostgreSQL
//!
//! Binary COPY inserts, staged merge updates and full-table deletes, next to
//! ordinary typed CRUD, for entity types described by `pgbulk-core` schemas.
//!
//! ```ignore
//! let ctx = PgContext::new("postgres://localhost/app")?;
//! let repo = PgBulkRepository::<Customer>::new(&ctx)?;
//! repo.bulk_insert(&customers).await?;
//! ```

pub mod db;
pub mod error;
pub mod repository;

pub use db::{BulkClient, PgContext, TypedClient, UpdateReport};
pub use error::{DbError, DbResult};
pub use repository::{BulkRepository, PgBulkRepository};

pub use pgbulk_core::{DbConfig, Entity, EntitySchema, Value, WireType};
