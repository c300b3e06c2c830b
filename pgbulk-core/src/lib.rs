//! pgbulk-core: database-free building blocks for bulk PostgreSQL loading
//!
//! - [`schema`]: static column mapping for entity types
//! - [`copy`]: binary COPY stream encoder
//! - [`sql`]: statement builders for staging, merge and CRUD
//!
//! The PostgreSQL side lives in `pgbulk-postgres`.

pub mod config;
pub mod copy;
pub mod entity;
pub mod error;
pub mod registry;
pub mod schema;
pub mod sql;
pub mod wire;

pub use config::DbConfig;
pub use copy::CopyEncoder;
pub use entity::{key_value, Entity};
pub use error::{EncodeError, Error, Result};
pub use registry::{TypeMapping, TypeRegistry};
pub use schema::{Column, EntitySchema, SchemaBuilder, UpdateLayout};
pub use sql::StagingTable;
pub use wire::{Value, WireType};
