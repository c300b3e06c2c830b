//! The `Entity` trait
//!
//! Implemented by application record types. The schema is declared once;
//! `values` must return one value per schema column, in declaration order.

use crate::error::{Error, Result};
use crate::schema::EntitySchema;
use crate::wire::Value;

/// A record type that maps onto one table.
///
/// # Example
///
/// ```ignore
/// struct Customer { id: i32, name: String }
///
/// impl Entity for Customer {
///     fn schema() -> Result<EntitySchema> {
///         EntitySchema::builder("Customer")
///             .key::<i32>("id")
///             .field::<String>("name")
///             .build()
///     }
///
///     fn values(&self) -> Vec<Value> {
///         vec![self.id.into(), self.name.as_str().into()]
///     }
/// }
/// ```
pub trait Entity: Send + Sync + Unpin + 'static {
    /// Column mapping for this entity type.
    fn schema() -> Result<EntitySchema>;

    /// Field values in schema column order.
    fn values(&self) -> Vec<Value>;
}

/// Key value of `entity` according to `schema`.
pub fn key_value<E: Entity>(schema: &EntitySchema, entity: &E) -> Result<Value> {
    let index = schema
        .key_index()
        .ok_or_else(|| Error::invalid_entity(schema.entity(), "the entity has no key column"))?;

    entity.values().into_iter().nth(index).ok_or_else(|| {
        Error::invalid_entity(
            schema.entity(),
            format!("values() returned no value for key column {}", index),
        )
    })
}
