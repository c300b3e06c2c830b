//! Entity schema descriptors (the column mapper)
//!
//! An [`EntitySchema`] is the static, ordered list of columns an entity maps
//! onto, built once when a client is constructed:
//!
//! ```ignore
//! let schema = EntitySchema::builder("Customer")
//!     .table("customers")
//!     .key::<i32>("Id")
//!     .field::<String>("Name")
//!     .field::<Option<f64>>("Balance")
//!     .build()?;
//! ```
//!
//! Column names are lower-cased so they line up with unquoted PostgreSQL
//! identifiers. Table names are used as given and are neither validated nor
//! quoted; keeping them valid SQL identifiers is up to the caller.

use std::any::type_name;

use crate::error::{Error, Result};
use crate::registry::TypeRegistry;
use crate::wire::WireType;

/// Column name used as the key when none is declared explicitly.
pub const CONVENTIONAL_KEY: &str = "id";

/// One mapped column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub wire_type: WireType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            name: name.into().to_lowercase(),
            wire_type,
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Ordered column mapping for an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    entity: String,
    table: String,
    key: Option<usize>,
    columns: Vec<Column>,
}

/// Column layout used by the staging-table merge: key first, then data
/// columns, with `projection[i]` naming the entity value that feeds column `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateLayout {
    columns: Vec<Column>,
    projection: Vec<usize>,
}

impl UpdateLayout {
    pub fn key(&self) -> &Column {
        &self.columns[0]
    }

    pub fn data_columns(&self) -> &[Column] {
        &self.columns[1..]
    }

    /// All columns in staging order (key first).
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn projection(&self) -> &[usize] {
        &self.projection
    }
}

impl EntitySchema {
    /// Start a schema for an entity with the given declared name, using the
    /// built-in type registry.
    pub fn builder(entity: impl Into<String>) -> SchemaBuilder<'static> {
        SchemaBuilder::new(entity.into(), TypeRegistry::global())
    }

    /// Declared entity name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Target table: the override if one was given, else the entity name.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn key(&self) -> Option<&Column> {
        self.key.map(|i| &self.columns[i])
    }

    pub fn key_index(&self) -> Option<usize> {
        self.key
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        let name = name.to_lowercase();
        self.columns.iter().find(|c| c.name == name)
    }

    /// Non-key columns in declaration order.
    pub fn data_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .enumerate()
            .filter(move |(i, _)| Some(*i) != self.key)
            .map(|(_, c)| c)
    }

    /// Columns written by a bulk insert: every column, in declaration order.
    pub fn insert_columns(&self) -> Result<&[Column]> {
        if self.columns.is_empty() {
            return Err(Error::invalid_entity(
                &self.entity,
                "the entity must map at least one column",
            ));
        }
        Ok(&self.columns)
    }

    /// Layout for a bulk update. Requires a key and at least one other column.
    pub fn update_layout(&self) -> Result<UpdateLayout> {
        let key = self.key.ok_or_else(|| {
            Error::invalid_entity(&self.entity, "the entity has no key column")
        })?;

        let mut projection = Vec::with_capacity(self.columns.len());
        projection.push(key);
        projection.extend((0..self.columns.len()).filter(|i| *i != key));

        if projection.len() < 2 {
            return Err(Error::invalid_entity(
                &self.entity,
                "the entity must map at least one column besides the key",
            ));
        }

        let columns = projection.iter().map(|&i| self.columns[i].clone()).collect();
        Ok(UpdateLayout {
            columns,
            projection,
        })
    }

    /// Comma-separated column list for SQL.
    pub fn column_list(columns: &[Column]) -> String {
        columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Builder for [`EntitySchema`]. The first error is kept and reported by
/// [`build`](Self::build).
#[derive(Debug)]
pub struct SchemaBuilder<'r> {
    entity: String,
    table: Option<String>,
    registry: &'r TypeRegistry,
    key: Option<usize>,
    columns: Vec<Column>,
    error: Option<Error>,
}

impl<'r> SchemaBuilder<'r> {
    fn new(entity: String, registry: &'r TypeRegistry) -> Self {
        Self {
            entity,
            table: None,
            registry,
            key: None,
            columns: Vec::new(),
            error: None,
        }
    }

    /// Resolve field types against a custom registry.
    pub fn registry<'n>(self, registry: &'n TypeRegistry) -> SchemaBuilder<'n> {
        SchemaBuilder {
            entity: self.entity,
            table: self.table,
            registry,
            key: self.key,
            columns: self.columns,
            error: self.error,
        }
    }

    /// Override the table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        let table = table.into();
        if !table.is_empty() {
            self.table = Some(table);
        }
        self
    }

    /// Declare the key column.
    pub fn key<T: 'static>(mut self, name: &str) -> Self {
        if self.key.is_some() {
            self.fail(Error::invalid_entity(
                &self.entity,
                format!("key declared twice (second key '{}')", name),
            ));
            return self;
        }
        if self.push::<T>(name) {
            self.key = Some(self.columns.len() - 1);
        }
        self
    }

    /// Declare a data column.
    pub fn field<T: 'static>(mut self, name: &str) -> Self {
        self.push::<T>(name);
        self
    }

    /// Declare a column with an explicit wire type, bypassing the registry.
    pub fn column(mut self, column: Column) -> Self {
        self.push_column(column);
        self
    }

    pub fn build(self) -> Result<EntitySchema> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.columns.is_empty() {
            return Err(Error::invalid_entity(
                &self.entity,
                "the entity must map at least one column",
            ));
        }

        let key = self
            .key
            .or_else(|| self.columns.iter().position(|c| c.name == CONVENTIONAL_KEY));

        Ok(EntitySchema {
            table: self.table.unwrap_or_else(|| self.entity.clone()),
            entity: self.entity,
            key,
            columns: self.columns,
        })
    }

    fn push<T: 'static>(&mut self, name: &str) -> bool {
        match self.registry.lookup::<T>() {
            Some(mapping) => {
                let mut column = Column::new(name, mapping.wire_type);
                column.nullable = mapping.nullable;
                self.push_column(column)
            }
            None => {
                self.fail(Error::unsupported_type(&self.entity, name, type_name::<T>()));
                false
            }
        }
    }

    fn push_column(&mut self, column: Column) -> bool {
        if column.name.is_empty() {
            self.fail(Error::invalid_entity(&self.entity, "empty column name"));
            return false;
        }
        if self.columns.iter().any(|c| c.name == column.name) {
            let reason = format!("column '{}' declared twice", column.name);
            self.fail(Error::invalid_entity(&self.entity, reason));
            return false;
        }
        self.columns.push(column);
        true
    }

    fn fail(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}
