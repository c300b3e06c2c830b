//! Typed CRUD client
//!
//! Row-at-a-time insert, update, delete and lookups for one entity type.
//! Statements are built from the entity schema once, at construction.
//! `find` filters fetched rows with a Rust predicate; predicates are not
//! translated to SQL.

use std::marker::PhantomData;
use std::sync::Arc;

use pgbulk_core::{key_value, sql, Entity, EntitySchema, Value};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};

use super::args::bind_all;
use super::pool::PgContext;
use crate::error::{DbError, DbResult};

struct Statements {
    insert: String,
    select_all: String,
    // keyed statements need a key column
    select_by_key: Option<String>,
    delete_by_key: Option<String>,
    update: Option<String>,
}

impl Statements {
    fn build(schema: &EntitySchema) -> Self {
        Self {
            insert: sql::insert_returning(schema),
            select_all: sql::select_all(schema),
            select_by_key: sql::select_by_key(schema).ok(),
            delete_by_key: sql::delete_by_key(schema).ok(),
            update: schema
                .update_layout()
                .ok()
                .map(|layout| sql::update_returning(schema, &layout)),
        }
    }
}

/// CRUD client for one entity type.
pub struct TypedClient<E> {
    ctx: PgContext,
    schema: Arc<EntitySchema>,
    statements: Arc<Statements>,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for TypedClient<E> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            schema: Arc::clone(&self.schema),
            statements: Arc::clone(&self.statements),
            _marker: PhantomData,
        }
    }
}

impl<E> TypedClient<E>
where
    E: Entity + for<'r> FromRow<'r, PgRow>,
{
    pub fn new(ctx: &PgContext) -> DbResult<Self> {
        let schema = E::schema()?;
        let statements = Statements::build(&schema);
        Ok(Self {
            ctx: ctx.clone(),
            schema: Arc::new(schema),
            statements: Arc::new(statements),
            _marker: PhantomData,
        })
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// Underlying pool, for queries this client does not cover.
    pub fn pool(&self) -> &PgPool {
        self.ctx.pool()
    }

    /// Insert one row and return it as stored.
    pub async fn insert(&self, entity: &E) -> DbResult<E> {
        let statement = &self.statements.insert;
        let values = entity.values();
        let args = bind_all(self.schema.columns(), &values, statement)?;

        sqlx::query_as_with::<_, E, _>(statement, args)
            .fetch_one(self.pool())
            .await
            .map_err(|e| DbError::from_sqlx(e, statement))
    }

    /// Update the row with the entity's key and return it as stored.
    pub async fn update(&self, entity: &E) -> DbResult<E> {
        let layout = self.schema.update_layout()?;
        let statement = self.keyed(&self.statements.update)?;
        let values = entity.values();
        if values.len() != self.schema.columns().len() {
            return Err(pgbulk_core::EncodeError::ArityMismatch {
                expected: self.schema.columns().len(),
                found: values.len(),
            }
            .into());
        }

        let ordered = layout.projection().iter().map(|&i| &values[i]);
        let args = bind_all(layout.columns(), ordered, statement)?;

        sqlx::query_as_with::<_, E, _>(statement, args)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| DbError::from_sqlx(e, statement))?
            .ok_or_else(|| self.not_found(&values[layout.projection()[0]]))
    }

    /// Delete the row with the entity's key. Returns rows removed (0 or 1).
    pub async fn delete(&self, entity: &E) -> DbResult<u64> {
        let key = key_value(&self.schema, entity)?;
        self.delete_by_id(key).await
    }

    pub async fn delete_by_id(&self, key: impl Into<Value>) -> DbResult<u64> {
        let statement = self.keyed(&self.statements.delete_by_key)?;
        let key = key.into();
        let args = self.key_args(&key, statement)?;

        let result = sqlx::query_with(statement, args)
            .execute(self.pool())
            .await
            .map_err(|e| DbError::from_sqlx(e, statement))?;
        Ok(result.rows_affected())
    }

    /// Every row, ordered by key when there is one.
    pub async fn get_all(&self) -> DbResult<Vec<E>> {
        let statement = &self.statements.select_all;
        sqlx::query_as::<_, E>(statement)
            .fetch_all(self.pool())
            .await
            .map_err(|e| DbError::from_sqlx(e, statement))
    }

    pub async fn get_by_id(&self, key: impl Into<Value>) -> DbResult<E> {
        let statement = self.keyed(&self.statements.select_by_key)?;
        let key = key.into();
        let args = self.key_args(&key, statement)?;

        sqlx::query_as_with::<_, E, _>(statement, args)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| DbError::from_sqlx(e, statement))?
            .ok_or_else(|| self.not_found(&key))
    }

    /// Rows for which `predicate` holds, in `get_all` order.
    pub async fn find<P>(&self, predicate: P) -> DbResult<Vec<E>>
    where
        P: Fn(&E) -> bool + Send,
    {
        let mut rows = self.get_all().await?;
        rows.retain(|row| predicate(row));
        Ok(rows)
    }

    fn keyed<'s>(&self, statement: &'s Option<String>) -> DbResult<&'s str> {
        statement.as_deref().ok_or_else(|| {
            let reason = if self.schema.key().is_none() {
                "the entity has no key column"
            } else {
                "the entity must map at least one column besides the key"
            };
            pgbulk_core::Error::invalid_entity(self.schema.entity(), reason).into()
        })
    }

    fn key_args(&self, key: &Value, statement: &str) -> DbResult<sqlx::postgres::PgArguments> {
        let column = self.schema.key().ok_or_else(|| {
            pgbulk_core::Error::invalid_entity(self.schema.entity(), "the entity has no key column")
        })?;
        bind_all(std::slice::from_ref(column), [key], statement)
    }

    fn not_found(&self, key: &Value) -> DbError {
        DbError::NotFound {
            table: self.schema.table().to_owned(),
            key: key.to_string(),
        }
    }
}
