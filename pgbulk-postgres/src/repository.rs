//! Bulk repository
//!
//! [`BulkRepository`] is the storage-agnostic surface applications code
//! against. [`PgBulkRepository`] implements it for PostgreSQL by handing
//! row-at-a-time work to a [`TypedClient`] and set-based work to a
//! [`BulkClient`]; both share one [`PgContext`], so they use the same
//! connection configuration and the same table name.

use async_trait::async_trait;
use pgbulk_core::{Entity, Value};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};

use crate::db::{BulkClient, PgContext, TypedClient, UpdateReport};
use crate::error::DbResult;

/// Repository operations over one entity type.
#[async_trait]
pub trait BulkRepository<E: Send + Sync>: Send + Sync {
    /// Insert one entity, returning it as stored.
    async fn add(&self, entity: &E) -> DbResult<E>;

    /// Insert many entities in one stream. Returns rows written.
    async fn bulk_insert(&self, entities: &[E]) -> DbResult<u64>;

    /// Update many entities by key. Returns the number of entities staged,
    /// which can exceed the rows changed when some keys do not exist.
    async fn bulk_update(&self, entities: &[E]) -> DbResult<u64>;

    /// Delete every row. Returns rows removed.
    async fn bulk_delete(&self) -> DbResult<u64>;

    async fn delete(&self, entity: &E) -> DbResult<()>;

    async fn find(
        &self,
        predicate: &(dyn for<'e> Fn(&'e E) -> bool + Send + Sync),
    ) -> DbResult<Vec<E>>;

    async fn get(&self) -> DbResult<Vec<E>>;

    async fn get_by_id(&self, key: Value) -> DbResult<E>;

    async fn update(&self, entity: &E) -> DbResult<E>;
}

/// PostgreSQL implementation of [`BulkRepository`].
pub struct PgBulkRepository<E> {
    typed: TypedClient<E>,
    bulk: BulkClient<E>,
}

impl<E> Clone for PgBulkRepository<E> {
    fn clone(&self) -> Self {
        Self {
            typed: self.typed.clone(),
            bulk: self.bulk.clone(),
        }
    }
}

impl<E> PgBulkRepository<E>
where
    E: Entity + for<'r> FromRow<'r, PgRow>,
{
    pub fn new(ctx: &PgContext) -> DbResult<Self> {
        Ok(Self {
            typed: TypedClient::new(ctx)?,
            bulk: BulkClient::new(ctx)?,
        })
    }

    /// Database handle shared by both clients.
    pub fn pool(&self) -> &PgPool {
        self.typed.pool()
    }

    pub fn typed(&self) -> &TypedClient<E> {
        &self.typed
    }

    pub fn bulk(&self) -> &BulkClient<E> {
        &self.bulk
    }

    /// Bulk update with both the staged and the matched counts.
    pub async fn bulk_update_report(&self, entities: &[E]) -> DbResult<UpdateReport> {
        self.bulk.bulk_update(entities).await
    }
}

#[async_trait]
impl<E> BulkRepository<E> for PgBulkRepository<E>
where
    E: Entity + for<'r> FromRow<'r, PgRow>,
{
    async fn add(&self, entity: &E) -> DbResult<E> {
        self.typed.insert(entity).await
    }

    async fn bulk_insert(&self, entities: &[E]) -> DbResult<u64> {
        self.bulk.bulk_insert(entities).await
    }

    async fn bulk_update(&self, entities: &[E]) -> DbResult<u64> {
        let report = self.bulk.bulk_update(entities).await?;
        if report.matched < report.staged {
            tracing::debug!(
                table = self.bulk.table(),
                staged = report.staged,
                matched = report.matched,
                "some staged keys had no matching row"
            );
        }
        Ok(report.staged)
    }

    async fn bulk_delete(&self) -> DbResult<u64> {
        self.bulk.bulk_delete().await
    }

    async fn delete(&self, entity: &E) -> DbResult<()> {
        self.typed.delete(entity).await.map(|_| ())
    }

    async fn find(
        &self,
        predicate: &(dyn for<'e> Fn(&'e E) -> bool + Send + Sync),
    ) -> DbResult<Vec<E>> {
        self.typed.find(predicate).await
    }

    async fn get(&self) -> DbResult<Vec<E>> {
        self.typed.get_all().await
    }

    async fn get_by_id(&self, key: Value) -> DbResult<E> {
        self.typed.get_by_id(key).await
    }

    async fn update(&self, entity: &E) -> DbResult<E> {
        self.typed.update(entity).await
    }
}
