//! Bulk client: binary COPY insert, staged merge update, full-table delete
//!
//! - bulk_insert: one COPY stream straight into the target table
//! - bulk_update: one transaction that creates a staging table, COPYs into
//!   it, merges into the target with a single UPDATE and drops it
//! - bulk_delete: `DELETE FROM` the target, no predicate
//!
//! Every call acquires its own connection. Nothing is retried.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use pgbulk_core::{sql, Column, CopyEncoder, EncodeError, Entity, EntitySchema, StagingTable};
use sqlx::postgres::PgConnection;

use super::pool::PgContext;
use crate::error::{DbError, DbResult};

/// Outcome of a bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateReport {
    /// Rows streamed into the staging table (one per entity).
    pub staged: u64,
    /// Target rows the merge actually changed. Lower than `staged` when some
    /// keys have no matching row in the target.
    pub matched: u64,
    /// Name of the staging table used; gone once the call returns.
    pub staging_table: Option<String>,
}

/// Bulk operations for one entity type.
pub struct BulkClient<E> {
    ctx: PgContext,
    schema: Arc<EntitySchema>,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for BulkClient<E> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            schema: Arc::clone(&self.schema),
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> BulkClient<E> {
    /// Resolve the entity schema once; it is reused for every call.
    pub fn new(ctx: &PgContext) -> DbResult<Self> {
        Ok(Self {
            ctx: ctx.clone(),
            schema: Arc::new(E::schema()?),
            _marker: PhantomData,
        })
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn table(&self) -> &str {
        self.schema.table()
    }

    /// Stream `entities` into the target table with one binary COPY.
    ///
    /// Returns the number of rows written. If any row fails to encode or the
    /// stream fails, the COPY is aborted and no rows are visible.
    pub async fn bulk_insert<'a, I>(&self, entities: I) -> DbResult<u64>
    where
        I: IntoIterator<Item = &'a E>,
        I::IntoIter: Send,
    {
        let columns = self.schema.insert_columns()?;
        let mut entities = entities.into_iter().peekable();
        if entities.peek().is_none() {
            tracing::debug!(table = self.table(), "bulk insert: nothing to write");
            return Ok(0);
        }

        let started = Instant::now();
        let mut conn = self.ctx.acquire().await?;
        let rows = copy_entities(
            &mut conn,
            self.table(),
            columns,
            self.ctx.config().copy_chunk_bytes,
            entities,
            |encoder, entity: &E| encoder.encode_row(&entity.values()),
        )
        .await?;

        tracing::info!(
            table = self.table(),
            rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "bulk insert complete"
        );
        Ok(rows)
    }

    /// Update existing rows from `entities`, matched on the key column.
    ///
    /// The entity must have a key and at least one other column; that is
    /// checked before any connection is acquired. All steps run in one
    /// transaction, so a failure leaves neither a staging table nor a
    /// partial update behind.
    pub async fn bulk_update<'a, I>(&self, entities: I) -> DbResult<UpdateReport>
    where
        I: IntoIterator<Item = &'a E>,
        I::IntoIter: Send,
    {
        let layout = self.schema.update_layout()?;
        let mut entities = entities.into_iter().peekable();
        if entities.peek().is_none() {
            tracing::debug!(table = self.table(), "bulk update: nothing to merge");
            return Ok(UpdateReport::default());
        }

        let started = Instant::now();
        let staging = StagingTable::generate();
        let mut tx = self
            .ctx
            .pool()
            .begin()
            .await
            .map_err(DbError::ConnectionFailure)?;

        let staged = async {
            execute(
                &mut tx,
                &sql::create_staging(&staging, self.table(), &layout),
            )
            .await?;

            let staged = copy_entities(
                &mut tx,
                staging.name(),
                layout.columns(),
                self.ctx.config().copy_chunk_bytes,
                entities,
                |encoder, entity: &E| encoder.encode_projected(&entity.values(), layout.projection()),
            )
            .await?;

            let matched = execute(
                &mut tx,
                &sql::merge_from_staging(self.table(), &staging, &layout),
            )
            .await?;

            execute(&mut tx, &sql::drop_staging(&staging)).await?;
            Ok::<_, DbError>((staged, matched))
        }
        .await;

        let (staged, matched) = match staged {
            Ok(counts) => counts,
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(
                        table = self.table(),
                        staging = %staging,
                        error = %rollback,
                        "rollback after failed bulk update also failed"
                    );
                }
                return Err(err);
            }
        };

        tx.commit().await.map_err(|e| DbError::from_sqlx(e, "COMMIT"))?;

        tracing::info!(
            table = self.table(),
            staging = %staging,
            staged,
            matched,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "bulk update complete"
        );
        Ok(UpdateReport {
            staged,
            matched,
            staging_table: Some(staging.name().to_owned()),
        })
    }

    /// Delete every row in the target table. Irreversible.
    pub async fn bulk_delete(&self) -> DbResult<u64> {
        let statement = sql::delete_all(self.table());
        tracing::debug!(%statement, "bulk delete");

        let result = sqlx::query(&statement)
            .execute(self.ctx.pool())
            .await
            .map_err(|e| DbError::from_sqlx(e, &statement))?;

        tracing::info!(table = self.table(), rows = result.rows_affected(), "bulk delete complete");
        Ok(result.rows_affected())
    }
}

async fn execute(conn: &mut PgConnection, statement: &str) -> DbResult<u64> {
    tracing::debug!(%statement, "executing");
    let result = sqlx::query(statement)
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(e, statement))?;
    Ok(result.rows_affected())
}

/// Run one binary COPY of `entities` into `table`, aborting on the first
/// row that cannot be encoded or the first transport failure.
async fn copy_entities<'a, E, I, F>(
    conn: &mut PgConnection,
    table: &str,
    columns: &[Column],
    chunk_bytes: usize,
    entities: I,
    encode: F,
) -> DbResult<u64>
where
    E: Entity,
    I: Iterator<Item = &'a E>,
    F: Fn(&mut CopyEncoder, &E) -> Result<(), EncodeError>,
{
    let statement = sql::copy_in(table, columns);
    tracing::debug!(%statement, "opening COPY");

    let mut copy = conn
        .copy_in_raw(&statement)
        .await
        .map_err(|e| DbError::from_sqlx(e, &statement))?;
    let mut encoder = CopyEncoder::new(columns).with_chunk_bytes(chunk_bytes);

    for entity in entities {
        if let Err(err) = encode(&mut encoder, entity) {
            let reason = format!("row {}: {}", encoder.rows() + 1, err);
            tracing::warn!(table, %reason, "aborting COPY");
            if let Err(abort) = copy.abort(reason.clone()).await {
                tracing::debug!(table, error = %abort, "COPY abort reported");
            }
            return Err(DbError::copy_aborted(table, reason, None));
        }

        if let Some(chunk) = encoder.take_chunk() {
            let sent = copy.send(chunk).await.map(|_| ());
            if let Err(err) = sent {
                tracing::warn!(table, error = %err, "COPY send failed, aborting");
                if let Err(abort) = copy.abort(err.to_string()).await {
                    tracing::debug!(table, error = %abort, "COPY abort reported");
                }
                return Err(DbError::copy_aborted(table, "send failed", Some(err)));
            }
        }
    }

    let encoded = encoder.rows();
    let tail = encoder.finish();
    let sent = copy.send(tail).await.map(|_| ());
    if let Err(err) = sent {
        if let Err(abort) = copy.abort(err.to_string()).await {
            tracing::debug!(table, error = %abort, "COPY abort reported");
        }
        return Err(DbError::copy_aborted(table, "send failed", Some(err)));
    }

    let rows = copy
        .finish()
        .await
        .map_err(|e| DbError::copy_aborted(table, "server rejected the stream", Some(e)))?;

    tracing::debug!(table, encoded, rows, "COPY finished");
    Ok(rows)
}
