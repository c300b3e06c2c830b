//! Shared fixtures for pgbulk-postgres integration tests

#![allow(dead_code)]

use std::sync::Once;

use pgbulk_postgres::{DbConfig, PgContext};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Console tracing for tests; honours RUST_LOG, defaults to warn.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .compact()
            .try_init();
    });
}

/// Context against DATABASE_URL.
pub fn live_context() -> PgContext {
    init_tracing();
    PgContext::from_env().expect("DATABASE_URL required")
}

/// Context whose pool points at a port nothing listens on. Any attempt to
/// reach the database fails quickly with a connection error.
pub fn unreachable_context() -> PgContext {
    init_tracing();
    let mut config = DbConfig::new("postgres://nobody@127.0.0.1:1/none");
    config.acquire_timeout_secs = 1;
    PgContext::from_config(config).expect("lazy pool")
}

/// Recreate `table` as `(id integer primary key, name text not null)`.
pub async fn reset_person_table(ctx: &PgContext, table: &str) {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
        .execute(ctx.pool())
        .await
        .expect("drop table");
    sqlx::query(&format!(
        "CREATE TABLE {} (id integer PRIMARY KEY, name text NOT NULL)",
        table
    ))
    .execute(ctx.pool())
    .await
    .expect("create table");
}

/// Declare an `{ id: i32, name: String }` entity mapped onto `$table`.
#[macro_export]
macro_rules! person_entity {
    ($name:ident, $table:literal) => {
        #[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
        pub struct $name {
            pub id: i32,
            pub name: String,
        }

        impl $name {
            pub fn new(id: i32, name: &str) -> Self {
                Self {
                    id,
                    name: name.to_string(),
                }
            }
        }

        impl pgbulk_core::Entity for $name {
            fn schema() -> pgbulk_core::Result<pgbulk_core::EntitySchema> {
                pgbulk_core::EntitySchema::builder(stringify!($name))
                    .table($table)
                    .key::<i32>("id")
                    .field::<String>("name")
                    .build()
            }

            fn values(&self) -> Vec<pgbulk_core::Value> {
                vec![self.id.into(), self.name.as_str().into()]
            }
        }
    };
}
