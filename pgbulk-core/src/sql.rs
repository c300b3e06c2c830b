//! SQL statement builders
//!
//! Pure string construction; nothing here touches a connection. Identifiers
//! are emitted unquoted, so PostgreSQL folds them to lower case.

use std::fmt;

use uuid::Uuid;

use crate::error::Result;
use crate::schema::{Column, EntitySchema, UpdateLayout};

/// Name of a per-call staging table, unique across concurrent callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StagingTable(String);

impl StagingTable {
    pub const PREFIX: &'static str = "temp_";

    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, Uuid::new_v4().simple()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StagingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn placeholders(range: std::ops::Range<usize>) -> String {
    range
        .map(|i| format!("${}", i + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `COPY t (a, b) FROM STDIN (FORMAT BINARY)`
pub fn copy_in(table: &str, columns: &[Column]) -> String {
    format!(
        "COPY {} ({}) FROM STDIN (FORMAT BINARY)",
        table,
        EntitySchema::column_list(columns)
    )
}

/// Empty table with the key and data columns of `target`, dropped at the
/// end of the transaction.
///
/// Built with `CREATE TABLE AS ... WITH NO DATA`, so it carries the column
/// types and no constraints. Unmapped NOT NULL columns on the target never
/// reach staging.
pub fn create_staging(staging: &StagingTable, target: &str, layout: &UpdateLayout) -> String {
    format!(
        "CREATE TEMP TABLE {} ON COMMIT DROP AS SELECT {} FROM {} WITH NO DATA",
        staging,
        EntitySchema::column_list(layout.columns()),
        target
    )
}

/// Set-based merge of every data column from staging into target, joined on the key.
pub fn merge_from_staging(target: &str, staging: &StagingTable, layout: &UpdateLayout) -> String {
    let set = layout
        .data_columns()
        .iter()
        .map(|c| format!("{col} = {staging}.{col}", col = c.name, staging = staging))
        .collect::<Vec<_>>()
        .join(", ");
    let key = &layout.key().name;

    format!(
        "UPDATE {target} SET {set} FROM {staging} WHERE {target}.{key} = {staging}.{key}",
        target = target,
        set = set,
        staging = staging,
        key = key
    )
}

pub fn drop_staging(staging: &StagingTable) -> String {
    format!("DROP TABLE IF EXISTS {}", staging)
}

/// Unconditional delete of every row.
pub fn delete_all(table: &str) -> String {
    format!("DELETE FROM {}", table)
}

/// `INSERT ... RETURNING` binding every column in declaration order.
pub fn insert_returning(schema: &EntitySchema) -> String {
    let columns = EntitySchema::column_list(schema.columns());
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        schema.table(),
        columns,
        placeholders(0..schema.columns().len()),
        columns
    )
}

/// `UPDATE ... RETURNING` binding the key as `$1`, then data columns in order.
pub fn update_returning(schema: &EntitySchema, layout: &UpdateLayout) -> String {
    let set = layout
        .data_columns()
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}", c.name, i + 2))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "UPDATE {} SET {} WHERE {} = $1 RETURNING {}",
        schema.table(),
        set,
        layout.key().name,
        EntitySchema::column_list(schema.columns())
    )
}

pub fn delete_by_key(schema: &EntitySchema) -> Result<String> {
    let key = key_column(schema)?;
    Ok(format!("DELETE FROM {} WHERE {} = $1", schema.table(), key.name))
}

/// Every row, ordered by key when the entity has one.
pub fn select_all(schema: &EntitySchema) -> String {
    let mut sql = format!(
        "SELECT {} FROM {}",
        EntitySchema::column_list(schema.columns()),
        schema.table()
    );
    if let Some(key) = schema.key() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&key.name);
    }
    sql
}

pub fn select_by_key(schema: &EntitySchema) -> Result<String> {
    let key = key_column(schema)?;
    Ok(format!(
        "SELECT {} FROM {} WHERE {} = $1",
        EntitySchema::column_list(schema.columns()),
        schema.table(),
        key.name
    ))
}

fn key_column(schema: &EntitySchema) -> Result<&Column> {
    schema.key().ok_or_else(|| {
        crate::Error::invalid_entity(schema.entity(), "the entity has no key column")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn person() -> EntitySchema {
        EntitySchema::builder("Person")
            .key::<i32>("Id")
            .field::<String>("Name")
            .field::<Option<i32>>("Age")
            .build()
            .unwrap()
    }

    #[test]
    fn copy_statement_names_every_column() {
        let schema = person();
        assert_eq!(
            copy_in(schema.table(), schema.columns()),
            "COPY Person (id, name, age) FROM STDIN (FORMAT BINARY)"
        );
    }

    #[test]
    fn merge_sets_every_data_column() {
        let schema = person();
        let layout = schema.update_layout().unwrap();
        let staging = StagingTable("temp_x".into());

        assert_eq!(
            merge_from_staging(schema.table(), &staging, &layout),
            "UPDATE Person SET name = temp_x.name, age = temp_x.age FROM temp_x \
             WHERE Person.id = temp_x.id"
        );
    }

    #[test]
    fn merge_with_single_data_column() {
        let schema = EntitySchema::builder("Flag")
            .key::<i32>("id")
            .field::<bool>("enabled")
            .build()
            .unwrap();
        let layout = schema.update_layout().unwrap();
        let staging = StagingTable("temp_y".into());

        let sql = merge_from_staging("flag", &staging, &layout);
        assert_eq!(
            sql,
            "UPDATE flag SET enabled = temp_y.enabled FROM temp_y WHERE flag.id = temp_y.id"
        );
        assert_eq!(sql.matches(" = temp_y.").count(), 2);
    }

    #[test]
    fn staging_ddl() {
        let schema = person();
        let layout = schema.update_layout().unwrap();
        let staging = StagingTable("temp_z".into());
        assert_eq!(
            create_staging(&staging, "person", &layout),
            "CREATE TEMP TABLE temp_z ON COMMIT DROP AS SELECT id, name, age FROM person \
             WITH NO DATA"
        );
        assert_eq!(drop_staging(&staging), "DROP TABLE IF EXISTS temp_z");
    }

    #[test]
    fn staging_names_are_unique() {
        let names: HashSet<_> = (0..1000).map(|_| StagingTable::generate()).collect();
        assert_eq!(names.len(), 1000);

        let name = StagingTable::generate();
        assert!(name.name().starts_with(StagingTable::PREFIX));
        assert_eq!(name.name().len(), StagingTable::PREFIX.len() + 32);
        assert!(name.name().chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn crud_statements() {
        let schema = person();
        let layout = schema.update_layout().unwrap();

        assert_eq!(
            insert_returning(&schema),
            "INSERT INTO Person (id, name, age) VALUES ($1, $2, $3) RETURNING id, name, age"
        );
        assert_eq!(
            update_returning(&schema, &layout),
            "UPDATE Person SET name = $2, age = $3 WHERE id = $1 RETURNING id, name, age"
        );
        assert_eq!(
            delete_by_key(&schema).unwrap(),
            "DELETE FROM Person WHERE id = $1"
        );
        assert_eq!(
            select_all(&schema),
            "SELECT id, name, age FROM Person ORDER BY id"
        );
        assert_eq!(
            select_by_key(&schema).unwrap(),
            "SELECT id, name, age FROM Person WHERE id = $1"
        );
        assert_eq!(delete_all("Person"), "DELETE FROM Person");
    }

    #[test]
    fn keyless_entities_cannot_address_rows() {
        let schema = EntitySchema::builder("Event")
            .field::<String>("kind")
            .build()
            .unwrap();
        assert!(delete_by_key(&schema).is_err());
        assert!(select_by_key(&schema).is_err());
        assert_eq!(select_all(&schema), "SELECT kind FROM Event");
    }
}
