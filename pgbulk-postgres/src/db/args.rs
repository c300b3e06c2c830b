//! Binding `Value`s as statement parameters

use pgbulk_core::{Column, EncodeError, Value, WireType};
use sqlx::postgres::PgArguments;
use sqlx::Arguments;

use crate::error::{DbError, DbResult};

/// Build parameters for `values`, checked against the columns they feed.
///
/// NULLs are bound with the column's type so the server never has to guess.
pub(crate) fn bind_all<'v>(
    columns: &[Column],
    values: impl IntoIterator<Item = &'v Value>,
    statement: &str,
) -> DbResult<PgArguments> {
    let values: Vec<&Value> = values.into_iter().collect();
    if values.len() != columns.len() {
        return Err(EncodeError::ArityMismatch {
            expected: columns.len(),
            found: values.len(),
        }
        .into());
    }

    let mut args = PgArguments::default();
    for (column, value) in columns.iter().zip(values) {
        check(column, value)?;
        add(&mut args, column.wire_type, value.clone())
            .map_err(|e| DbError::from_sqlx(sqlx::Error::Encode(e), statement))?;
    }
    Ok(args)
}

fn check(column: &Column, value: &Value) -> Result<(), EncodeError> {
    match value.wire_type() {
        None if !column.nullable => Err(EncodeError::NullViolation {
            column: column.name.clone(),
        }),
        Some(found) if found != column.wire_type => Err(EncodeError::ValueMismatch {
            column: column.name.clone(),
            expected: column.wire_type,
            found,
        }),
        _ => Ok(()),
    }
}

fn add(
    args: &mut PgArguments,
    wire_type: WireType,
    value: Value,
) -> Result<(), sqlx::error::BoxDynError> {
    match value {
        Value::Null => match wire_type {
            WireType::Text => args.add(None::<String>),
            WireType::Integer => args.add(None::<i32>),
            WireType::BigInt => args.add(None::<i64>),
            WireType::Boolean => args.add(None::<bool>),
            WireType::Timestamp => args.add(None::<sqlx::types::chrono::NaiveDateTime>),
            WireType::Double => args.add(None::<f64>),
        },
        Value::Text(s) => args.add(s),
        Value::Integer(n) => args.add(n),
        Value::BigInt(n) => args.add(n),
        Value::Boolean(b) => args.add(b),
        Value::Timestamp(ts) => args.add(ts),
        Value::Double(d) => args.add(d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", WireType::Integer),
            Column::new("nickname", WireType::Text).nullable(),
        ]
    }

    #[test]
    fn binds_matching_values() {
        let values = [Value::Integer(1), Value::Null];
        let args = bind_all(&columns(), &values, "INSERT").unwrap();
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn rejects_mismatched_values() {
        let values = [Value::Text("1".into()), Value::Null];
        let err = bind_all(&columns(), &values, "INSERT").unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(pgbulk_core::Error::Encode(EncodeError::ValueMismatch { .. }))
        ));
    }

    #[test]
    fn rejects_null_key() {
        let values = [Value::Null, Value::Null];
        let err = bind_all(&columns(), &values, "INSERT").unwrap_err();
        assert!(err.to_string().contains("not nullable"));
    }

    #[test]
    fn rejects_short_rows() {
        let values = [Value::Integer(1)];
        let err = bind_all(&columns(), &values, "INSERT").unwrap_err();
        assert!(err.to_string().contains("1 values but 2 columns"));
    }

    #[test]
    fn rejects_long_rows() {
        let values = [Value::Integer(1), Value::Null, Value::Text("extra".into())];
        let err = bind_all(&columns(), &values, "INSERT").unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(pgbulk_core::Error::Encode(EncodeError::ArityMismatch {
                expected: 2,
                found: 3
            }))
        ));
    }
}
