//! Binary COPY encoder
//!
//! Produces the byte stream PostgreSQL expects for
//! `COPY ... FROM STDIN (FORMAT BINARY)`:
//!
//! ```text
//! header   PGCOPY\n\377\r\n\0 | flags: i32 = 0 | extension length: i32 = 0
//! row      field count: i16 | per field: length: i32 (-1 = NULL) + bytes
//! trailer  -1: i16
//! ```
//!
//! All integers are big-endian. Bytes accumulate in an internal buffer that
//! callers drain with [`CopyEncoder::take_chunk`] while streaming, so memory
//! stays bounded by the chunk size rather than by the number of rows.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::EncodeError;
use crate::schema::Column;
use crate::wire::Value;

/// Binary COPY file signature.
pub const SIGNATURE: &[u8; 11] = b"PGCOPY\n\xff\r\n\0";

/// Size of the header: signature, flags and extension length.
pub const HEADER_LEN: usize = SIGNATURE.len() + 4 + 4;

/// Buffer size at which [`CopyEncoder::take_chunk`] hands bytes out.
pub const DEFAULT_CHUNK_BYTES: usize = 64 * 1024;

const TRAILER: i16 = -1;
const NULL_LENGTH: i32 = -1;

/// Streaming encoder for one COPY operation.
#[derive(Debug)]
pub struct CopyEncoder {
    columns: Vec<Column>,
    buf: Vec<u8>,
    rows: u64,
    chunk_bytes: usize,
}

impl CopyEncoder {
    /// Create an encoder for the given column layout and write the header.
    pub fn new(columns: &[Column]) -> Self {
        let mut buf = Vec::with_capacity(DEFAULT_CHUNK_BYTES);
        buf.extend_from_slice(SIGNATURE);
        buf.extend_from_slice(&0i32.to_be_bytes());
        buf.extend_from_slice(&0i32.to_be_bytes());

        Self {
            columns: columns.to_vec(),
            buf,
            rows: 0,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Rows encoded so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Encode one row whose values are in column order.
    pub fn encode_row(&mut self, values: &[Value]) -> Result<(), EncodeError> {
        if values.len() != self.columns.len() {
            return Err(EncodeError::ArityMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        self.encode_fields(values.iter())
    }

    /// Encode one row, taking column `i` from `values[projection[i]]`.
    pub fn encode_projected(
        &mut self,
        values: &[Value],
        projection: &[usize],
    ) -> Result<(), EncodeError> {
        if projection.len() != self.columns.len() || values.len() != projection.len() {
            return Err(EncodeError::ArityMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }

        let mut fields = Vec::with_capacity(projection.len());
        for &i in projection {
            let value = values.get(i).ok_or(EncodeError::ArityMismatch {
                expected: self.columns.len(),
                found: values.len(),
            })?;
            fields.push(value);
        }
        self.encode_fields(fields.into_iter())
    }

    /// Hand out the buffered bytes once they reach the chunk size.
    pub fn take_chunk(&mut self) -> Option<Vec<u8>> {
        if self.buf.len() < self.chunk_bytes {
            return None;
        }
        Some(std::mem::replace(
            &mut self.buf,
            Vec::with_capacity(self.chunk_bytes),
        ))
    }

    /// Append the trailer and return whatever is still buffered.
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.extend_from_slice(&TRAILER.to_be_bytes());
        self.buf
    }

    fn encode_fields<'a>(
        &mut self,
        fields: impl Iterator<Item = &'a Value>,
    ) -> Result<(), EncodeError> {
        let row_start = self.buf.len();
        // PostgreSQL caps tables at 1600 columns, well inside i16.
        self.buf
            .extend_from_slice(&(self.columns.len() as i16).to_be_bytes());

        for (column, value) in self.columns.iter().zip(fields) {
            if let Err(err) = encode_field(&mut self.buf, column, value) {
                self.buf.truncate(row_start);
                return Err(err);
            }
        }

        self.rows += 1;
        Ok(())
    }
}

fn encode_field(buf: &mut Vec<u8>, column: &Column, value: &Value) -> Result<(), EncodeError> {
    let found = match value.wire_type() {
        None if column.nullable => {
            buf.extend_from_slice(&NULL_LENGTH.to_be_bytes());
            return Ok(());
        }
        None => {
            return Err(EncodeError::NullViolation {
                column: column.name.clone(),
            })
        }
        Some(found) => found,
    };

    if found != column.wire_type {
        return Err(EncodeError::ValueMismatch {
            column: column.name.clone(),
            expected: column.wire_type,
            found,
        });
    }

    match value {
        Value::Text(s) => {
            let len = i32::try_from(s.len()).map_err(|_| EncodeError::FieldTooLarge {
                column: column.name.clone(),
            })?;
            buf.extend_from_slice(&len.to_be_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Integer(n) => put_field(buf, &n.to_be_bytes()),
        Value::BigInt(n) => put_field(buf, &n.to_be_bytes()),
        Value::Boolean(b) => put_field(buf, &[u8::from(*b)]),
        Value::Double(d) => put_field(buf, &d.to_be_bytes()),
        Value::Timestamp(ts) => {
            let micros =
                timestamp_micros(ts).ok_or_else(|| EncodeError::TimestampOutOfRange {
                    column: column.name.clone(),
                })?;
            put_field(buf, &micros.to_be_bytes());
        }
        Value::Null => buf.extend_from_slice(&NULL_LENGTH.to_be_bytes()),
    }
    Ok(())
}

fn put_field(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as i32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

/// Microseconds since the PostgreSQL epoch (2000-01-01 00:00:00).
pub fn timestamp_micros(ts: &NaiveDateTime) -> Option<i64> {
    let epoch = NaiveDate::from_ymd_opt(2000, 1, 1)?.and_hms_opt(0, 0, 0)?;
    ts.signed_duration_since(epoch).num_microseconds()
}
