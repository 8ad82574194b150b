// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! The dynamic value tree used for generic encoding and decoding.

use crate::error::Details;
use crate::schema::{DecimalSchema, Names, RecordSchema, Schema};
use crate::AvroResult;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

/// An amount of time defined by months, days and milliseconds, the semantic
/// value of the `duration` logical type. On the wire it is a `fixed` of
/// twelve bytes: three unsigned little-endian 32-bit integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Duration {
    pub months: u32,
    pub days: u32,
    pub millis: u32,
}

impl Duration {
    pub fn new(months: u32, days: u32, millis: u32) -> Self {
        Duration {
            months,
            days,
            millis,
        }
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Duration {
            months: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            days: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            millis: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
        }
    }

    pub fn to_bytes(self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&self.months.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.days.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.millis.to_le_bytes());
        bytes
    }
}

/// A dynamically typed Avro value.
///
/// Generic decoding produces this tree: records as named field lists, maps
/// as string-keyed mappings, enums as their symbol, logical types as their
/// semantic value, and general (non-nullable) unions as a single-entry map
/// keyed by the selected member's discriminator.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    /// An exact-size byte value; the `usize` is the expected size.
    Fixed(usize, Vec<u8>),
    /// A symbol and its position in the enum.
    Enum(u32, String),
    Array(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Record fields in schema order.
    Record(Vec<(String, Value)>),
    /// Days since the Unix epoch.
    Date(i32),
    /// Milliseconds after midnight.
    TimeMillis(i32),
    /// Microseconds after midnight.
    TimeMicros(i64),
    /// Milliseconds since the Unix epoch, UTC.
    TimestampMillis(i64),
    /// Microseconds since the Unix epoch, UTC.
    TimestampMicros(i64),
    Decimal(BigDecimal),
    Uuid(Uuid),
    Duration(Duration),
}

impl Value {
    /// A short name of the runtime kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Fixed(_, _) => "fixed",
            Value::Enum(_, _) => "enum",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Date(_) => "date",
            Value::TimeMillis(_) => "time-millis",
            Value::TimeMicros(_) => "time-micros",
            Value::TimestampMillis(_) => "timestamp-millis",
            Value::TimestampMicros(_) => "timestamp-micros",
            Value::Decimal(_) => "decimal",
            Value::Uuid(_) => "uuid",
            Value::Duration(_) => "duration",
        }
    }

    /// Converts a validated field-default JSON literal into the `Value` the
    /// encoder substitutes for a missing host field.
    ///
    /// A union default describes the union's first member, so conversion
    /// targets that member.
    pub(crate) fn from_default(
        schema: &Schema,
        json: &JsonValue,
        names: &Names,
    ) -> AvroResult<Value> {
        let mismatch = || -> crate::error::Error {
            Details::EncodeValueMismatch {
                expected: "a default matching the field schema",
                got: json.to_string(),
            }
            .into()
        };
        Ok(match schema {
            Schema::Null => Value::Null,
            Schema::Boolean => Value::Boolean(json.as_bool().ok_or_else(mismatch)?),
            Schema::Int => Value::Int(integral(json).ok_or_else(mismatch)? as i32),
            Schema::Long => Value::Long(integral(json).ok_or_else(mismatch)?),
            Schema::Float => Value::Float(json.as_f64().ok_or_else(mismatch)? as f32),
            Schema::Double => Value::Double(json.as_f64().ok_or_else(mismatch)?),
            Schema::Bytes => Value::Bytes(json_string_bytes(json).ok_or_else(mismatch)?),
            Schema::String => Value::String(json.as_str().ok_or_else(mismatch)?.to_string()),
            Schema::Fixed(fixed) => {
                let bytes = json_string_bytes(json).ok_or_else(mismatch)?;
                Value::Fixed(fixed.size, bytes)
            }
            Schema::Enum(inner) => {
                let symbol = json.as_str().ok_or_else(mismatch)?;
                let index = inner
                    .symbols
                    .iter()
                    .position(|s| s == symbol)
                    .ok_or_else(|| {
                        crate::error::Error::new(Details::EnumSymbolUnknown(symbol.to_string()))
                    })?;
                Value::Enum(index as u32, symbol.to_string())
            }
            Schema::Array(inner) => Value::Array(
                json.as_array()
                    .ok_or_else(mismatch)?
                    .iter()
                    .map(|item| Value::from_default(&inner.items, item, names))
                    .collect::<AvroResult<_>>()?,
            ),
            Schema::Map(inner) => Value::Map(
                json.as_object()
                    .ok_or_else(mismatch)?
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), Value::from_default(&inner.values, v, names)?)))
                    .collect::<AvroResult<_>>()?,
            ),
            Schema::Record(record) => Value::Record(record_default(record, json, names)?),
            Schema::Union(union) => {
                let first = union.variants().first().ok_or_else(mismatch)?;
                Value::from_default(first, json, names)?
            }
            Schema::Ref { name } => {
                let target = names
                    .get(name)
                    .cloned()
                    .ok_or_else(|| crate::error::Error::new(Details::UnresolvedRef(name.clone())))?;
                Value::from_default(&target, json, names)?
            }
            Schema::Date => Value::Date(integral(json).ok_or_else(mismatch)? as i32),
            Schema::TimeMillis => Value::TimeMillis(integral(json).ok_or_else(mismatch)? as i32),
            Schema::TimeMicros => Value::TimeMicros(integral(json).ok_or_else(mismatch)?),
            Schema::TimestampMillis => {
                Value::TimestampMillis(integral(json).ok_or_else(mismatch)?)
            }
            Schema::TimestampMicros => {
                Value::TimestampMicros(integral(json).ok_or_else(mismatch)?)
            }
            Schema::Uuid => Value::Uuid(
                Uuid::parse_str(json.as_str().ok_or_else(mismatch)?).map_err(|_| mismatch())?,
            ),
            Schema::Decimal(DecimalSchema { scale, .. }) => {
                let bytes = json_string_bytes(json).ok_or_else(mismatch)?;
                Value::Decimal(BigDecimal::new(
                    BigInt::from_signed_bytes_be(&bytes),
                    *scale as i64,
                ))
            }
            Schema::Duration(_) => {
                let bytes = json_string_bytes(json).ok_or_else(mismatch)?;
                let bytes: [u8; 12] = bytes.try_into().map_err(|_| mismatch())?;
                Value::Duration(Duration::from_bytes(bytes))
            }
        })
    }
}

fn record_default(
    record: &RecordSchema,
    json: &JsonValue,
    names: &Names,
) -> AvroResult<Vec<(String, Value)>> {
    let entries = json.as_object().ok_or_else(|| {
        crate::error::Error::new(Details::EncodeValueMismatch {
            expected: "a JSON object",
            got: json.to_string(),
        })
    })?;
    let mut fields = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        let value = match entries.get(&field.name) {
            Some(entry) => Value::from_default(&field.schema, entry, names)?,
            None => {
                let default = field.default.as_ref().ok_or_else(|| {
                    crate::error::Error::new(Details::MissingFieldNoDefault {
                        field: field.name.clone(),
                    })
                })?;
                Value::from_default(&field.schema, default, names)?
            }
        };
        fields.push((field.name.clone(), value));
    }
    Ok(fields)
}

fn integral(json: &JsonValue) -> Option<i64> {
    match json {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

/// Avro default byte strings carry one byte per char code point.
fn json_string_bytes(json: &JsonValue) -> Option<Vec<u8>> {
    json.as_str()
        .map(|s| s.chars().map(|c| c as u32 as u8).collect())
}

/// Utility to build a [`Value::Record`] against a record schema, with fields
/// prefilled to `Null` in schema order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Creates a `Record` for the given schema; `None` if the schema is not
    /// a record.
    pub fn new(schema: &Schema) -> Option<Record> {
        match schema {
            Schema::Record(RecordSchema { fields, .. }) => Some(Record {
                fields: fields
                    .iter()
                    .map(|field| (field.name.clone(), Value::Null))
                    .collect(),
            }),
            _ => None,
        }
    }

    /// Sets the named field. Unknown names are ignored.
    pub fn put(&mut self, field: &str, value: impl Into<Value>) {
        if let Some(entry) = self.fields.iter_mut().find(|(name, _)| name == field) {
            entry.1 = value.into();
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record.fields)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Long(i)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Bytes(bytes.to_vec())
    }
}

impl From<Uuid> for Value {
    fn from(uuid: Uuid) -> Self {
        Value::Uuid(uuid)
    }
}

impl From<BigDecimal> for Value {
    fn from(decimal: BigDecimal) -> Self {
        Value::Decimal(decimal)
    }
}

impl From<Duration> for Value {
    fn from(duration: Duration) -> Self {
        Value::Duration(duration)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}
