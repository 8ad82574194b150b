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

//! **avrolite** encodes and decodes data in the Avro binary format against a
//! JSON-described schema, and reads and writes the Avro Object Container
//! File (OCF) format for self-describing, block-compressed files.
//!
//! There are two ways of working with Avro data in this crate:
//!
//! 1. Dynamically, via the generic [`Value`] tree and the datum functions
//!    [`to_avro_datum`] / [`from_avro_datum`] or the container
//!    [`Reader`] / [`Writer`].
//! 2. Statically, by describing a host type's [`Shape`](resolver::Shape)
//!    once and resolving a cached encode/decode plan for the
//!    `(schema, shape)` pair with a [`resolver::Resolver`].
//!
//! # Example
//!
//! ```
//! use avrolite::{from_avro_datum, to_avro_datum, Schema};
//! use avrolite::value::{Record, Value};
//!
//! let schema = Schema::parse_str(
//!     r#"{
//!         "type": "record",
//!         "name": "test",
//!         "fields": [
//!             {"name": "a", "type": "long"},
//!             {"name": "b", "type": "string"}
//!         ]
//!     }"#,
//! ).unwrap();
//!
//! let mut record = Record::new(&schema).unwrap();
//! record.put("a", 27i64);
//! record.put("b", "foo");
//!
//! let encoded = to_avro_datum(&schema, record).unwrap();
//! assert_eq!(encoded, &[0x36, 0x06, 0x66, 0x6f, 0x6f]);
//!
//! let decoded = from_avro_datum(&schema, &mut &encoded[..]).unwrap();
//! assert_eq!(
//!     decoded,
//!     Value::Record(vec![
//!         ("a".to_string(), Value::Long(27)),
//!         ("b".to_string(), Value::String("foo".to_string())),
//!     ])
//! );
//! ```

mod codec;
mod reader;
mod writer;

pub mod error;
pub mod rabin;
pub mod registry;
pub mod resolver;
pub mod rw;
pub mod schema;
pub mod util;
pub mod value;

mod validator;

pub use codec::Codec;
pub use error::Error;
pub use reader::Reader;
pub use schema::Schema;
pub use value::Value;
pub use writer::Writer;

use crate::resolver::{default_resolver, Shape};

/// A convenience type alias for `Result`s with this crate's [`Error`].
pub type AvroResult<T> = Result<T, Error>;

/// Encodes a single value against `schema` into raw Avro bytes, without any
/// container framing.
pub fn to_avro_datum(schema: &Schema, value: impl Into<Value>) -> AvroResult<Vec<u8>> {
    let plan = default_resolver().encoder(schema, &Shape::Dynamic)?;
    let mut out = rw::Writer::new();
    plan.encode(&value.into(), &mut out)?;
    Ok(out.into_inner())
}

/// Decodes a single raw Avro datum against `schema`.
///
/// This does not read container framing; use [`Reader`] for object container
/// files.
pub fn from_avro_datum(schema: &Schema, reader: &mut impl std::io::Read) -> AvroResult<Value> {
    let plan = default_resolver().decoder(schema, &Shape::Dynamic)?;
    let mut r = rw::Reader::new(reader);
    plan.decode(&mut r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;
    use pretty_assertions::assert_eq;

    #[test]
    fn datum_round_trip_with_container() {
        let raw_schema = r#"
            {
                "type": "record",
                "name": "test",
                "fields": [
                    {"name": "a", "type": "long", "default": 42},
                    {"name": "b", "type": "string"}
                ]
            }
        "#;
        let schema = Schema::parse_str(raw_schema).unwrap();
        let mut writer = Writer::with_codec(&schema, Vec::new(), Codec::Null).unwrap();
        let mut record = Record::new(writer.schema()).unwrap();
        record.put("a", 27i64);
        record.put("b", "foo");
        writer.append(record).unwrap();
        let input = writer.into_inner().unwrap();

        let mut reader = Reader::new(&input[..]).unwrap();
        assert_eq!(
            reader.next().unwrap().unwrap(),
            Value::Record(vec![
                ("a".to_string(), Value::Long(27)),
                ("b".to_string(), Value::String("foo".to_string())),
            ])
        );
        assert!(reader.next().is_none());
    }

    #[test]
    fn illformed_length_does_not_allocate() {
        let raw_schema = r#"
            {
                "type": "record",
                "name": "test",
                "fields": [
                    {"name": "a", "type": "long", "default": 42},
                    {"name": "b", "type": "string"}
                ]
            }
        "#;
        let schema = Schema::parse_str(raw_schema).unwrap();

        // Would allocate 18446744073709551605 bytes
        let illformed: &[u8] = &[0x3e, 0x15, 0xff, 0x1f, 0x15, 0xff];
        let value = from_avro_datum(&schema, &mut &*illformed);
        assert!(value.is_err());
    }
}
