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

use crate::error::Details;
use crate::schema::parser::Parser;
use crate::schema::{
    DecimalInner, DecimalSchema, Documentation, Fingerprints, Name, Names, Schema,
};
use crate::util::MapHelper;
use crate::validator::validate_record_field_name;
use crate::AvroResult;
use log::debug;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A description of a Record schema.
#[derive(bon::Builder, Clone, Debug)]
pub struct RecordSchema {
    /// The full name of the schema.
    pub name: Name,
    /// The documentation of the schema.
    #[builder(default)]
    pub doc: Documentation,
    /// The ordered fields of the record.
    pub fields: Vec<RecordField>,
    /// Field name to position in `fields`.
    #[builder(default = BTreeMap::new())]
    pub lookup: BTreeMap<String, usize>,
    /// Whether the record was declared with `"type": "error"`.
    #[builder(default)]
    pub is_error: bool,
    /// Unrecognized attributes, preserved verbatim.
    #[builder(default = BTreeMap::new())]
    pub attributes: BTreeMap<String, JsonValue>,
    #[builder(skip)]
    pub(crate) fingerprints: Arc<Fingerprints>,
}

impl PartialEq for RecordSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

/// Represents a `field` in a `record` Avro schema.
#[derive(bon::Builder, Clone, Debug, PartialEq)]
pub struct RecordField {
    /// Name of the field.
    #[builder(into)]
    pub name: String,
    /// Documentation of the field.
    #[builder(default)]
    pub doc: Documentation,
    /// Default value of the field as the literal JSON from the schema.
    pub default: Option<JsonValue>,
    /// Schema of the field.
    pub schema: Schema,
    /// Unrecognized attributes, preserved verbatim.
    #[builder(default = BTreeMap::new())]
    pub custom_attributes: BTreeMap<String, JsonValue>,
}

impl RecordField {
    /// Parse a JSON object into a `RecordField`.
    pub(crate) fn parse(
        field: &Map<String, JsonValue>,
        parser: &mut Parser,
        enclosing_record: &Name,
    ) -> AvroResult<Self> {
        let name = field.name().ok_or(Details::GetNameField)?;
        validate_record_field_name(&name)?;

        let ty = field.get("type").ok_or(Details::GetRecordFieldTypeField)?;
        let schema = parser.parse(ty, enclosing_record.namespace())?;

        let default = field.get("default").cloned();
        if let Some(value) = &default {
            if let Err(reason) =
                validate_default(&schema, value, parser.parsed_schemas())
            {
                return Err(Details::InvalidDefault {
                    record: enclosing_record.fullname(),
                    field: name,
                    value: value.clone(),
                    reason,
                }
                .into());
            }
        }

        Ok(RecordField {
            name,
            doc: field.doc(),
            default,
            custom_attributes: field
                .iter()
                .filter(|(key, _)| !matches!(key.as_str(), "type" | "name" | "doc" | "default"))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            schema,
        })
    }
}

impl Serialize for RecordField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", &self.schema)?;
        if let Some(default) = &self.default {
            map.serialize_entry("default", default)?;
        }
        if let Some(doc) = &self.doc {
            map.serialize_entry("doc", doc)?;
        }
        for attr in &self.custom_attributes {
            map.serialize_entry(attr.0, attr.1)?;
        }
        map.end()
    }
}

impl Serialize for RecordSchema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", if self.is_error { "error" } else { "record" })?;
        map.serialize_entry("name", &self.name.name)?;
        if let Some(ns) = &self.name.namespace {
            map.serialize_entry("namespace", ns)?;
        }
        if let Some(doc) = &self.doc {
            map.serialize_entry("doc", doc)?;
        }
        map.serialize_entry("fields", &self.fields)?;
        for attr in &self.attributes {
            map.serialize_entry(attr.0, attr.1)?;
        }
        map.end()
    }
}

/// Validates a default literal against a field schema, returning a
/// human-readable reason on mismatch.
///
/// A union default validates against the first member only; `bytes` and
/// `fixed` defaults are JSON strings whose char code points are the bytes.
pub(crate) fn validate_default(
    schema: &Schema,
    value: &JsonValue,
    names: &Names,
) -> Result<(), String> {
    match schema {
        Schema::Null => match value {
            JsonValue::Null => Ok(()),
            other => Err(format!("expected null, got {other}")),
        },
        Schema::Boolean => match value {
            JsonValue::Bool(_) => Ok(()),
            other => Err(format!("expected a boolean, got {other}")),
        },
        Schema::Int | Schema::Date | Schema::TimeMillis => {
            integral_default(value).and_then(|n| {
                i32::try_from(n)
                    .map(|_| ())
                    .map_err(|_| format!("{n} does not fit into an int"))
            })
        }
        Schema::Long | Schema::TimeMicros | Schema::TimestampMillis | Schema::TimestampMicros => {
            integral_default(value).map(|_| ())
        }
        Schema::Float | Schema::Double => match value {
            JsonValue::Number(_) => Ok(()),
            other => Err(format!("expected a number, got {other}")),
        },
        Schema::String | Schema::Uuid => match value {
            JsonValue::String(_) => Ok(()),
            other => Err(format!("expected a string, got {other}")),
        },
        Schema::Bytes
        | Schema::Decimal(DecimalSchema {
            inner: DecimalInner::Bytes,
            ..
        }) => match value {
            JsonValue::String(_) => Ok(()),
            other => Err(format!("expected a byte string, got {other}")),
        },
        Schema::Fixed(fixed)
        | Schema::Duration(fixed)
        | Schema::Decimal(DecimalSchema {
            inner: DecimalInner::Fixed(fixed),
            ..
        }) => match value {
            JsonValue::String(s) if s.chars().count() == fixed.size => Ok(()),
            JsonValue::String(s) => Err(format!(
                "fixed of size {} cannot hold {} bytes",
                fixed.size,
                s.chars().count()
            )),
            other => Err(format!("expected a byte string, got {other}")),
        },
        Schema::Enum(inner) => match value {
            JsonValue::String(s) if inner.symbols.iter().any(|symbol| symbol == s) => Ok(()),
            JsonValue::String(s) => Err(format!("{s} is not a symbol of the enum")),
            other => Err(format!("expected a symbol string, got {other}")),
        },
        Schema::Array(inner) => match value {
            JsonValue::Array(items) => items
                .iter()
                .try_for_each(|item| validate_default(&inner.items, item, names)),
            other => Err(format!("expected an array, got {other}")),
        },
        Schema::Map(inner) => match value {
            JsonValue::Object(entries) => entries
                .values()
                .try_for_each(|entry| validate_default(&inner.values, entry, names)),
            other => Err(format!("expected an object, got {other}")),
        },
        Schema::Record(record) => match value {
            JsonValue::Object(entries) => {
                for field in &record.fields {
                    match entries.get(&field.name) {
                        Some(entry) => validate_default(&field.schema, entry, names)?,
                        None if field.default.is_some() => {}
                        None => {
                            return Err(format!(
                                "missing value for field {} which has no default",
                                field.name
                            ));
                        }
                    }
                }
                Ok(())
            }
            other => Err(format!("expected an object, got {other}")),
        },
        // The Avro rule: a union default always describes the first member.
        Schema::Union(union) => match union.variants().first() {
            Some(first) => validate_default(first, value, names),
            None => Err("union has no members".to_string()),
        },
        Schema::Ref { name } => match names.get(name) {
            Some(target) => validate_default(target, value, names),
            None => {
                // A default referencing the schema currently being parsed
                // cannot be checked yet; the shape is validated on encode.
                debug!("Skipping default validation against unresolved reference {name}");
                Ok(())
            }
        },
    }
}

fn integral_default(value: &JsonValue) -> Result<i64, String> {
    match value {
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    Ok(f as i64)
                } else {
                    Err(format!("{f} is not an integral value"))
                }
            } else {
                Err(format!("{n} does not fit into a long"))
            }
        }
        other => Err(format!("expected an integer, got {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Details, Error};
    use pretty_assertions::assert_eq;

    #[test]
    fn field_defaults_are_validated_at_parse_time() {
        let err = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "test",
                "fields": [{"name": "a", "type": "long", "default": "forty-two"}]
            }"#,
        )
        .map_err(Error::into_details);
        match err {
            Err(Details::InvalidDefault { record, field, .. }) => {
                assert_eq!(record, "test");
                assert_eq!(field, "a");
            }
            other => panic!("expected InvalidDefault, got {other:?}"),
        }
    }

    #[test]
    fn int_default_must_fit_32_bits() {
        let err = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "test",
                "fields": [{"name": "a", "type": "int", "default": 5000000000}]
            }"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn union_default_validates_against_first_member_only() {
        // null is the first member, so only null is a valid default.
        assert!(Schema::parse_str(
            r#"{
                "type": "record",
                "name": "test",
                "fields": [{"name": "a", "type": ["null", "string"], "default": null}]
            }"#,
        )
        .is_ok());

        assert!(Schema::parse_str(
            r#"{
                "type": "record",
                "name": "test",
                "fields": [{"name": "a", "type": ["null", "string"], "default": "foo"}]
            }"#,
        )
        .is_err());
    }

    #[test]
    fn enum_default_must_be_a_symbol() {
        let schema = r#"{
            "type": "record",
            "name": "test",
            "fields": [{
                "name": "suit",
                "type": {"type": "enum", "name": "Suit", "symbols": ["spades", "clubs"]},
                "default": "hearts"
            }]
        }"#;
        assert!(Schema::parse_str(schema).is_err());
    }

    #[test]
    fn fixed_default_length_must_match_size() {
        let schema = r#"{
            "type": "record",
            "name": "test",
            "fields": [{
                "name": "id",
                "type": {"type": "fixed", "name": "Id", "size": 4},
                "default": "ab"
            }]
        }"#;
        assert!(Schema::parse_str(schema).is_err());
    }

    #[test]
    fn nested_record_default_requires_defaultless_fields() {
        let schema = r#"{
            "type": "record",
            "name": "Outer",
            "fields": [{
                "name": "inner",
                "type": {
                    "type": "record",
                    "name": "Inner",
                    "fields": [
                        {"name": "a", "type": "long"},
                        {"name": "b", "type": "string", "default": ""}
                    ]
                },
                "default": {"a": 1}
            }]
        }"#;
        assert!(Schema::parse_str(schema).is_ok());

        let missing_required = r#"{
            "type": "record",
            "name": "Outer",
            "fields": [{
                "name": "inner",
                "type": {
                    "type": "record",
                    "name": "Inner",
                    "fields": [
                        {"name": "a", "type": "long"},
                        {"name": "b", "type": "string", "default": ""}
                    ]
                },
                "default": {"b": "x"}
            }]
        }"#;
        assert!(Schema::parse_str(missing_required).is_err());
    }
}
