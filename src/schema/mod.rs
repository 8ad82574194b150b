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

//! Parsing and interacting with Avro schemas: the in-memory schema tree,
//! the JSON surface syntax, canonical form and fingerprinting.

mod name;
mod parser;
mod record;
mod union;

pub use name::{Name, Names, Namespace};
pub use record::{RecordField, RecordSchema};
pub use union::UnionSchema;

use crate::error::Details;
use crate::AvroResult;
use digest::Digest;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};
use strum_macros::{Display, EnumDiscriminants};

/// Represents documentation for complex Avro schemas.
pub type Documentation = Option<String>;

/// Represents an Avro schema fingerprint.
pub struct SchemaFingerprint {
    pub bytes: Vec<u8>,
}

impl fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in &self.bytes {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Lazily computed fingerprints shared by all clones of a named schema.
#[derive(Clone, Default)]
pub(crate) struct Fingerprints {
    sha256: OnceLock<[u8; 32]>,
    md5: OnceLock<[u8; 16]>,
    rabin: OnceLock<[u8; 8]>,
}

impl fmt::Debug for Fingerprints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fingerprints")
    }
}

/// Represents any valid Avro schema.
///
/// Logical types are modelled as their own variants wrapping the underlying
/// schema where one is needed; their wire form is that of the base type.
#[derive(Clone, Debug, EnumDiscriminants, Display)]
#[strum_discriminants(name(SchemaKind), derive(Hash, Ord, PartialOrd))]
pub enum Schema {
    /// A `null` Avro schema.
    Null,
    /// A `boolean` Avro schema.
    Boolean,
    /// An `int` Avro schema.
    Int,
    /// A `long` Avro schema.
    Long,
    /// A `float` Avro schema.
    Float,
    /// A `double` Avro schema.
    Double,
    /// A `bytes` Avro schema.
    Bytes,
    /// A `string` Avro schema.
    String,
    /// An `array` Avro schema. All items share one schema.
    Array(ArraySchema),
    /// A `map` Avro schema. Keys are strings; all values share one schema.
    Map(MapSchema),
    /// A `union` Avro schema.
    Union(UnionSchema),
    /// A `record` Avro schema.
    Record(RecordSchema),
    /// An `enum` Avro schema.
    Enum(EnumSchema),
    /// A `fixed` Avro schema.
    Fixed(FixedSchema),
    /// The `decimal` logical type over `bytes` or `fixed`.
    Decimal(DecimalSchema),
    /// The `uuid` logical type over `string`.
    Uuid,
    /// The `date` logical type: days since the Unix epoch over `int`.
    Date,
    /// The `time-millis` logical type over `int`.
    TimeMillis,
    /// The `time-micros` logical type over `long`.
    TimeMicros,
    /// The `timestamp-millis` logical type over `long`.
    TimestampMillis,
    /// The `timestamp-micros` logical type over `long`.
    TimestampMicros,
    /// The `duration` logical type over a `fixed` of size 12.
    Duration(FixedSchema),
    /// A back-reference to a named schema defined elsewhere in the tree.
    Ref { name: Name },
}

/// A description of an Array schema.
#[derive(Clone, Debug, PartialEq)]
pub struct ArraySchema {
    pub items: Box<Schema>,
    pub attributes: BTreeMap<String, JsonValue>,
}

/// A description of a Map schema.
#[derive(Clone, Debug, PartialEq)]
pub struct MapSchema {
    pub values: Box<Schema>,
    pub attributes: BTreeMap<String, JsonValue>,
}

/// A description of an Enum schema.
#[derive(bon::Builder, Clone, Debug)]
pub struct EnumSchema {
    /// The full name of the schema.
    pub name: Name,
    /// The documentation of the schema.
    #[builder(default)]
    pub doc: Documentation,
    /// The ordered symbols; the wire form of a value is its index here.
    pub symbols: Vec<String>,
    /// An optional default symbol.
    pub default: Option<String>,
    /// Unrecognized attributes, preserved verbatim.
    #[builder(default = BTreeMap::new())]
    pub attributes: BTreeMap<String, JsonValue>,
    #[builder(skip)]
    pub(crate) fingerprints: Arc<Fingerprints>,
}

impl PartialEq for EnumSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.symbols == other.symbols
    }
}

/// A description of a Fixed schema.
#[derive(bon::Builder, Clone, Debug)]
pub struct FixedSchema {
    /// The full name of the schema.
    pub name: Name,
    /// The documentation of the schema.
    #[builder(default)]
    pub doc: Documentation,
    /// The exact number of bytes per value.
    pub size: usize,
    /// Unrecognized attributes, preserved verbatim.
    #[builder(default = BTreeMap::new())]
    pub attributes: BTreeMap<String, JsonValue>,
    #[builder(skip)]
    pub(crate) fingerprints: Arc<Fingerprints>,
}

impl PartialEq for FixedSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.size == other.size
    }
}

/// A description of a Decimal schema: an unscaled two's-complement integer
/// over `bytes` or `fixed`, scaled by `10^-scale`.
#[derive(Clone, Debug, PartialEq)]
pub struct DecimalSchema {
    /// The maximum number of digits in the unscaled value.
    pub precision: usize,
    /// The number of digits to the right of the decimal point.
    pub scale: usize,
    /// The underlying wire schema.
    pub inner: DecimalInner,
}

/// The underlying wire schema of a Decimal.
#[derive(Clone, Debug, PartialEq)]
pub enum DecimalInner {
    Bytes,
    Fixed(FixedSchema),
}

impl Schema {
    /// Create a `Schema` from a string representing a JSON Avro schema.
    pub fn parse_str(input: &str) -> AvroResult<Schema> {
        let mut parser = parser::Parser::default();
        parser.parse_str(input)
    }

    /// Create an array of `Schema`s from an iterator of JSON Avro schema
    /// texts. The schemas may reference each other by name.
    pub fn parse_list(input: impl IntoIterator<Item = impl AsRef<str>>) -> AvroResult<Vec<Schema>> {
        let input = input.into_iter();
        let mut input_schemas: HashMap<Name, JsonValue> = HashMap::new();
        let mut input_order: Vec<Name> = Vec::new();
        for json in input {
            let value: JsonValue =
                serde_json::from_str(json.as_ref()).map_err(Details::ParseSchemaJson)?;
            let JsonValue::Object(object) = &value else {
                return Err(Details::GetNameField.into());
            };
            let name = Name::parse(object, None)?;
            if input_schemas.insert(name.clone(), value).is_some() {
                return Err(Details::AmbiguousSchemaDefinition(name).into());
            }
            input_order.push(name);
        }
        let mut parser = parser::Parser::new(input_schemas, input_order);
        parser.parse_list()
    }

    /// Parses an Avro schema from an already-parsed JSON value.
    pub fn parse(value: &JsonValue) -> AvroResult<Schema> {
        let mut parser = parser::Parser::default();
        parser.parse(value, None)
    }

    /// Converts `self` into its Parsing Canonical Form: only semantic
    /// attributes, fully qualified names, named definitions expanded on
    /// first occurrence only, no whitespace.
    pub fn canonical_form(&self) -> String {
        let json = serde_json::to_value(self)
            .unwrap_or_else(|e| panic!("Cannot render Schema as JSON: {e}"));
        let mut defined_names = HashSet::new();
        parsing_canonical_form(&json, &mut defined_names)
    }

    /// Generate a fingerprint of the schema's Parsing Canonical Form with an
    /// arbitrary [`Digest`] implementation.
    ///
    /// ```
    /// use avrolite::rabin::Rabin;
    /// use avrolite::schema::Schema;
    /// use md5::Md5;
    /// use sha2::Sha256;
    ///
    /// let schema = Schema::parse_str(r#"{"type": "fixed", "name": "id", "size": 8}"#).unwrap();
    /// println!("{}", schema.fingerprint::<Sha256>());
    /// println!("{}", schema.fingerprint::<Md5>());
    /// println!("{}", schema.fingerprint::<Rabin>());
    /// ```
    pub fn fingerprint<D: Digest>(&self) -> SchemaFingerprint {
        let mut d = D::new();
        d.update(self.canonical_form());
        SchemaFingerprint {
            bytes: d.finalize().to_vec(),
        }
    }

    /// The SHA-256 fingerprint, computed once per named schema.
    pub fn fingerprint_sha256(&self) -> [u8; 32] {
        let compute = || {
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(&self.fingerprint::<sha2::Sha256>().bytes);
            bytes
        };
        match self.fingerprints() {
            Some(memo) => *memo.sha256.get_or_init(compute),
            None => compute(),
        }
    }

    /// The MD5 fingerprint, computed once per named schema.
    pub fn fingerprint_md5(&self) -> [u8; 16] {
        let compute = || {
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(&self.fingerprint::<md5::Md5>().bytes);
            bytes
        };
        match self.fingerprints() {
            Some(memo) => *memo.md5.get_or_init(compute),
            None => compute(),
        }
    }

    /// The CRC-64-AVRO fingerprint, computed once per named schema.
    pub fn fingerprint_rabin(&self) -> [u8; 8] {
        let compute = || {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&self.fingerprint::<crate::rabin::Rabin>().bytes);
            bytes
        };
        match self.fingerprints() {
            Some(memo) => *memo.rabin.get_or_init(compute),
            None => compute(),
        }
    }

    fn fingerprints(&self) -> Option<&Fingerprints> {
        match self {
            Schema::Record(RecordSchema { fingerprints, .. })
            | Schema::Enum(EnumSchema { fingerprints, .. })
            | Schema::Fixed(FixedSchema { fingerprints, .. })
            | Schema::Decimal(DecimalSchema {
                inner: DecimalInner::Fixed(FixedSchema { fingerprints, .. }),
                ..
            })
            | Schema::Duration(FixedSchema { fingerprints, .. }) => Some(fingerprints),
            _ => None,
        }
    }

    /// The kind of this schema node.
    pub fn kind(&self) -> SchemaKind {
        SchemaKind::from(self)
    }

    /// Returns whether the schema is a named type.
    pub fn is_named(&self) -> bool {
        self.name().is_some()
    }

    /// Returns the name of the schema if it has one.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Schema::Ref { name }
            | Schema::Record(RecordSchema { name, .. })
            | Schema::Enum(EnumSchema { name, .. })
            | Schema::Fixed(FixedSchema { name, .. })
            | Schema::Decimal(DecimalSchema {
                inner: DecimalInner::Fixed(FixedSchema { name, .. }),
                ..
            })
            | Schema::Duration(FixedSchema { name, .. }) => Some(name),
            _ => None,
        }
    }

    /// Returns the namespace of the schema if it has one.
    pub fn namespace(&self) -> Namespace {
        self.name().and_then(|n| n.namespace.clone())
    }

    /// The string naming this schema inside a union: the full name for named
    /// schemas, `base.logical` for logical types, the plain kind otherwise.
    pub fn union_discriminant(&self) -> String {
        match self {
            Schema::Null => "null".to_string(),
            Schema::Boolean => "boolean".to_string(),
            Schema::Int => "int".to_string(),
            Schema::Long => "long".to_string(),
            Schema::Float => "float".to_string(),
            Schema::Double => "double".to_string(),
            Schema::Bytes => "bytes".to_string(),
            Schema::String => "string".to_string(),
            Schema::Array(_) => "array".to_string(),
            Schema::Map(_) => "map".to_string(),
            Schema::Union(_) => "union".to_string(),
            Schema::Decimal(DecimalSchema {
                inner: DecimalInner::Bytes,
                ..
            }) => "bytes.decimal".to_string(),
            Schema::Uuid => "string.uuid".to_string(),
            Schema::Date => "int.date".to_string(),
            Schema::TimeMillis => "int.time-millis".to_string(),
            Schema::TimeMicros => "long.time-micros".to_string(),
            Schema::TimestampMillis => "long.timestamp-millis".to_string(),
            Schema::TimestampMicros => "long.timestamp-micros".to_string(),
            Schema::Record(_)
            | Schema::Enum(_)
            | Schema::Fixed(_)
            | Schema::Decimal(_)
            | Schema::Duration(_)
            | Schema::Ref { .. } => self
                .name()
                .expect("named schema kinds carry a name")
                .fullname(),
        }
    }

    /// The value of a free-form property preserved from the schema JSON.
    pub fn prop(&self, name: &str) -> Option<&JsonValue> {
        self.attributes().and_then(|attrs| attrs.get(name))
    }

    /// Returns the free-form property bag if the schema carries one.
    pub fn attributes(&self) -> Option<&BTreeMap<String, JsonValue>> {
        match self {
            Schema::Record(RecordSchema { attributes, .. })
            | Schema::Enum(EnumSchema { attributes, .. })
            | Schema::Fixed(FixedSchema { attributes, .. })
            | Schema::Array(ArraySchema { attributes, .. })
            | Schema::Map(MapSchema { attributes, .. })
            | Schema::Decimal(DecimalSchema {
                inner: DecimalInner::Fixed(FixedSchema { attributes, .. }),
                ..
            })
            | Schema::Duration(FixedSchema { attributes, .. }) => Some(attributes),
            _ => None,
        }
    }

    /// Collects every named schema reachable from this root, verifying that
    /// full names are unique and that every reference resolves.
    pub fn names(&self) -> AvroResult<Names> {
        let mut names: Names = HashMap::new();
        let mut refs: Vec<Name> = Vec::new();
        collect_names(self, &mut names, &mut refs)?;
        for reference in refs {
            if !names.contains_key(&reference) {
                return Err(Details::UnresolvedRef(reference).into());
            }
        }
        Ok(names)
    }
}

fn collect_names(schema: &Schema, names: &mut Names, refs: &mut Vec<Name>) -> AvroResult<()> {
    match schema {
        Schema::Ref { name } => refs.push(name.clone()),
        Schema::Record(record) => {
            if names
                .insert(record.name.clone(), schema.clone())
                .is_some()
            {
                return Err(Details::AmbiguousSchemaDefinition(record.name.clone()).into());
            }
            for field in &record.fields {
                collect_names(&field.schema, names, refs)?;
            }
        }
        Schema::Enum(EnumSchema { name, .. }) => {
            if names.insert(name.clone(), schema.clone()).is_some() {
                return Err(Details::AmbiguousSchemaDefinition(name.clone()).into());
            }
        }
        Schema::Fixed(FixedSchema { name, .. })
        | Schema::Duration(FixedSchema { name, .. })
        | Schema::Decimal(DecimalSchema {
            inner: DecimalInner::Fixed(FixedSchema { name, .. }),
            ..
        }) => {
            if names.insert(name.clone(), schema.clone()).is_some() {
                return Err(Details::AmbiguousSchemaDefinition(name.clone()).into());
            }
        }
        Schema::Array(ArraySchema { items, .. }) => collect_names(items, names, refs)?,
        Schema::Map(MapSchema { values, .. }) => collect_names(values, names, refs)?,
        Schema::Union(union) => {
            for member in union.variants() {
                collect_names(member, names, refs)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Schema equality is assessed on the Parsing Canonical Form, so two trees
/// that fingerprint identically compare equal.
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_form() == other.canonical_form()
    }
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Schema::Null => serializer.serialize_str("null"),
            Schema::Boolean => serializer.serialize_str("boolean"),
            Schema::Int => serializer.serialize_str("int"),
            Schema::Long => serializer.serialize_str("long"),
            Schema::Float => serializer.serialize_str("float"),
            Schema::Double => serializer.serialize_str("double"),
            Schema::Bytes => serializer.serialize_str("bytes"),
            Schema::String => serializer.serialize_str("string"),
            Schema::Ref { name } => serializer.serialize_str(&name.fullname()),
            Schema::Array(inner) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", &*inner.items)?;
                for attr in &inner.attributes {
                    map.serialize_entry(attr.0, attr.1)?;
                }
                map.end()
            }
            Schema::Map(inner) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "map")?;
                map.serialize_entry("values", &*inner.values)?;
                for attr in &inner.attributes {
                    map.serialize_entry(attr.0, attr.1)?;
                }
                map.end()
            }
            Schema::Union(inner) => {
                let mut seq = serializer.serialize_seq(Some(inner.variants().len()))?;
                for member in inner.variants() {
                    seq.serialize_element(member)?;
                }
                seq.end()
            }
            Schema::Record(record) => record.serialize(serializer),
            Schema::Enum(inner) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "enum")?;
                map.serialize_entry("name", &inner.name.name)?;
                if let Some(ns) = &inner.name.namespace {
                    map.serialize_entry("namespace", ns)?;
                }
                if let Some(doc) = &inner.doc {
                    map.serialize_entry("doc", doc)?;
                }
                map.serialize_entry("symbols", &inner.symbols)?;
                if let Some(default) = &inner.default {
                    map.serialize_entry("default", default)?;
                }
                for attr in &inner.attributes {
                    map.serialize_entry(attr.0, attr.1)?;
                }
                map.end()
            }
            Schema::Fixed(inner) => serialize_fixed::<S>(serializer, inner, None),
            Schema::Duration(inner) => serialize_fixed::<S>(serializer, inner, Some("duration")),
            Schema::Decimal(decimal) => {
                let mut map = serializer.serialize_map(None)?;
                match &decimal.inner {
                    DecimalInner::Bytes => map.serialize_entry("type", "bytes")?,
                    DecimalInner::Fixed(fixed) => {
                        map.serialize_entry("type", "fixed")?;
                        map.serialize_entry("name", &fixed.name.name)?;
                        if let Some(ns) = &fixed.name.namespace {
                            map.serialize_entry("namespace", ns)?;
                        }
                        map.serialize_entry("size", &fixed.size)?;
                    }
                }
                map.serialize_entry("logicalType", "decimal")?;
                map.serialize_entry("precision", &decimal.precision)?;
                map.serialize_entry("scale", &decimal.scale)?;
                map.end()
            }
            Schema::Uuid => serialize_logical(serializer, "string", "uuid"),
            Schema::Date => serialize_logical(serializer, "int", "date"),
            Schema::TimeMillis => serialize_logical(serializer, "int", "time-millis"),
            Schema::TimeMicros => serialize_logical(serializer, "long", "time-micros"),
            Schema::TimestampMillis => serialize_logical(serializer, "long", "timestamp-millis"),
            Schema::TimestampMicros => serialize_logical(serializer, "long", "timestamp-micros"),
        }
    }
}

fn serialize_fixed<S>(
    serializer: S,
    fixed: &FixedSchema,
    logical: Option<&str>,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(None)?;
    map.serialize_entry("type", "fixed")?;
    map.serialize_entry("name", &fixed.name.name)?;
    if let Some(ns) = &fixed.name.namespace {
        map.serialize_entry("namespace", ns)?;
    }
    if let Some(doc) = &fixed.doc {
        map.serialize_entry("doc", doc)?;
    }
    map.serialize_entry("size", &fixed.size)?;
    if let Some(logical) = logical {
        map.serialize_entry("logicalType", logical)?;
    }
    for attr in &fixed.attributes {
        map.serialize_entry(attr.0, attr.1)?;
    }
    map.end()
}

fn serialize_logical<S>(serializer: S, base: &str, logical: &str) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(2))?;
    map.serialize_entry("type", base)?;
    map.serialize_entry("logicalType", logical)?;
    map.end()
}

// The attributes retained by the Parsing Canonical Form, in their canonical
// order.
const CANONICAL_FIELDS: &[&str] = &["name", "type", "fields", "symbols", "items", "values", "size"];

fn canonical_position(field: &str) -> Option<usize> {
    CANONICAL_FIELDS.iter().position(|&f| f == field)
}

/// Renders the JSON form of a valid schema into the Parsing Canonical Form.
fn parsing_canonical_form(schema: &JsonValue, defined_names: &mut HashSet<String>) -> String {
    match schema {
        JsonValue::Object(map) => pcf_map(map, defined_names),
        JsonValue::String(s) => pcf_string(s),
        JsonValue::Array(v) => pcf_array(v, defined_names),
        json => panic!("got invalid JSON value for canonical form of schema: {json}"),
    }
}

fn pcf_map(schema: &Map<String, JsonValue>, defined_names: &mut HashSet<String>) -> String {
    let typ = schema.get("type").and_then(|v| v.as_str());
    let fullname = if matches!(typ, Some("record" | "error" | "enum" | "fixed")) {
        let ns = schema.get("namespace").and_then(|v| v.as_str());
        let raw_name = schema
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        Some(match ns {
            Some(ns) => format!("{ns}.{raw_name}"),
            None => raw_name.to_string(),
        })
    } else {
        None
    };

    // A named schema is expanded only on its first occurrence per root;
    // thereafter the canonical form is just the name string.
    if let Some(ref n) = fullname {
        if defined_names.contains(n) {
            return pcf_string(n);
        }
        defined_names.insert(n.clone());
    }

    let mut fields = Vec::new();
    for (k, v) in schema {
        let Some(position) = canonical_position(k) else {
            // Strip non-semantic attributes, logicalType included.
            continue;
        };

        // Fully qualify the name.
        if k == "name" && let Some(ref n) = fullname {
            fields.push((position, format!("{}:{}", pcf_string(k), pcf_string(n))));
            continue;
        }

        // `"error"` is a record on the wire.
        if k == "type" && v.as_str() == Some("error") {
            fields.push((position, format!("{}:{}", pcf_string(k), pcf_string("record"))));
            continue;
        }

        fields.push((
            position,
            format!(
                "{}:{}",
                pcf_string(k),
                parsing_canonical_form(v, defined_names)
            ),
        ));
    }

    // Reduce primitive schemas to their simple form, e.g. {"type":"int"}
    // (with any logical annotation stripped above) to "int".
    if fields.len() == 1
        && let Some(s) = schema.get("type").and_then(|v| v.as_str())
        && canonical_position("type") == Some(fields[0].0)
        && !matches!(s, "record" | "error" | "enum" | "fixed" | "array" | "map")
    {
        return pcf_string(s);
    }

    fields.sort_unstable_by_key(|(position, _)| *position);
    let inter = fields
        .into_iter()
        .map(|(_, v)| v)
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{inter}}}")
}

fn pcf_array(arr: &[JsonValue], defined_names: &mut HashSet<String>) -> String {
    let inter = arr
        .iter()
        .map(|a| parsing_canonical_form(a, defined_names))
        .collect::<Vec<String>>()
        .join(",");
    format!("[{inter}]")
}

fn pcf_string(s: &str) -> String {
    format!(r#""{s}""#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn canonical_form_of_primitives() {
        for name in ["null", "boolean", "int", "long", "float", "double", "bytes", "string"] {
            let schema = Schema::parse_str(&format!(r#""{name}""#)).unwrap();
            assert_eq!(schema.canonical_form(), format!(r#""{name}""#));
        }
    }

    #[test]
    fn canonical_form_strips_logical_annotations() {
        let schema = Schema::parse_str(r#"{"type": "int", "logicalType": "date"}"#).unwrap();
        assert_eq!(schema.canonical_form(), r#""int""#);
    }

    #[test]
    fn canonical_form_of_union() {
        let schema = Schema::parse_str(r#"["null", "int"]"#).unwrap();
        assert_eq!(schema.canonical_form(), r#"["null","int"]"#);
    }

    #[test]
    fn canonical_form_of_record_orders_and_qualifies() {
        let schema = Schema::parse_str(
            r#"{
                "namespace": "org.example",
                "type": "record",
                "name": "test",
                "doc": "ignored",
                "fields": [
                    {"name": "a", "type": "long", "default": 42},
                    {"name": "b", "type": "string"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(
            schema.canonical_form(),
            r#"{"name":"org.example.test","type":"record","fields":[{"name":"a","type":"long"},{"name":"b","type":"string"}]}"#
        );
    }

    #[test]
    fn canonical_form_expands_names_once() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "LongList",
                "fields": [
                    {"name": "value", "type": "long"},
                    {"name": "next", "type": ["null", "LongList"]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(
            schema.canonical_form(),
            r#"{"name":"LongList","type":"record","fields":[{"name":"value","type":"long"},{"name":"next","type":["null","LongList"]}]}"#
        );
    }

    #[test]
    fn sha256_fingerprint_of_null() {
        let schema = Schema::parse_str(r#""null""#).unwrap();
        let fp = schema.fingerprint_sha256();
        assert_eq!(&fp[..4], &[0xf0, 0x72, 0xcb, 0xec]);
        assert_eq!(&fp[29..], &[0x7d, 0x1a, 0x1f]);
    }

    #[test]
    fn sha256_fingerprint_of_nullable_int() {
        let schema = Schema::parse_str(r#"["null", "int"]"#).unwrap();
        let fp = schema.fingerprint_sha256();
        assert_eq!(&fp[..4], &[0xb4, 0x94, 0x95, 0xc5]);
        assert_eq!(&fp[30..], &[0xaf, 0xce]);
    }

    #[test]
    fn rabin_fingerprint_of_null() {
        let schema = Schema::parse_str(r#""null""#).unwrap();
        assert_eq!(
            schema.fingerprint_rabin(),
            [0x63, 0xdd, 0x24, 0xe7, 0xcc, 0x25, 0x8f, 0x8a]
        );
    }

    #[test]
    fn fingerprints_are_memoised_per_named_schema() {
        let schema =
            Schema::parse_str(r#"{"type": "fixed", "name": "id", "size": 8}"#).unwrap();
        let first = schema.fingerprint_sha256();
        let again = schema.fingerprint_sha256();
        assert_eq!(first, again);
        // Clones share the memo through the Arc.
        let clone = schema.clone();
        assert_eq!(clone.fingerprint_sha256(), first);
    }

    #[test]
    fn equality_is_canonical() {
        let a = Schema::parse_str(r#"{"type": "int", "logicalType": "date"}"#).unwrap();
        // The logical annotation is not part of the canonical form.
        assert_eq!(a.canonical_form(), Schema::Int.canonical_form());

        let with_doc = Schema::parse_str(
            r#"{"type": "enum", "name": "t", "doc": "x", "symbols": ["foo", "bar"]}"#,
        )
        .unwrap();
        let without_doc =
            Schema::parse_str(r#"{"type": "enum", "name": "t", "symbols": ["foo", "bar"]}"#)
                .unwrap();
        assert_eq!(with_doc, without_doc);
    }

    #[test]
    fn names_resolves_references() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "Node",
                "fields": [
                    {"name": "next", "type": ["null", "Node"]}
                ]
            }"#,
        )
        .unwrap();
        let names = schema.names().unwrap();
        assert_eq!(names.len(), 1);
        assert!(names.contains_key(&Name::new("Node").unwrap()));
    }

    #[test]
    fn union_discriminants() {
        assert_eq!(Schema::Long.union_discriminant(), "long");
        assert_eq!(Schema::TimestampMicros.union_discriminant(), "long.timestamp-micros");
        let named = Schema::parse_str(r#"{"type": "fixed", "name": "a.b", "size": 4}"#).unwrap();
        assert_eq!(named.union_discriminant(), "a.b");
    }
}
