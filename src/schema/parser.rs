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
use crate::schema::{
    ArraySchema, DecimalInner, DecimalSchema, EnumSchema, FixedSchema, MapSchema, Name, Names,
    RecordField, RecordSchema, Schema, UnionSchema,
};
use crate::util::MapHelper;
use crate::validator::validate_enum_symbol_name;
use crate::AvroResult;
use log::{debug, warn};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Two-pass schema parser: named schemas register into a name table before
/// their children are descended, which is what makes recursive records
/// resolvable.
#[derive(Default)]
pub(crate) struct Parser {
    input_schemas: HashMap<Name, JsonValue>,
    /// Placeholder references for schemas whose parse is in progress, i.e.
    /// when a field's type is a reference to its own record's type.
    resolving_schemas: Names,
    input_order: Vec<Name>,
    parsed_schemas: Names,
}

impl Parser {
    pub(crate) fn new(input_schemas: HashMap<Name, JsonValue>, input_order: Vec<Name>) -> Self {
        Self {
            input_schemas,
            resolving_schemas: HashMap::new(),
            input_order,
            parsed_schemas: HashMap::new(),
        }
    }

    pub(crate) fn parsed_schemas(&self) -> &Names {
        &self.parsed_schemas
    }

    /// Create a `Schema` from a string representing a JSON Avro schema.
    pub(crate) fn parse_str(&mut self, input: &str) -> AvroResult<Schema> {
        let value = serde_json::from_str(input).map_err(Details::ParseSchemaJson)?;
        self.parse(&value, None)
    }

    /// Parse every input schema, returning them in input order. Inputs may
    /// reference each other by name.
    pub(crate) fn parse_list(&mut self) -> AvroResult<Vec<Schema>> {
        while let Some(next_name) = self.input_schemas.keys().next().cloned() {
            let (name, value) = self
                .input_schemas
                .remove_entry(&next_name)
                .expect("Key unexpectedly missing");
            let parsed = self.parse(&value, None)?;
            self.parsed_schemas.entry(name).or_insert(parsed);
        }

        let mut parsed_schemas = Vec::with_capacity(self.input_order.len());
        for name in self.input_order.drain(0..) {
            let parsed = self
                .parsed_schemas
                .get(&name)
                .cloned()
                .expect("One of the input schemas was unexpectedly not parsed");
            parsed_schemas.push(parsed);
        }
        Ok(parsed_schemas)
    }

    /// Create a `Schema` from a JSON value: a string is a primitive name or
    /// a reference, an array is a union, an object dispatches on `"type"`.
    pub(crate) fn parse(
        &mut self,
        value: &JsonValue,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        match value {
            JsonValue::String(t) => self.parse_known_schema(t.as_str(), enclosing_namespace),
            JsonValue::Object(data) => self.parse_complex(data, enclosing_namespace),
            JsonValue::Array(data) => self.parse_union(data, enclosing_namespace),
            _ => Err(Details::ParseSchemaFromValidJson.into()),
        }
    }

    /// Parse a string as a primitive type or a reference to a named schema.
    fn parse_known_schema(
        &mut self,
        name: &str,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        match name {
            "null" => Ok(Schema::Null),
            "boolean" => Ok(Schema::Boolean),
            "int" => Ok(Schema::Int),
            "long" => Ok(Schema::Long),
            "double" => Ok(Schema::Double),
            "float" => Ok(Schema::Float),
            "bytes" => Ok(Schema::Bytes),
            "string" => Ok(Schema::String),
            _ => self.fetch_schema_ref(name, enclosing_namespace),
        }
    }

    /// Resolve a bare name against the innermost enclosing namespace, then
    /// the root scope. Parses the referenced input schema on demand when
    /// working through a schema list.
    fn fetch_schema_ref(
        &mut self,
        name: &str,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let scoped = Name::new_with_enclosing_namespace(name, enclosing_namespace)?;
        let root = Name::new(name)?;

        for candidate in [&scoped, &root] {
            if self.parsed_schemas.contains_key(candidate)
                || self.resolving_schemas.contains_key(candidate)
            {
                return Ok(Schema::Ref {
                    name: candidate.clone(),
                });
            }
        }

        match scoped.name() {
            "record" | "enum" | "fixed" => {
                return Err(Details::ParsePrimitive(scoped.name().to_string()).into());
            }
            _ => (),
        }

        let (key, value) = match self.input_schemas.remove_entry(&scoped) {
            Some(entry) => entry,
            None => self
                .input_schemas
                .remove_entry(&root)
                .ok_or_else(|| Details::ParsePrimitive(scoped.fullname()))?,
        };

        // An input schema parsed from inside another schema does not inherit
        // the referencing schema's namespace.
        let parsed = self.parse(&value, None)?;
        self.parsed_schemas.entry(key.clone()).or_insert(parsed);

        Ok(Schema::Ref { name: key })
    }

    /// Parse a JSON object into a `Schema`, handling logical type
    /// annotations first.
    fn parse_complex(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        match complex.get("logicalType") {
            Some(JsonValue::String(t)) => {
                if let Some(schema) = self.parse_logical(t, complex, enclosing_namespace)? {
                    return Ok(schema);
                }
                // Unknown logical types pass through as their base type.
            }
            Some(value) => return Err(Details::GetLogicalTypeFieldType(value.clone()).into()),
            None => {}
        }

        match complex.get("type") {
            Some(JsonValue::String(t)) => match t.as_str() {
                "record" => self.parse_record(complex, enclosing_namespace, false),
                "error" => self.parse_record(complex, enclosing_namespace, true),
                "enum" => self.parse_enum(complex, enclosing_namespace),
                "array" => self.parse_array(complex, enclosing_namespace),
                "map" => self.parse_map(complex, enclosing_namespace),
                "fixed" => self.parse_fixed(complex, enclosing_namespace),
                other => self.parse_known_schema(other, enclosing_namespace),
            },
            Some(JsonValue::Object(data)) => self.parse_complex(data, enclosing_namespace),
            Some(JsonValue::Array(variants)) => self.parse_union(variants, enclosing_namespace),
            Some(unknown) => Err(Details::ParsePrimitive(unknown.to_string()).into()),
            None => Err(Details::GetTypeField.into()),
        }
    }

    /// Parse a recognized logical type annotation. Returns `Ok(None)` for
    /// unrecognized logical names. A structurally invalid annotation
    /// silently degrades to the base schema.
    fn parse_logical(
        &mut self,
        logical: &str,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Option<Schema>> {
        if !matches!(
            logical,
            "date"
                | "time-millis"
                | "time-micros"
                | "timestamp-millis"
                | "timestamp-micros"
                | "uuid"
                | "duration"
                | "decimal"
        ) {
            debug!("Unknown logical type {logical}, using the base schema");
            return Ok(None);
        }

        let base = match complex.get("type") {
            Some(JsonValue::String(s)) if s == "fixed" => {
                self.parse_fixed(complex, enclosing_namespace)?
            }
            Some(value) => self.parse(value, enclosing_namespace)?,
            None => return Err(Details::GetTypeField.into()),
        };

        let annotated = match (logical, &base) {
            ("date", Schema::Int) => Some(Schema::Date),
            ("time-millis", Schema::Int) => Some(Schema::TimeMillis),
            ("time-micros", Schema::Long) => Some(Schema::TimeMicros),
            ("timestamp-millis", Schema::Long) => Some(Schema::TimestampMillis),
            ("timestamp-micros", Schema::Long) => Some(Schema::TimestampMicros),
            ("uuid", Schema::String) => Some(Schema::Uuid),
            ("duration", Schema::Fixed(fixed)) => {
                if fixed.size == 12 {
                    Some(Schema::Duration(fixed.clone()))
                } else {
                    warn!(
                        "Ignoring duration logical type on a fixed of size {} (must be 12)",
                        fixed.size
                    );
                    Some(base.clone())
                }
            }
            ("decimal", Schema::Bytes) => match self.parse_precision_and_scale(complex, None) {
                Ok((precision, scale)) => Some(Schema::Decimal(DecimalSchema {
                    precision,
                    scale,
                    inner: DecimalInner::Bytes,
                })),
                Err(err) => {
                    warn!("Ignoring invalid decimal logical type: {err}");
                    Some(base.clone())
                }
            },
            ("decimal", Schema::Fixed(fixed)) => {
                match self.parse_precision_and_scale(complex, Some(fixed.size)) {
                    Ok((precision, scale)) => Some(Schema::Decimal(DecimalSchema {
                        precision,
                        scale,
                        inner: DecimalInner::Fixed(fixed.clone()),
                    })),
                    Err(err) => {
                        warn!("Ignoring invalid decimal logical type: {err}");
                        Some(base.clone())
                    }
                }
            }
            _ => {
                warn!("Ignoring logical type {logical} for schema: {base:?}");
                Some(base.clone())
            }
        };
        Ok(annotated)
    }

    fn parse_precision_and_scale(
        &self,
        complex: &Map<String, JsonValue>,
        fixed_size: Option<usize>,
    ) -> AvroResult<(usize, usize)> {
        fn get_integer(
            complex: &Map<String, JsonValue>,
            key: &'static str,
        ) -> AvroResult<Option<i64>> {
            match complex.get(key) {
                Some(JsonValue::Number(value)) => value
                    .as_i64()
                    .map(Some)
                    .ok_or_else(|| {
                        Details::GetDecimalMetadataValueFromJson {
                            key,
                            value: JsonValue::Number(value.clone()),
                        }
                        .into()
                    }),
                None => Ok(None),
                Some(value) => Err(Details::GetDecimalMetadataValueFromJson {
                    key,
                    value: value.clone(),
                }
                .into()),
            }
        }

        let precision =
            get_integer(complex, "precision")?.ok_or(Details::GetDecimalMetadataFromJson(
                "precision",
            ))?;
        let scale = get_integer(complex, "scale")?.unwrap_or(0);

        if precision < 1 {
            return Err(Details::DecimalPrecisionMustBePositive { precision }.into());
        }
        if scale < 0 {
            return Err(Details::DecimalScaleMustBePositive { scale }.into());
        }
        if scale > precision {
            return Err(Details::DecimalScaleGreaterThanPrecision { scale, precision }.into());
        }
        if let Some(size) = fixed_size {
            // The widest unscaled value `size` bytes can hold in
            // two's-complement is 2^(8*size - 1) - 1.
            let max_precision =
                (((size as f64) * 8.0 - 1.0) * std::f64::consts::LOG10_2).floor() as i64;
            if precision > max_precision {
                return Err(Details::DecimalPrecisionOverFixedCapacity { precision, size }.into());
            }
        }
        Ok((precision as usize, scale as usize))
    }

    fn register_resolving_schema(&mut self, name: &Name) -> AvroResult<()> {
        if self.parsed_schemas.contains_key(name) || self.resolving_schemas.contains_key(name) {
            return Err(Details::AmbiguousSchemaDefinition(name.clone()).into());
        }
        self.resolving_schemas
            .insert(name.clone(), Schema::Ref { name: name.clone() });
        Ok(())
    }

    fn register_parsed_schema(&mut self, name: &Name, schema: &Schema) -> AvroResult<()> {
        if self.resolving_schemas.remove(name).is_none()
            && self.parsed_schemas.contains_key(name)
        {
            return Err(Details::AmbiguousSchemaDefinition(name.clone()).into());
        }
        self.parsed_schemas.insert(name.clone(), schema.clone());
        Ok(())
    }

    /// Returns an already parsed or currently resolving schema for an object
    /// of the form `{"type": "SomeName"}`.
    fn get_already_seen_schema(
        &self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> Option<&Schema> {
        match complex.get("type") {
            Some(JsonValue::String(typ)) => {
                let name =
                    Name::new_with_enclosing_namespace(typ.as_str(), enclosing_namespace).ok()?;
                self.resolving_schemas
                    .get(&name)
                    .or_else(|| self.parsed_schemas.get(&name))
            }
            _ => None,
        }
    }

    fn parse_record(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
        is_error: bool,
    ) -> AvroResult<Schema> {
        let fields_opt = complex.get("fields");

        if fields_opt.is_none()
            && let Some(seen) = self.get_already_seen_schema(complex, enclosing_namespace)
        {
            return Ok(seen.clone());
        }

        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;
        self.register_resolving_schema(&fully_qualified_name)?;

        debug!("Going to parse record schema: {fully_qualified_name}");

        let fields: Vec<RecordField> = fields_opt
            .and_then(|fields| fields.as_array())
            .ok_or_else(|| crate::error::Error::new(Details::GetRecordFieldsJson))
            .and_then(|fields| {
                fields
                    .iter()
                    .filter_map(|field| field.as_object())
                    .map(|field| RecordField::parse(field, self, &fully_qualified_name))
                    .collect::<Result<_, _>>()
            })?;

        let mut lookup = BTreeMap::new();
        for (position, field) in fields.iter().enumerate() {
            if lookup.insert(field.name.clone(), position).is_some() {
                return Err(Details::FieldNameDuplicate(field.name.clone()).into());
            }
        }

        let schema = Schema::Record(RecordSchema {
            name: fully_qualified_name.clone(),
            doc: complex.doc(),
            fields,
            lookup,
            is_error,
            attributes: self.get_custom_attributes(complex, &["fields"]),
            fingerprints: Default::default(),
        });

        self.register_parsed_schema(&fully_qualified_name, &schema)?;
        Ok(schema)
    }

    fn parse_enum(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let symbols_opt = complex.get("symbols");

        if symbols_opt.is_none()
            && let Some(seen) = self.get_already_seen_schema(complex, enclosing_namespace)
        {
            return Ok(seen.clone());
        }

        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;

        let symbols: Vec<String> = symbols_opt
            .and_then(|v| v.as_array())
            .ok_or_else(|| crate::error::Error::new(Details::GetEnumSymbolsField))
            .and_then(|symbols| {
                symbols
                    .iter()
                    .map(|symbol| symbol.as_str().map(|s| s.to_string()))
                    .collect::<Option<_>>()
                    .ok_or_else(|| crate::error::Error::new(Details::GetEnumSymbols))
            })?;

        if symbols.is_empty() {
            return Err(Details::GetEnumSymbols.into());
        }

        let mut existing_symbols: HashSet<&String> = HashSet::with_capacity(symbols.len());
        for symbol in symbols.iter() {
            validate_enum_symbol_name(symbol)?;
            if !existing_symbols.insert(symbol) {
                return Err(Details::EnumSymbolDuplicate(symbol.to_string()).into());
            }
        }

        let default = match complex.get("default") {
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(value) => return Err(Details::EnumDefaultWrongType(value.clone()).into()),
            None => None,
        };
        if let Some(ref symbol) = default
            && !symbols.contains(symbol)
        {
            return Err(Details::EnumDefaultUnknownSymbol {
                symbol: symbol.clone(),
                symbols,
            }
            .into());
        }

        let schema = Schema::Enum(EnumSchema {
            name: fully_qualified_name.clone(),
            doc: complex.doc(),
            symbols,
            default,
            attributes: self.get_custom_attributes(complex, &["symbols", "default"]),
            fingerprints: Default::default(),
        });

        self.register_parsed_schema(&fully_qualified_name, &schema)?;
        Ok(schema)
    }

    fn parse_array(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let items = complex
            .get("items")
            .ok_or_else(|| crate::error::Error::new(Details::GetArrayItemsField))
            .and_then(|items| self.parse(items, enclosing_namespace))?;

        Ok(Schema::Array(ArraySchema {
            items: Box::new(items),
            attributes: self.get_custom_attributes(complex, &["items"]),
        }))
    }

    fn parse_map(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let values = complex
            .get("values")
            .ok_or_else(|| crate::error::Error::new(Details::GetMapValuesField))
            .and_then(|values| self.parse(values, enclosing_namespace))?;

        Ok(Schema::Map(MapSchema {
            values: Box::new(values),
            attributes: self.get_custom_attributes(complex, &["values"]),
        }))
    }

    fn parse_union(
        &mut self,
        items: &[JsonValue],
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let schemas = items
            .iter()
            .map(|v| self.parse(v, enclosing_namespace))
            .collect::<Result<Vec<_>, _>>()?;
        if schemas.len() == 1 {
            warn!("Union schema with just one member, consider dropping the union");
        }
        Ok(Schema::Union(UnionSchema::new(schemas)?))
    }

    fn parse_fixed(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Schema> {
        let size_opt = complex.get("size");
        if size_opt.is_none()
            && let Some(seen) = self.get_already_seen_schema(complex, enclosing_namespace)
        {
            return Ok(seen.clone());
        }

        let size = match size_opt {
            Some(size) => size
                .as_u64()
                .filter(|s| *s >= 1)
                .ok_or_else(|| Details::GetFixedSizeFieldPositive(size.clone())),
            None => Err(Details::GetFixedSizeField),
        }?;

        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;

        let schema = Schema::Fixed(FixedSchema {
            name: fully_qualified_name.clone(),
            doc: complex.doc(),
            size: size as usize,
            attributes: self.get_custom_attributes(complex, &["size"]),
            fingerprints: Default::default(),
        });

        self.register_parsed_schema(&fully_qualified_name, &schema)?;
        Ok(schema)
    }

    /// Everything except the recognized attributes goes into the property
    /// bag verbatim.
    fn get_custom_attributes(
        &self,
        complex: &Map<String, JsonValue>,
        excluded: &[&'static str],
    ) -> BTreeMap<String, JsonValue> {
        let mut custom_attributes: BTreeMap<String, JsonValue> = BTreeMap::new();
        for (key, value) in complex {
            match key.as_str() {
                "type" | "name" | "namespace" | "doc" | "logicalType" => continue,
                candidate if excluded.contains(&candidate) => continue,
                _ => custom_attributes.insert(key.clone(), value.clone()),
            };
        }
        custom_attributes
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{Details, Error};
    use crate::schema::{DecimalInner, DecimalSchema, Name, Schema};
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_primitive_names() {
        assert!(matches!(Schema::parse_str(r#""int""#).unwrap(), Schema::Int));
        assert!(matches!(
            Schema::parse_str(r#""string""#).unwrap(),
            Schema::String
        ));
    }

    #[test]
    fn unknown_type_name_fails() {
        match Schema::parse_str(r#""notatype""#).map_err(Error::into_details) {
            Err(Details::ParsePrimitive(name)) => assert_eq!(name, "notatype"),
            other => panic!("expected ParsePrimitive, got {other:?}"),
        }
    }

    #[test]
    fn array_requires_items() {
        match Schema::parse_str(r#"{"type": "array"}"#).map_err(Error::into_details) {
            Err(Details::GetArrayItemsField) => {}
            other => panic!("expected GetArrayItemsField, got {other:?}"),
        }
    }

    #[test]
    fn map_requires_values() {
        match Schema::parse_str(r#"{"type": "map"}"#).map_err(Error::into_details) {
            Err(Details::GetMapValuesField) => {}
            other => panic!("expected GetMapValuesField, got {other:?}"),
        }
    }

    #[test]
    fn fixed_requires_positive_size() {
        assert!(Schema::parse_str(r#"{"type": "fixed", "name": "f"}"#).is_err());
        assert!(Schema::parse_str(r#"{"type": "fixed", "name": "f", "size": 0}"#).is_err());
        assert!(Schema::parse_str(r#"{"type": "fixed", "name": "f", "size": -4}"#).is_err());
    }

    #[test]
    fn error_type_is_a_record() {
        let schema = Schema::parse_str(
            r#"{"type": "error", "name": "Oops", "fields": [{"name": "detail", "type": "string"}]}"#,
        )
        .unwrap();
        match schema {
            Schema::Record(record) => assert!(record.is_error),
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn recursive_record_parses() {
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
        let Schema::Record(record) = &schema else {
            panic!("expected a record");
        };
        let Schema::Union(union) = &record.fields[1].schema else {
            panic!("expected a union");
        };
        assert!(matches!(
            &union.variants()[1],
            Schema::Ref { name } if name.fullname() == "LongList"
        ));
    }

    #[test]
    fn namespaces_resolve_innermost_first() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "Outer",
                "namespace": "space",
                "fields": [
                    {"name": "id", "type": {"type": "fixed", "name": "Id", "size": 4}},
                    {"name": "again", "type": "Id"}
                ]
            }"#,
        )
        .unwrap();
        let Schema::Record(record) = &schema else {
            panic!("expected a record");
        };
        assert!(matches!(
            &record.fields[1].schema,
            Schema::Ref { name } if name.fullname() == "space.Id"
        ));
    }

    #[test]
    fn duplicate_names_within_a_root_are_rejected() {
        let err = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "A",
                "fields": [
                    {"name": "x", "type": {"type": "fixed", "name": "A", "size": 2}}
                ]
            }"#,
        )
        .map_err(Error::into_details);
        match err {
            Err(Details::AmbiguousSchemaDefinition(name)) => {
                assert_eq!(name, Name::new("A").unwrap())
            }
            other => panic!("expected AmbiguousSchemaDefinition, got {other:?}"),
        }
    }

    #[test]
    fn logical_types_parse() {
        assert!(matches!(
            Schema::parse_str(r#"{"type": "int", "logicalType": "date"}"#).unwrap(),
            Schema::Date
        ));
        assert!(matches!(
            Schema::parse_str(r#"{"type": "long", "logicalType": "timestamp-micros"}"#).unwrap(),
            Schema::TimestampMicros
        ));
        assert!(matches!(
            Schema::parse_str(r#"{"type": "string", "logicalType": "uuid"}"#).unwrap(),
            Schema::Uuid
        ));
    }

    #[test]
    fn logical_type_on_wrong_base_degrades() {
        // date is only valid over int
        assert!(matches!(
            Schema::parse_str(r#"{"type": "long", "logicalType": "date"}"#).unwrap(),
            Schema::Long
        ));
        // uuid is only valid over string
        assert!(matches!(
            Schema::parse_str(r#"{"type": "bytes", "logicalType": "uuid"}"#).unwrap(),
            Schema::Bytes
        ));
    }

    #[test]
    fn unknown_logical_type_degrades() {
        assert!(matches!(
            Schema::parse_str(r#"{"type": "string", "logicalType": "full-name"}"#).unwrap(),
            Schema::String
        ));
    }

    #[test]
    fn duration_requires_fixed_of_size_12() {
        assert!(matches!(
            Schema::parse_str(
                r#"{"type": "fixed", "name": "d", "size": 12, "logicalType": "duration"}"#
            )
            .unwrap(),
            Schema::Duration(_)
        ));
        // Any other size silently drops the annotation.
        assert!(matches!(
            Schema::parse_str(
                r#"{"type": "fixed", "name": "d", "size": 11, "logicalType": "duration"}"#
            )
            .unwrap(),
            Schema::Fixed(_)
        ));
    }

    #[test]
    fn decimal_parses_and_validates() {
        let schema = Schema::parse_str(
            r#"{"type": "bytes", "logicalType": "decimal", "precision": 4, "scale": 2}"#,
        )
        .unwrap();
        match schema {
            Schema::Decimal(DecimalSchema {
                precision,
                scale,
                inner: DecimalInner::Bytes,
            }) => {
                assert_eq!(precision, 4);
                assert_eq!(scale, 2);
            }
            other => panic!("expected a decimal, got {other:?}"),
        }

        // scale defaults to zero
        let schema = Schema::parse_str(
            r#"{"type": "bytes", "logicalType": "decimal", "precision": 4}"#,
        )
        .unwrap();
        assert!(matches!(
            schema,
            Schema::Decimal(DecimalSchema { scale: 0, .. })
        ));
    }

    #[test]
    fn invalid_decimal_degrades_to_base() {
        // scale > precision
        assert!(matches!(
            Schema::parse_str(
                r#"{"type": "bytes", "logicalType": "decimal", "precision": 2, "scale": 3}"#
            )
            .unwrap(),
            Schema::Bytes
        ));
        // precision exceeding what 2 bytes can represent (4 > 4 digits? 2
        // bytes hold up to 32767, i.e. 4 full digits)
        assert!(matches!(
            Schema::parse_str(
                r#"{"type": "fixed", "name": "d", "size": 2, "logicalType": "decimal", "precision": 5}"#
            )
            .unwrap(),
            Schema::Fixed(_)
        ));
    }

    #[test]
    fn nested_unions_fail_to_parse() {
        assert!(Schema::parse_str(r#"[["null", "int"], "string"]"#).is_err());
    }

    #[test]
    fn parse_list_resolves_cross_references() {
        let schemas = Schema::parse_list([
            r#"{"type": "record", "name": "A", "fields": [{"name": "b", "type": "B"}]}"#,
            r#"{"type": "fixed", "name": "B", "size": 2}"#,
        ])
        .unwrap();
        assert_eq!(schemas.len(), 2);
        let Schema::Record(record) = &schemas[0] else {
            panic!("expected a record");
        };
        assert!(matches!(
            &record.fields[0].schema,
            Schema::Ref { name } if name.fullname() == "B"
        ));
    }
}
