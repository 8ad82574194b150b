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

//! Resolving codec plans against typed host shapes.

use avrolite::error::Details;
use avrolite::resolver::{Resolver, Shape, ShapeRegistry};
use avrolite::rw;
use avrolite::value::Value;
use avrolite::Schema;
use pretty_assertions::assert_eq;

type TestResult = anyhow::Result<()>;

const PERSON_SCHEMA: &str = r#"
    {
        "type": "record",
        "name": "Person",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "age", "type": "int"},
            {"name": "email", "type": ["null", "string"]}
        ]
    }
"#;

fn person_shape() -> Shape {
    Shape::record(
        "Person",
        [
            ("name", Shape::Str),
            ("age", Shape::Int32),
            ("email", Shape::optional(Shape::Str)),
        ],
    )
}

fn encode_with(resolver: &Resolver, schema: &Schema, shape: &Shape, value: &Value) -> Vec<u8> {
    let plan = resolver.encoder(schema, shape).unwrap();
    let mut out = rw::Writer::new();
    plan.encode(value, &mut out).unwrap();
    out.into_inner()
}

#[test]
fn struct_shape_binds_by_field_name() -> TestResult {
    let schema = Schema::parse_str(PERSON_SCHEMA)?;
    let resolver = Resolver::with_registry(ShapeRegistry::new());
    let shape = person_shape();

    let value = Value::Record(vec![
        ("name".to_string(), Value::String("ada".to_string())),
        ("age".to_string(), Value::Int(36)),
        ("email".to_string(), Value::Null),
    ]);
    let bytes = encode_with(&resolver, &schema, &shape, &value);

    let plan = resolver.decoder(&schema, &shape)?;
    let mut src = &bytes[..];
    let mut reader = rw::Reader::new(&mut src);
    assert_eq!(plan.decode(&mut reader)?, value);
    Ok(())
}

#[test]
fn plans_are_cached_per_schema_and_shape() -> TestResult {
    let schema = Schema::parse_str(PERSON_SCHEMA)?;
    let resolver = Resolver::with_registry(ShapeRegistry::new());

    let first = resolver.encoder(&schema, &person_shape())?;
    let again = resolver.encoder(&schema, &person_shape())?;
    assert!(std::sync::Arc::ptr_eq(&first, &again));

    // a different shape resolves a different plan
    let dynamic = resolver.encoder(&schema, &Shape::Dynamic)?;
    assert!(!std::sync::Arc::ptr_eq(&first, &dynamic));
    Ok(())
}

#[test]
fn missing_host_field_is_skipped_on_decode() -> TestResult {
    let schema = Schema::parse_str(PERSON_SCHEMA)?;
    let resolver = Resolver::with_registry(ShapeRegistry::new());

    // encode the full record dynamically
    let full = Value::Record(vec![
        ("name".to_string(), Value::String("ada".to_string())),
        ("age".to_string(), Value::Int(36)),
        ("email".to_string(), Value::String("ada@example.com".to_string())),
    ]);
    let bytes = encode_with(&resolver, &schema, &Shape::Dynamic, &full);

    // a narrower host type knows nothing about "age" or "email"
    let narrow = Shape::record("Person", [("name", Shape::Str)]);
    let plan = resolver.decoder(&schema, &narrow)?;
    let mut src = &bytes[..];
    let mut reader = rw::Reader::new(&mut src);
    assert_eq!(
        plan.decode(&mut reader)?,
        Value::Record(vec![("name".to_string(), Value::String("ada".to_string()))])
    );
    // the skipped fields were fully consumed
    assert!(src.is_empty());
    Ok(())
}

#[test]
fn missing_host_field_without_default_fails_resolution() -> TestResult {
    let schema = Schema::parse_str(PERSON_SCHEMA)?;
    let resolver = Resolver::with_registry(ShapeRegistry::new());

    let narrow = Shape::record("Person", [("name", Shape::Str)]);
    match resolver.encoder(&schema, &narrow).map(|_| ()).unwrap_err().into_details() {
        Details::MissingFieldNoDefault { field } => assert_eq!(field, "age"),
        other => panic!("expected MissingFieldNoDefault, got {other:?}"),
    }
    Ok(())
}

#[test]
fn missing_host_field_with_default_encodes_it() -> TestResult {
    let schema = Schema::parse_str(
        r#"{
            "type": "record",
            "name": "Versioned",
            "fields": [
                {"name": "n", "type": "long"},
                {"name": "version", "type": "int", "default": 7}
            ]
        }"#,
    )?;
    let resolver = Resolver::with_registry(ShapeRegistry::new());
    let narrow = Shape::record("Versioned", [("n", Shape::Int64)]);

    let value = Value::Record(vec![("n".to_string(), Value::Long(1))]);
    let bytes = encode_with(&resolver, &schema, &narrow, &value);
    // long 1, then the default int 7
    assert_eq!(bytes, vec![0x02, 0x0e]);
    Ok(())
}

#[test]
fn optional_shape_requires_a_simple_nullable_union() -> TestResult {
    let schema = Schema::parse_str(r#"["null", "string", "int"]"#)?;
    let resolver = Resolver::with_registry(ShapeRegistry::new());

    let result = resolver.encoder(&schema, &Shape::optional(Shape::Str)).map(|_| ());
    assert!(matches!(
        result.unwrap_err().into_details(),
        Details::NoCodec { .. }
    ));
    Ok(())
}

#[test]
fn mismatched_pairs_resolve_to_error_plans() -> TestResult {
    let schema = Schema::parse_str(r#""long""#)?;
    let resolver = Resolver::with_registry(ShapeRegistry::new());

    // resolution itself never fails for a table miss
    let plan = resolver.encoder(&schema, &Shape::Str)?;
    let mut out = rw::Writer::new();
    let err = plan.encode(&Value::String("x".into()), &mut out).unwrap_err();
    assert!(matches!(err.into_details(), Details::NoCodec { .. }));
    assert!(out.is_empty());
    Ok(())
}

#[test]
fn named_shapes_express_recursive_hosts() -> TestResult {
    let schema = Schema::parse_str(
        r#"{
            "type": "record",
            "name": "LongList",
            "fields": [
                {"name": "value", "type": "long"},
                {"name": "next", "type": ["null", "LongList"]}
            ]
        }"#,
    )?;

    let registry = ShapeRegistry::new();
    registry.register(
        "LongList",
        Shape::record(
            "LongList",
            [
                ("value", Shape::Int64),
                ("next", Shape::optional(Shape::Named("LongList".to_string()))),
            ],
        ),
    );
    let resolver = Resolver::with_registry(registry);
    let shape = Shape::Named("LongList".to_string());

    fn node(value: i64, next: Value) -> Value {
        Value::Record(vec![
            ("value".to_string(), Value::Long(value)),
            ("next".to_string(), next),
        ])
    }
    let list = node(1, node(2, Value::Null));

    let bytes = encode_with(&resolver, &schema, &shape, &list);
    // 1, branch 1, 2, branch 0
    assert_eq!(bytes, vec![0x02, 0x02, 0x04, 0x00]);

    let plan = resolver.decoder(&schema, &shape)?;
    let mut src = &bytes[..];
    let mut reader = rw::Reader::new(&mut src);
    assert_eq!(plan.decode(&mut reader)?, list);
    Ok(())
}

#[test]
fn registry_breaks_union_record_ambiguity() -> TestResult {
    let schema = Schema::parse_str(
        r#"[
            {"type": "record", "name": "Point", "fields": [
                {"name": "x", "type": "long"}, {"name": "y", "type": "long"}]},
            {"type": "record", "name": "Label", "fields": [
                {"name": "text", "type": "string"}]}
        ]"#,
    )?;

    let registry = ShapeRegistry::new();
    registry.register(
        "Label",
        Shape::record("Label", [("text", Shape::Str)]),
    );
    let resolver = Resolver::with_registry(registry);

    let label = Value::Record(vec![("text".to_string(), Value::String("hi".to_string()))]);
    let bytes = encode_with(&resolver, &schema, &Shape::Dynamic, &label);
    // member index 1, then the string
    assert_eq!(bytes, vec![0x02, 0x04, 0x68, 0x69]);
    Ok(())
}

#[test]
fn unregistered_named_shape_fails_resolution() -> TestResult {
    let schema = Schema::parse_str(r#""long""#)?;
    let resolver = Resolver::with_registry(ShapeRegistry::new());
    match resolver
        .encoder(&schema, &Shape::Named("Nowhere".to_string()))
        .map(|_| ())
        .unwrap_err()
        .into_details()
    {
        Details::UnregisteredShapeName(name) => assert_eq!(name, "Nowhere"),
        other => panic!("expected UnregisteredShapeName, got {other:?}"),
    }
    Ok(())
}

#[test]
fn numeric_hosts_widen_and_truncate_on_encode() -> TestResult {
    let resolver = Resolver::with_registry(ShapeRegistry::new());

    // an i32 host widens onto a long schema
    let long_schema = Schema::parse_str(r#""long""#)?;
    let bytes = encode_with(&resolver, &long_schema, &Shape::Int32, &Value::Int(27));
    assert_eq!(bytes, vec![0x36]);

    // an f32 host widens onto a double schema
    let double_schema = Schema::parse_str(r#""double""#)?;
    let plan = resolver.encoder(&double_schema, &Shape::Float32)?;
    let mut out = rw::Writer::new();
    plan.encode(&Value::Float(0.5), &mut out)?;
    assert_eq!(out.into_inner(), 0.5f64.to_le_bytes());

    // an f64 host truncates onto a long schema
    let bytes = encode_with(&resolver, &long_schema, &Shape::Float64, &Value::Double(27.9));
    assert_eq!(bytes, vec![0x36]);
    Ok(())
}
