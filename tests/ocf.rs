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

//! End-to-end object container file scenarios.

use avrolite::error::Details;
use avrolite::value::{Record, Value};
use avrolite::{Codec, Reader, Schema, Writer};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

type TestResult = anyhow::Result<()>;

const FULL_RECORD_SCHEMA: &str = r#"
    {
        "type": "record",
        "name": "FullRecord",
        "namespace": "org.example",
        "fields": [
            {"name": "strings", "type": {"type": "array", "items": "string"}},
            {"name": "longs", "type": {"type": "map", "values": "long"}},
            {"name": "enabled", "type": "boolean"},
            {"name": "ratio", "type": "double"},
            {"name": "label", "type": ["null", "string"]},
            {"name": "suit", "type": {"type": "enum", "name": "Suit", "symbols": ["spades", "hearts"]}},
            {"name": "id", "type": {"type": "fixed", "name": "Id", "size": 4}}
        ]
    }
"#;

fn full_record(schema: &Schema, label: Option<&str>) -> Value {
    let mut longs = HashMap::new();
    longs.insert("x".to_string(), Value::Long(9));

    let mut record = Record::new(schema).unwrap();
    record.put(
        "strings",
        Value::Array(vec![Value::String("one".into()), Value::String("two".into())]),
    );
    record.put("longs", Value::Map(longs));
    record.put("enabled", true);
    record.put("ratio", 0.25f64);
    record.put("label", label.map(Value::from).unwrap_or(Value::Null));
    record.put("suit", Value::Enum(1, "hearts".into()));
    record.put("id", Value::Fixed(4, vec![1, 2, 3, 4]));
    record.into()
}

fn read_all(input: &[u8]) -> Vec<Value> {
    Reader::new(input)
        .unwrap()
        .map(|value| value.unwrap())
        .collect()
}

#[test]
fn full_record_round_trips_with_deflate() -> TestResult {
    let schema = Schema::parse_str(FULL_RECORD_SCHEMA)?;
    let mut writer = Writer::with_codec(&schema, Vec::new(), Codec::Deflate)?;
    writer.append_ref(&full_record(&schema, Some("tagged")))?;
    let input = writer.into_inner()?;

    let mut reader = Reader::new(&input[..])?;
    assert!(reader.has_next());
    let decoded = reader.decode()?;

    let Value::Record(fields) = &decoded else {
        panic!("expected a record");
    };
    assert_eq!(fields[2], ("enabled".to_string(), Value::Boolean(true)));
    assert_eq!(
        fields[4],
        ("label".to_string(), Value::String("tagged".to_string()))
    );
    assert_eq!(
        fields[5],
        ("suit".to_string(), Value::Enum(1, "hearts".to_string()))
    );
    assert_eq!(decoded, full_record(&schema, Some("tagged")));
    assert!(!reader.has_next());
    Ok(())
}

#[test]
fn full_record_round_trips_with_snappy() -> TestResult {
    let schema = Schema::parse_str(FULL_RECORD_SCHEMA)?;
    let mut writer = Writer::with_codec(&schema, Vec::new(), Codec::Snappy)?;
    for i in 0..10 {
        writer.append_ref(&full_record(&schema, if i % 2 == 0 { None } else { Some("x") }))?;
    }
    let input = writer.into_inner()?;

    let values = read_all(&input);
    assert_eq!(values.len(), 10);
    assert_eq!(values[1], full_record(&schema, Some("x")));
    assert_eq!(values[2], full_record(&schema, None));
    Ok(())
}

#[test]
fn block_count_is_records_over_block_length() -> TestResult {
    let schema = Schema::parse_str(r#"{"type": "record", "name": "r", "fields": [{"name": "n", "type": "long"}]}"#)?;

    let records = 7usize;
    let block_length = 3usize;
    let mut writer = Writer::builder()
        .schema(&schema)
        .writer(Vec::new())
        .block_length(block_length)
        .build()?;
    let marker = writer.marker();
    for i in 0..records {
        let mut record = Record::new(&schema).unwrap();
        record.put("n", i as i64);
        writer.append(record)?;
    }
    let input = writer.into_inner()?;

    // ceil(7 / 3) = 3 blocks, each closed by the sync marker
    let occurrences = input
        .windows(16)
        .filter(|window| *window == marker)
        .count();
    assert_eq!(occurrences, records.div_ceil(block_length) + 1); // + the header marker

    let values = read_all(&input);
    assert_eq!(values.len(), records);
    assert_eq!(
        values[6],
        Value::Record(vec![("n".to_string(), Value::Long(6))])
    );
    Ok(())
}

#[test]
fn corrupted_sync_after_block_zero_is_fatal_on_the_next_has_next() -> TestResult {
    let schema = Schema::parse_str(r#"{"type": "record", "name": "r", "fields": [{"name": "n", "type": "long"}]}"#)?;
    let mut writer = Writer::builder()
        .schema(&schema)
        .writer(Vec::new())
        .block_length(1)
        .build()?;
    for i in 0..2i64 {
        let mut record = Record::new(&schema).unwrap();
        record.put("n", i);
        writer.append(record)?;
    }
    let mut input = writer.into_inner()?;

    // flip one bit in the sync marker closing block 1 (the trailing one)
    let last = input.len() - 1;
    input[last] ^= 0x01;

    let mut reader = Reader::new(&input[..])?;
    assert!(reader.has_next());
    assert_eq!(
        reader.decode()?,
        Value::Record(vec![("n".to_string(), Value::Long(0))])
    );
    // loading the corrupted block fails
    assert!(!reader.has_next());
    assert!(matches!(
        reader.error().map(avrolite::Error::details),
        Some(Details::GetBlockMarker)
    ));
    Ok(())
}

#[test]
fn user_metadata_round_trips() -> TestResult {
    let schema = Schema::parse_str(r#""long""#)?;
    let mut metadata = HashMap::new();
    metadata.insert("pipeline".to_string(), b"ingest-v2".to_vec());

    let mut writer = Writer::builder()
        .schema(&schema)
        .writer(Vec::new())
        .user_metadata(metadata)
        .build()?;
    writer.append(Value::Long(5))?;
    let input = writer.into_inner()?;

    let reader = Reader::new(&input[..])?;
    assert_eq!(
        reader.metadata().get("pipeline").map(Vec::as_slice),
        Some(&b"ingest-v2"[..])
    );
    assert_eq!(*reader.writer_schema(), Schema::Long);
    Ok(())
}

#[test]
fn append_to_an_existing_container() -> TestResult {
    let schema = Schema::parse_str(r#""long""#)?;
    let mut writer = Writer::new(&schema, Vec::new())?;
    let marker = writer.marker();
    writer.append(Value::Long(1))?;
    let first = writer.into_inner()?;

    // continue the same stream with the marker from its header
    let mut appender = Writer::append_to(&schema, first, Codec::Null, marker)?;
    appender.append(Value::Long(2))?;
    let combined = appender.into_inner()?;

    let values = read_all(&combined);
    assert_eq!(values, vec![Value::Long(1), Value::Long(2)]);
    Ok(())
}

#[test]
fn empty_container_yields_no_values() -> TestResult {
    let schema = Schema::parse_str(r#""long""#)?;
    let writer = Writer::new(&schema, Vec::new())?;
    let input = writer.into_inner()?;

    let mut reader = Reader::new(&input[..])?;
    assert!(!reader.has_next());
    assert!(reader.error().is_none());
    Ok(())
}
