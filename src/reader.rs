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

//! Reading Avro object container files.

use crate::codec::Codec;
use crate::error::{Details, Error};
use crate::resolver::{default_resolver, DecodePlan, Shape};
use crate::rw;
use crate::schema::Schema;
use crate::util::safe_len;
use crate::value::Value;
use crate::AvroResult;
use log::debug;
use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;
use std::sync::Arc;

const AVRO_OBJECT_HEADER: &[u8] = b"Obj\x01";

/// Streaming reader for the Avro object container file format.
///
/// Drive it with [`has_next`](Self::has_next) / [`decode`](Self::decode), or
/// use it as an `Iterator`:
///
/// ```no_run
/// # use avrolite::Reader;
/// # use std::io::Cursor;
/// # let input = Cursor::new(Vec::<u8>::new());
/// for value in Reader::new(input).unwrap() {
///     match value {
///         Ok(v) => println!("{v:?}"),
///         Err(e) => println!("Error: {e}"),
///     };
/// }
/// ```
///
/// Block header failures, decompression failures and sync marker mismatches
/// park a sticky error: `has_next` then answers `false` and
/// [`error`](Self::error) carries the cause.
pub struct Reader<R: Read> {
    reader: R,
    schema: Schema,
    plan: Arc<DecodePlan>,
    codec: Codec,
    marker: [u8; 16],
    metadata: HashMap<String, Vec<u8>>,
    block: Vec<u8>,
    block_pos: usize,
    remaining: i64,
    err: Option<Error>,
    primed: bool,
    finished: bool,
}

impl<R: Read> Reader<R> {
    /// Opens a container stream, reading and validating the header.
    pub fn new(mut reader: R) -> AvroResult<Self> {
        let (metadata, marker) = read_header(&mut reader)?;

        let schema_json = metadata
            .get("avro.schema")
            .ok_or(Details::GetHeaderMetadata("avro.schema"))?;
        let schema_json = std::str::from_utf8(schema_json)
            .map_err(|_| Details::GetHeaderMetadata("avro.schema"))?;
        let schema = Schema::parse_str(schema_json)?;

        let codec = match metadata.get("avro.codec") {
            None => Codec::Null,
            Some(raw) => {
                let name = std::str::from_utf8(raw)
                    .map_err(|_| Details::GetHeaderMetadata("avro.codec"))?;
                Codec::from_str(name)
                    .map_err(|_| Details::CodecNotSupported(name.to_string()))?
            }
        };
        debug!("container header: codec {codec:?}");

        let plan = default_resolver().decoder(&schema, &Shape::Dynamic)?;
        Ok(Reader {
            reader,
            schema,
            plan,
            codec,
            marker,
            metadata,
            block: Vec::new(),
            block_pos: 0,
            remaining: 0,
            err: None,
            primed: false,
            finished: false,
        })
    }

    /// The writer schema embedded in the header.
    pub fn writer_schema(&self) -> &Schema {
        &self.schema
    }

    /// The parsed header metadata, `avro.`-prefixed entries included.
    pub fn metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.metadata
    }

    /// The sticky error, if loading a block has failed.
    pub fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Returns `true` while records remain in the current block or another
    /// valid block can be loaded, lazily fetching and decompressing the next
    /// block on exhaustion.
    pub fn has_next(&mut self) -> bool {
        if self.err.is_some() || self.finished {
            return false;
        }
        if self.remaining > 0 {
            self.primed = true;
            return true;
        }
        match self.load_block() {
            Ok(true) => {
                self.primed = true;
                true
            }
            Ok(false) => {
                self.finished = true;
                false
            }
            Err(e) => {
                self.err = Some(e);
                false
            }
        }
    }

    /// Decodes the record a preceding successful [`has_next`](Self::has_next)
    /// promised. Calling out of order is a protocol violation.
    pub fn decode(&mut self) -> AvroResult<Value> {
        if !self.primed {
            return Err(Details::DecodeWithoutHasNext.into());
        }
        self.primed = false;

        let mut datum = &self.block[self.block_pos..];
        let available = datum.len();
        let mut r = rw::Reader::new(&mut datum);
        let value = self.plan.decode(&mut r)?;
        self.block_pos += available - datum.len();
        self.remaining -= 1;
        Ok(value)
    }

    /// Loads and decompresses the next block. `Ok(false)` is a clean end of
    /// stream.
    fn load_block(&mut self) -> AvroResult<bool> {
        // Distinguish a clean end of stream from a torn block header: only
        // an EOF before the first byte of the count is clean.
        let mut first = [0u8; 1];
        loop {
            match self.reader.read(&mut first) {
                Ok(0) => return Ok(false),
                Ok(_) => break,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Details::ReadFailed(e).into()),
            }
        }

        let (count, byte_len) = {
            let mut src = first.as_slice().chain(&mut self.reader);
            let mut r = rw::Reader::new(&mut src);
            let count = r.read_long();
            let byte_len = r.read_long();
            r.check()?;
            (count, byte_len)
        };
        if count < 0 {
            return Err(Details::NegativeBlockField("count").into());
        }
        if byte_len < 0 {
            return Err(Details::NegativeBlockField("size").into());
        }
        safe_len(byte_len as usize)?;

        let mut payload = vec![0u8; byte_len as usize];
        self.reader
            .read_exact(&mut payload)
            .map_err(Details::ReadFailed)?;

        let mut marker = [0u8; 16];
        self.reader
            .read_exact(&mut marker)
            .map_err(Details::ReadFailed)?;
        if marker != self.marker {
            return Err(Details::GetBlockMarker.into());
        }

        self.codec.decompress(&mut payload)?;
        self.block = payload;
        self.block_pos = 0;
        self.remaining = count;
        Ok(true)
    }
}

impl<R: Read> Iterator for Reader<R> {
    type Item = AvroResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_next() {
            Some(self.decode())
        } else {
            // surface the sticky error once, then end the iteration
            self.err.take().map(Err)
        }
    }
}

fn read_header(reader: &mut dyn Read) -> AvroResult<(HashMap<String, Vec<u8>>, [u8; 16])> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).map_err(Details::ReadHeader)?;
    if magic != AVRO_OBJECT_HEADER {
        return Err(Details::HeaderMagic.into());
    }

    let mut metadata = HashMap::new();
    let mut r = rw::Reader::new(reader);
    loop {
        let (count, _) = r.read_map_header();
        if count == 0 || r.error().is_some() {
            break;
        }
        for _ in 0..count {
            if r.error().is_some() {
                break;
            }
            let key = r.read_string();
            let value = r.read_bytes();
            metadata.insert(key, value);
        }
    }
    let marker_bytes = r.read_fixed(16);
    r.check()?;

    let mut marker = [0u8; 16];
    marker.copy_from_slice(&marker_bytes);
    Ok((metadata, marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Codec;
    use crate::value::Record;
    use crate::writer::Writer;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"
        {
            "type": "record",
            "name": "test",
            "fields": [
                {"name": "a", "type": "long", "default": 42},
                {"name": "b", "type": "string"}
            ]
        }
    "#;

    fn container_with(values: &[(i64, &str)], codec: Codec, block_length: usize) -> Vec<u8> {
        let schema = Schema::parse_str(SCHEMA).unwrap();
        let mut writer = Writer::builder()
            .schema(&schema)
            .writer(Vec::new())
            .codec(codec)
            .block_length(block_length)
            .build()
            .unwrap();
        for (a, b) in values {
            let mut record = Record::new(&schema).unwrap();
            record.put("a", *a);
            record.put("b", *b);
            writer.append(record).unwrap();
        }
        writer.into_inner().unwrap()
    }

    fn expected_record(a: i64, b: &str) -> Value {
        Value::Record(vec![
            ("a".to_string(), Value::Long(a)),
            ("b".to_string(), Value::String(b.to_string())),
        ])
    }

    #[test]
    fn round_trips_across_multiple_blocks() {
        let input = container_with(&[(27, "foo"), (42, "bar"), (3, "baz")], Codec::Null, 2);
        let reader = Reader::new(&input[..]).unwrap();
        let values: Vec<Value> = reader.map(|v| v.unwrap()).collect();
        assert_eq!(
            values,
            vec![
                expected_record(27, "foo"),
                expected_record(42, "bar"),
                expected_record(3, "baz"),
            ]
        );
    }

    #[test]
    fn deflate_round_trips() {
        let input = container_with(&[(27, "foo"), (42, "bar")], Codec::Deflate, 100);
        let reader = Reader::new(&input[..]).unwrap();
        let values: Vec<Value> = reader.map(|v| v.unwrap()).collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], expected_record(27, "foo"));
    }

    #[test]
    fn metadata_carries_schema_and_codec() {
        let input = container_with(&[(1, "x")], Codec::Deflate, 100);
        let reader = Reader::new(&input[..]).unwrap();
        assert_eq!(
            reader.metadata().get("avro.codec").map(Vec::as_slice),
            Some(&b"deflate"[..])
        );
        assert!(reader.metadata().contains_key("avro.schema"));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let input = b"NotAvroFile".to_vec();
        match Reader::new(&input[..]).map(|_| ()).unwrap_err().into_details() {
            Details::HeaderMagic => {}
            other => panic!("expected HeaderMagic, got {other:?}"),
        }
    }

    #[test]
    fn flipped_sync_marker_is_fatal() {
        let schema = Schema::parse_str(SCHEMA).unwrap();
        let mut writer = Writer::new(&schema, Vec::new()).unwrap();
        let mut record = Record::new(&schema).unwrap();
        record.put("a", 27i64);
        record.put("b", "foo");
        writer.append(record).unwrap();
        let mut input = writer.into_inner().unwrap();

        // flip one bit of the block-trailing sync marker
        let last = input.len() - 1;
        input[last] ^= 0x80;

        let mut reader = Reader::new(&input[..]).unwrap();
        assert!(!reader.has_next());
        match reader.error().map(Error::details) {
            Some(Details::GetBlockMarker) => {}
            other => panic!("expected GetBlockMarker, got {other:?}"),
        }
    }

    #[test]
    fn decode_without_has_next_is_a_protocol_violation() {
        let input = container_with(&[(1, "x")], Codec::Null, 100);
        let mut reader = Reader::new(&input[..]).unwrap();
        match reader.decode().unwrap_err().into_details() {
            Details::DecodeWithoutHasNext => {}
            other => panic!("expected DecodeWithoutHasNext, got {other:?}"),
        }
        assert!(reader.has_next());
        reader.decode().unwrap();
        assert!(!reader.has_next());
    }

    #[test]
    fn unknown_codec_is_rejected() {
        // hand-build a header advertising an unsupported codec
        let mut header = rw::Writer::new();
        header.write_fixed(b"Obj\x01");
        header.write_block_header(2);
        header.write_string("avro.schema");
        header.write_bytes(br#""long""#);
        header.write_string("avro.codec");
        header.write_bytes(b"zstandard");
        header.write_block_header(0);
        header.write_fixed(&[0u8; 16]);
        let input = header.into_inner();

        match Reader::new(&input[..]).map(|_| ()).unwrap_err().into_details() {
            Details::CodecNotSupported(name) => assert_eq!(name, "zstandard"),
            other => panic!("expected CodecNotSupported, got {other:?}"),
        }
    }
}
