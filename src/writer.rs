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

//! Writing Avro object container files.

use crate::codec::Codec;
use crate::error::Details;
use crate::resolver::{default_resolver, EncodePlan, Shape};
use crate::rw;
use crate::schema::Schema;
use crate::value::Value;
use crate::AvroResult;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

const AVRO_OBJECT_HEADER: &[u8] = b"Obj\x01";
/// Records per block before an automatic flush.
const DEFAULT_BLOCK_LENGTH: usize = 100;

fn generate_sync_marker() -> [u8; 16] {
    rand::random()
}

/// Streaming writer for the Avro object container file format.
///
/// Encoded records are buffered in memory; whenever the per-block record
/// count reaches the configured block length the block is compressed and
/// framed out. Call [`flush`](Self::flush) or [`into_inner`](Self::into_inner)
/// to write any partial block; dropping an unflushed writer loses the
/// buffered records.
pub struct Writer<'a, W: Write> {
    schema: &'a Schema,
    writer: W,
    plan: Arc<EncodePlan>,
    codec: Codec,
    block_length: usize,
    buffer: rw::Writer,
    num_values: usize,
    marker: [u8; 16],
    has_header: bool,
    user_metadata: HashMap<String, Vec<u8>>,
    poisoned: bool,
}

#[bon::bon]
impl<'a, W: Write> Writer<'a, W> {
    #[builder(finish_fn = build)]
    pub fn builder(
        schema: &'a Schema,
        writer: W,
        #[builder(default = Codec::Null)] codec: Codec,
        /// Maximum number of records per block.
        #[builder(default = DEFAULT_BLOCK_LENGTH)]
        block_length: usize,
        #[builder(default = generate_sync_marker())] marker: [u8; 16],
        /// Set to `true` when appending to a stream that already carries a
        /// header; the `marker` must then be the one from that header.
        #[builder(default = false)]
        has_header: bool,
        /// Extra metadata for the header. Keys prefixed `avro.` are
        /// reserved for the format and rejected.
        #[builder(default)]
        user_metadata: HashMap<String, Vec<u8>>,
    ) -> AvroResult<Self> {
        for key in user_metadata.keys() {
            if key.starts_with("avro.") {
                return Err(Details::ReservedMetadataKey(key.clone()).into());
            }
        }
        let plan = default_resolver().encoder(schema, &Shape::Dynamic)?;
        Ok(Self {
            schema,
            writer,
            plan,
            codec,
            block_length,
            buffer: rw::Writer::new(),
            num_values: 0,
            marker,
            has_header,
            user_metadata,
            poisoned: false,
        })
    }
}

impl<'a, W: Write> Writer<'a, W> {
    /// Creates a `Writer` with no compression.
    pub fn new(schema: &'a Schema, writer: W) -> AvroResult<Self> {
        Writer::with_codec(schema, writer, Codec::Null)
    }

    /// Creates a `Writer` with a specific compression `Codec`.
    pub fn with_codec(schema: &'a Schema, writer: W, codec: Codec) -> AvroResult<Self> {
        Self::builder().schema(schema).writer(writer).codec(codec).build()
    }

    /// Creates a `Writer` that appends blocks to an already populated
    /// container stream, using the sync `marker` from its header.
    pub fn append_to(
        schema: &'a Schema,
        writer: W,
        codec: Codec,
        marker: [u8; 16],
    ) -> AvroResult<Self> {
        Self::builder()
            .schema(schema)
            .writer(writer)
            .codec(codec)
            .marker(marker)
            .has_header(true)
            .build()
    }

    /// The schema this writer encodes against.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// The sync marker written after every block.
    pub fn marker(&self) -> [u8; 16] {
        self.marker
    }

    /// Appends one value, returning the number of bytes written to the
    /// underlying sink (0 unless a block was flushed).
    ///
    /// The first encode error poisons the writer: the partially written
    /// record is dropped from the block and every later call fails.
    pub fn append(&mut self, value: impl Into<Value>) -> AvroResult<usize> {
        self.append_ref(&value.into())
    }

    /// Like [`append`](Self::append), without taking ownership of the value.
    pub fn append_ref(&mut self, value: &Value) -> AvroResult<usize> {
        if self.poisoned {
            return Err(Details::WriterPoisoned.into());
        }
        let written = self.maybe_write_header()?;

        let record_start = self.buffer.len();
        if let Err(e) = self.plan.encode(value, &mut self.buffer) {
            self.buffer.truncate(record_start);
            self.poisoned = true;
            return Err(e);
        }
        self.num_values += 1;

        if self.num_values >= self.block_length {
            return Ok(written + self.flush_block()?);
        }
        Ok(written)
    }

    /// Appends every value of an iterator and flushes.
    pub fn extend<T: Into<Value>>(
        &mut self,
        values: impl IntoIterator<Item = T>,
    ) -> AvroResult<usize> {
        let mut num_bytes = 0;
        for value in values {
            num_bytes += self.append(value)?;
        }
        num_bytes += self.flush()?;
        Ok(num_bytes)
    }

    /// Writes the header if needed and flushes any partial block through to
    /// the sink. Returns the number of bytes written.
    pub fn flush(&mut self) -> AvroResult<usize> {
        let mut num_bytes = self.maybe_write_header()?;
        num_bytes += self.flush_block()?;
        self.writer.flush().map_err(Details::FlushWriter)?;
        Ok(num_bytes)
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(mut self) -> AvroResult<W> {
        self.flush()?;
        Ok(self.writer)
    }

    fn maybe_write_header(&mut self) -> AvroResult<usize> {
        if self.has_header {
            return Ok(0);
        }

        let schema_json = serde_json::to_string(self.schema)
            .map_err(Details::ParseSchemaJson)?;

        let mut header = rw::Writer::new();
        header.write_fixed(AVRO_OBJECT_HEADER);
        header.write_block_header(2 + self.user_metadata.len());
        header.write_string("avro.schema");
        header.write_bytes(schema_json.as_bytes());
        header.write_string("avro.codec");
        header.write_bytes(<&str>::from(self.codec).as_bytes());
        for (key, value) in &self.user_metadata {
            header.write_string(key);
            header.write_bytes(value);
        }
        header.write_block_header(0);
        header.write_fixed(&self.marker);

        let written = header.flush_to(&mut self.writer)?;
        self.has_header = true;
        Ok(written)
    }

    fn flush_block(&mut self) -> AvroResult<usize> {
        if self.num_values == 0 {
            return Ok(0);
        }

        let mut payload = std::mem::take(&mut self.buffer).into_inner();
        self.codec.compress(&mut payload)?;

        let mut framing = rw::Writer::new();
        framing.write_long(length_as_long(self.num_values)?);
        framing.write_long(length_as_long(payload.len())?);
        let mut written = framing.flush_to(&mut self.writer)?;

        self.writer
            .write_all(&payload)
            .map_err(Details::WriteBytes)?;
        self.writer
            .write_all(&self.marker)
            .map_err(Details::WriteBytes)?;
        written += payload.len() + self.marker.len();

        self.num_values = 0;
        Ok(written)
    }
}

fn length_as_long(len: usize) -> AvroResult<i64> {
    i64::try_from(len).map_err(|_| Details::ConvertLengthToLong(len).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;
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

    fn one_record(schema: &Schema) -> Value {
        let mut record = Record::new(schema).unwrap();
        record.put("a", 27i64);
        record.put("b", "foo");
        record.into()
    }

    #[test]
    fn header_magic_and_marker_frame_the_stream() {
        let schema = Schema::parse_str(SCHEMA).unwrap();
        let mut writer = Writer::new(&schema, Vec::new()).unwrap();
        let marker = writer.marker();
        writer.append(one_record(&schema)).unwrap();
        let bytes = writer.into_inner().unwrap();

        assert_eq!(&bytes[..4], b"Obj\x01");
        // the sync marker closes the stream
        assert_eq!(&bytes[bytes.len() - 16..], marker);
    }

    #[test]
    fn record_payload_matches_raw_datum_encoding() {
        let schema = Schema::parse_str(SCHEMA).unwrap();
        let mut writer = Writer::new(&schema, Vec::new()).unwrap();
        writer.append(one_record(&schema)).unwrap();
        let bytes = writer.into_inner().unwrap();

        // long 27 | string "foo" immediately precede the trailing marker
        let payload = &bytes[bytes.len() - 16 - 5..bytes.len() - 16];
        assert_eq!(payload, &[0x36, 0x06, 0x66, 0x6f, 0x6f]);
    }

    #[test]
    fn reserved_metadata_keys_are_rejected() {
        let schema = Schema::parse_str(SCHEMA).unwrap();
        let mut metadata = HashMap::new();
        metadata.insert("avro.codec".to_string(), b"null".to_vec());
        let result = Writer::builder()
            .schema(&schema)
            .writer(Vec::new())
            .user_metadata(metadata)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn encode_error_poisons_the_writer() {
        let schema = Schema::parse_str(SCHEMA).unwrap();
        let mut writer = Writer::new(&schema, Vec::new()).unwrap();

        // a bare long is not a record
        assert!(writer.append(Value::Long(3)).is_err());
        match writer
            .append(one_record(&schema))
            .unwrap_err()
            .into_details()
        {
            Details::WriterPoisoned => {}
            other => panic!("expected WriterPoisoned, got {other:?}"),
        }
    }

    #[test]
    fn block_length_threshold_flushes_blocks() {
        let schema = Schema::parse_str(SCHEMA).unwrap();
        let mut writer = Writer::builder()
            .schema(&schema)
            .writer(Vec::new())
            .block_length(2)
            .build()
            .unwrap();
        let header_len = writer.append(one_record(&schema)).unwrap();
        assert!(header_len > 0); // header goes out on first append
        let block_len = writer.append(one_record(&schema)).unwrap();
        assert!(block_len > 0); // second append completes the block
        let empty = writer.flush().unwrap();
        assert_eq!(empty, 0); // nothing buffered
    }
}
