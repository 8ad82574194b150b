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
use crate::rw::zig_i64;
use crate::AvroResult;

/// A buffered writer for Avro primitive values.
///
/// All writes append to an internal growable buffer and cannot fail; sink
/// errors surface only when the buffer is flushed with
/// [`flush_to`](Self::flush_to).
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Truncates the buffer back to `len` bytes, dropping a partially
    /// written unit after an encode error.
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    pub fn write_bool(&mut self, b: bool) {
        self.buf.push(b as u8);
    }

    pub fn write_long(&mut self, n: i64) {
        let mut z = zig_i64(n);
        loop {
            if z <= 0x7F {
                self.buf.push((z & 0x7F) as u8);
                break;
            }
            self.buf.push(0x80 | (z & 0x7F) as u8);
            z >>= 7;
        }
    }

    pub fn write_int(&mut self, n: i32) {
        self.write_long(n as i64);
    }

    pub fn write_float(&mut self, f: f32) {
        self.buf.extend_from_slice(&f.to_le_bytes());
    }

    pub fn write_double(&mut self, d: f64) {
        self.buf.extend_from_slice(&d.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_long(bytes.len() as i64);
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Writes raw bytes without a length prefix, as `fixed` values and sync
    /// markers require.
    pub fn write_fixed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes an array/map block header for `count` items. The terminating
    /// zero-count block is `write_block_header(0)`.
    pub fn write_block_header(&mut self, count: usize) {
        self.write_long(count as i64);
    }

    /// Flushes the buffered bytes into `sink` and clears the buffer.
    /// Returns the number of bytes written.
    pub fn flush_to(&mut self, sink: &mut dyn std::io::Write) -> AvroResult<usize> {
        sink.write_all(&self.buf).map_err(Details::WriteBytes)?;
        let written = self.buf.len();
        self.buf.clear();
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn long_varint_vectors() {
        for (n, expected) in [
            (0i64, vec![0u8]),
            (-1, vec![1]),
            (1, vec![2]),
            (-64, vec![127]),
            (64, vec![128, 1]),
            (27, vec![0x36]),
            (i32::MAX as i64, vec![254, 255, 255, 255, 15]),
            (i32::MIN as i64, vec![255, 255, 255, 255, 15]),
            (i64::MAX, vec![254, 255, 255, 255, 255, 255, 255, 255, 255, 1]),
            (i64::MIN, vec![255, 255, 255, 255, 255, 255, 255, 255, 255, 1]),
        ] {
            let mut w = Writer::new();
            w.write_long(n);
            assert_eq!(w.into_inner(), expected, "encoding {n}");
        }
    }

    #[test]
    fn int_and_long_agree() {
        let mut a = Writer::new();
        let mut b = Writer::new();
        a.write_int(42);
        b.write_long(42);
        assert_eq!(a.into_inner(), b.into_inner());
    }

    #[test]
    fn string_is_length_prefixed_utf8() {
        let mut w = Writer::new();
        w.write_string("foo");
        assert_eq!(w.into_inner(), vec![0x06, 0x66, 0x6f, 0x6f]);
    }

    #[test]
    fn flush_drains_the_buffer() {
        let mut w = Writer::new();
        w.write_bool(true);
        let mut sink = Vec::new();
        assert_eq!(w.flush_to(&mut sink).unwrap(), 1);
        assert!(w.is_empty());
        assert_eq!(sink, vec![0x01]);
    }
}
