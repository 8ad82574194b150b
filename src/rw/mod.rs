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

//! The Avro primitive wire layer: zig-zag variable-length integers,
//! little-endian IEEE floats, length-prefixed bytes and strings.
//!
//! [`Reader`] carries a sticky error: after the first failure every
//! subsequent read is a no-op returning a zero value, and callers check
//! [`Reader::check`] once per logical unit instead of once per primitive.
//! [`Writer`] appends to an internal growable buffer and cannot fail until
//! the buffer is flushed to a sink.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

/// Maps a signed 64-bit value onto the unsigned zig-zag ordering, so that
/// small magnitudes of either sign produce short varints.
#[inline]
pub(crate) fn zig_i64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverse of [`zig_i64`].
#[inline]
pub(crate) fn zag_i64(z: u64) -> i64 {
    if z & 0x1 == 0 {
        (z >> 1) as i64
    } else {
        !(z >> 1) as i64
    }
}
