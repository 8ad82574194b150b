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

//! Implementation of the Rabin fingerprint algorithm (CRC-64-AVRO) behind
//! the [`digest`] traits, so it plugs into [`Schema::fingerprint`] next to
//! `Sha256` and `Md5`.
//!
//! The algorithm follows the Avro specification: a byte-wise table-driven
//! 64-bit CRC seeded with the fingerprint of the empty buffer.
//!
//! [`Schema::fingerprint`]: crate::schema::Schema::fingerprint

use digest::{
    FixedOutput, FixedOutputReset, HashMarker, Output, OutputSizeUser, Reset, Update, consts::U8,
};
use std::sync::OnceLock;

/// Fingerprint of the empty buffer, doubling as the table generator constant.
const EMPTY: u64 = 0xc15d213aa4d7a795;

fn fp_table() -> &'static [u64; 256] {
    static FP_TABLE: OnceLock<[u64; 256]> = OnceLock::new();
    FP_TABLE.get_or_init(|| {
        let mut table = [0u64; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut fp = i as u64;
            for _ in 0..8 {
                fp = (fp >> 1) ^ (EMPTY & (fp & 1).wrapping_neg());
            }
            *entry = fp;
        }
        table
    })
}

/// A rolling CRC-64-AVRO state.
#[derive(Clone, Debug)]
pub struct Rabin {
    result: u64,
}

impl Rabin {
    /// The fingerprint accumulated so far, as the numeric 64-bit value.
    pub fn current(&self) -> u64 {
        self.result
    }
}

impl Default for Rabin {
    fn default() -> Self {
        Rabin { result: EMPTY }
    }
}

impl Update for Rabin {
    fn update(&mut self, data: &[u8]) {
        let table = fp_table();
        for b in data {
            self.result = (self.result >> 8) ^ table[((self.result ^ *b as u64) & 0xff) as usize];
        }
    }
}

impl OutputSizeUser for Rabin {
    type OutputSize = U8;
}

impl FixedOutput for Rabin {
    fn finalize_into(self, out: &mut Output<Self>) {
        out.copy_from_slice(&self.result.to_be_bytes());
    }
}

impl Reset for Rabin {
    fn reset(&mut self) {
        self.result = EMPTY;
    }
}

impl FixedOutputReset for Rabin {
    fn finalize_into_reset(&mut self, out: &mut Output<Self>) {
        out.copy_from_slice(&self.result.to_be_bytes());
        self.result = EMPTY;
    }
}

impl HashMarker for Rabin {}
