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

//! The block compression codecs of the object container file format.

use crate::error::Details;
use crate::AvroResult;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// The compression codec used to compress container blocks.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab_case")]
pub enum Codec {
    /// Passes data through uncompressed.
    #[default]
    Null,
    /// Raw DEFLATE as specified in RFC 1951, without the zlib wrapper or
    /// checksum.
    Deflate,
    /// Google's Snappy block format. Each compressed block is followed by
    /// the 4-byte big-endian CRC32 of the uncompressed data.
    Snappy,
}

impl Codec {
    /// Compress a stream of bytes in place.
    pub fn compress(self, stream: &mut Vec<u8>) -> AvroResult<()> {
        match self {
            Codec::Null => (),
            Codec::Deflate => {
                *stream = miniz_oxide::deflate::compress_to_vec(
                    stream,
                    miniz_oxide::deflate::CompressionLevel::DefaultCompression as u8,
                );
            }
            Codec::Snappy => {
                let mut encoded: Vec<u8> = vec![0; snap::raw::max_compress_len(stream.len())];
                let compressed_size = snap::raw::Encoder::new()
                    .compress(&stream[..], &mut encoded[..])
                    .map_err(Details::SnappyCompress)?;

                let mut hasher = crc32fast::Hasher::new();
                hasher.update(&stream[..]);
                let checksum = hasher.finalize().to_be_bytes();
                encoded.truncate(compressed_size + checksum.len());
                encoded[compressed_size..].copy_from_slice(&checksum);

                *stream = encoded;
            }
        };
        Ok(())
    }

    /// Decompress a stream of bytes in place, verifying the snappy CRC.
    pub fn decompress(self, stream: &mut Vec<u8>) -> AvroResult<()> {
        *stream = match self {
            Codec::Null => return Ok(()),
            Codec::Deflate => miniz_oxide::inflate::decompress_to_vec(stream)
                .map_err(|e| Details::DeflateDecompress(e.to_string()))?,
            Codec::Snappy => {
                if stream.len() < 4 {
                    return Err(Details::SnappyDecompress(snap::Error::Empty).into());
                }
                let compressed = &stream[..stream.len() - 4];
                let decompressed_size = snap::raw::decompress_len(compressed)
                    .map_err(Details::SnappyDecompress)?;
                let mut decoded = vec![0; decompressed_size];
                snap::raw::Decoder::new()
                    .decompress(compressed, &mut decoded[..])
                    .map_err(Details::SnappyDecompress)?;

                let mut trailer: [u8; 4] = [0; 4];
                trailer.copy_from_slice(&stream[(stream.len() - 4)..]);
                let expected = u32::from_be_bytes(trailer);

                let mut hasher = crc32fast::Hasher::new();
                hasher.update(&decoded);
                let actual = hasher.finalize();

                if expected != actual {
                    return Err(Details::SnappyCrc32 { expected, actual }.into());
                }
                decoded
            }
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};
    use std::str::FromStr;

    const INPUT: &[u8] = b"theanswertolifetheuniverseandeverythingis42theanswertolifetheuniverseandeverythingis4theanswertolifetheuniverseandeverythingis2";

    #[test]
    fn null_compress_and_decompress() {
        let codec = Codec::Null;
        let mut stream = INPUT.to_vec();
        codec.compress(&mut stream).unwrap();
        assert_eq!(INPUT, stream.as_slice());
        codec.decompress(&mut stream).unwrap();
        assert_eq!(INPUT, stream.as_slice());
    }

    #[test]
    fn deflate_compress_and_decompress() {
        compress_and_decompress(Codec::Deflate);
    }

    #[test]
    fn snappy_compress_and_decompress() {
        compress_and_decompress(Codec::Snappy);
    }

    fn compress_and_decompress(codec: Codec) {
        let mut stream = INPUT.to_vec();
        codec.compress(&mut stream).unwrap();
        assert_ne!(INPUT, stream.as_slice());
        assert!(INPUT.len() > stream.len());
        codec.decompress(&mut stream).unwrap();
        assert_eq!(INPUT, stream.as_slice());
    }

    #[test]
    fn snappy_crc_mismatch_is_detected() {
        let mut stream = INPUT.to_vec();
        Codec::Snappy.compress(&mut stream).unwrap();
        let last = stream.len() - 1;
        stream[last] ^= 0x01;
        match Codec::Snappy
            .decompress(&mut stream)
            .unwrap_err()
            .into_details()
        {
            Details::SnappyCrc32 { .. } => {}
            other => panic!("expected SnappyCrc32, got {other:?}"),
        }
    }

    #[test]
    fn codec_name_round_trip() {
        assert_eq!(<&str>::from(Codec::Null), "null");
        assert_eq!(<&str>::from(Codec::Deflate), "deflate");
        assert_eq!(<&str>::from(Codec::Snappy), "snappy");

        assert_eq!(Codec::from_str("null").unwrap(), Codec::Null);
        assert_eq!(Codec::from_str("deflate").unwrap(), Codec::Deflate);
        assert_eq!(Codec::from_str("snappy").unwrap(), Codec::Snappy);
        assert!(Codec::from_str("not a codec").is_err());
    }
}
