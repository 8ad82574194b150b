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

//! Error types for schema parsing, codec resolution, wire coding, container
//! handling and the registry client.

use crate::schema::Name;
use serde_json::Value as JsonValue;

/// Error returned by any fallible operation in this crate.
///
/// The concrete failure is available through [`details`](Self::details) or
/// [`into_details`](Self::into_details). Keeping the payload boxed keeps
/// `Result<T, Error>` small on the happy path.
#[derive(thiserror::Error, Debug)]
#[repr(transparent)]
#[error(transparent)]
pub struct Error {
    details: Box<Details>,
}

impl Error {
    pub fn new(details: Details) -> Self {
        Self {
            details: Box::new(details),
        }
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn into_details(self) -> Details {
        *self.details
    }
}

impl From<Details> for Error {
    fn from(details: Details) -> Self {
        Self::new(details)
    }
}

/// The concrete error cases.
///
/// Variants group into the five failure families of the crate: schema
/// parsing, codec resolution, wire coding, container handling and the
/// registry client.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Details {
    // ---- schema parsing ----
    #[error("Failed to parse schema from JSON")]
    ParseSchemaJson(#[source] serde_json::Error),

    #[error("Must be a JSON string, object or array")]
    ParseSchemaFromValidJson,

    #[error("Unknown type: {0}")]
    ParsePrimitive(String),

    #[error("Invalid schema name {0}. It must match the regex {1}")]
    InvalidSchemaName(String, &'static str),

    #[error("Invalid namespace {0} (expected to match the regex {1})")]
    InvalidNamespace(String, &'static str),

    #[error("Invalid enum symbol name {0}")]
    InvalidEnumSymbolName(String),

    #[error("Invalid record field name {0}")]
    InvalidRecordFieldName(String),

    #[error("No `name` field")]
    GetNameField,

    #[error("No `type` field on complex schema")]
    GetTypeField,

    #[error("No `fields` in record")]
    GetRecordFieldsJson,

    #[error("No `type` in record field")]
    GetRecordFieldTypeField,

    #[error("Two fields named {0} in record")]
    FieldNameDuplicate(String),

    #[error("Two named schemas defined for {0}")]
    AmbiguousSchemaDefinition(Name),

    #[error("No `symbols` field in enum")]
    GetEnumSymbolsField,

    #[error("Unable to parse `symbols` in enum")]
    GetEnumSymbols,

    #[error("Enum symbol {0} appears twice")]
    EnumSymbolDuplicate(String),

    #[error("Enum default must be a string, got: {0:?}")]
    EnumDefaultWrongType(JsonValue),

    #[error("Enum default {symbol} is not among the symbols {symbols:?}")]
    EnumDefaultUnknownSymbol { symbol: String, symbols: Vec<String> },

    #[error("No `items` in array")]
    GetArrayItemsField,

    #[error("No `values` in map")]
    GetMapValuesField,

    #[error("No `size` in fixed")]
    GetFixedSizeField,

    #[error("`size` must be a positive integer, got: {0:?}")]
    GetFixedSizeFieldPositive(JsonValue),

    #[error("`logicalType` must be a string, got: {0:?}")]
    GetLogicalTypeFieldType(JsonValue),

    #[error("No `{0}` attribute for decimal logical type")]
    GetDecimalMetadataFromJson(&'static str),

    #[error("Expected `{key}` to be an integer, got: {value:?}")]
    GetDecimalMetadataValueFromJson { key: &'static str, value: JsonValue },

    #[error("Decimal precision must be positive, got {precision}")]
    DecimalPrecisionMustBePositive { precision: i64 },

    #[error("Decimal scale must not be negative, got {scale}")]
    DecimalScaleMustBePositive { scale: i64 },

    #[error("Decimal scale {scale} is greater than precision {precision}")]
    DecimalScaleGreaterThanPrecision { scale: i64, precision: i64 },

    #[error("Decimal precision {precision} does not fit into a fixed of size {size}")]
    DecimalPrecisionOverFixedCapacity { precision: i64, size: usize },

    #[error("Unions may not directly contain a union")]
    GetNestedUnion,

    #[error("Unions cannot contain duplicate types")]
    GetUnionDuplicate,

    #[error("Union must have at least one member")]
    EmptyUnion,

    #[error("Default value {value} for field {record}.{field} does not match its schema: {reason}")]
    InvalidDefault {
        record: String,
        field: String,
        value: JsonValue,
        reason: String,
    },

    // ---- codec resolution ----
    #[error("No codec binding {schema} to a {shape} value")]
    NoCodec { schema: String, shape: String },

    #[error("Unresolved reference to named schema {0}")]
    UnresolvedRef(Name),

    #[error("Host value has no field {field} and the schema field declares no default")]
    MissingFieldNoDefault { field: String },

    #[error("Shape name {0} is not registered")]
    UnregisteredShapeName(String),

    // ---- wire coding ----
    #[error("Failed to read from the byte source")]
    ReadFailed(#[source] std::io::Error),

    #[error("Variable-length integer does not terminate within 10 bytes")]
    IntegerOverflow,

    #[error("Value {0} does not fit into a 32-bit int")]
    IntOutOfRange(i64),

    #[error("Invalid boolean byte: {0:#04x}")]
    BoolValue(u8),

    #[error("Negative length prefix: {0}")]
    NegativeLength(i64),

    #[error("Invalid UTF-8 in string value")]
    InvalidUtf8(#[source] std::string::FromUtf8Error),

    #[error("Refusing to allocate {desired} bytes (maximum {maximum})")]
    MemoryAllocation { desired: usize, maximum: usize },

    #[error("Enum index {index} out of range for {num_symbols} symbols")]
    EnumIndexOutOfRange { index: i64, num_symbols: usize },

    #[error("Value {0} is not a symbol of the enum")]
    EnumSymbolUnknown(String),

    #[error("Union index {index} out of range for {num_members} members")]
    UnionIndexOutOfRange { index: i64, num_members: usize },

    #[error("Union discriminator is missing or ambiguous: {0}")]
    UnionDiscriminator(String),

    #[error("Fixed value of {got} bytes where the schema requires {expected}")]
    FixedSizeMismatch { expected: usize, got: usize },

    #[error("Failed to parse uuid string")]
    ConvertStrToUuid(#[source] uuid::Error),

    #[error("Cannot encode a {got} value where the plan expects {expected}")]
    EncodeValueMismatch { expected: &'static str, got: String },

    #[error("Decimal of {needed} bytes does not fit into {requested} bytes")]
    SignExtend { requested: usize, needed: usize },

    // ---- container ----
    #[error("Stream does not start with the Avro object container magic")]
    HeaderMagic,

    #[error("Container header has no {0} entry")]
    GetHeaderMetadata(&'static str),

    #[error("Unknown compression codec: {0}")]
    CodecNotSupported(String),

    #[error("Sync marker does not match the header marker")]
    GetBlockMarker,

    #[error("Snappy CRC32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    SnappyCrc32 { expected: u32, actual: u32 },

    #[error("Failed to compress with snappy")]
    SnappyCompress(#[source] snap::Error),

    #[error("Failed to decompress with snappy")]
    SnappyDecompress(#[source] snap::Error),

    #[error("Failed to decompress with deflate: {0}")]
    DeflateDecompress(String),

    #[error("Failed to read container header")]
    ReadHeader(#[source] std::io::Error),

    #[error("Negative block {0} in container block header")]
    NegativeBlockField(&'static str),

    #[error("Failed to write bytes to the sink")]
    WriteBytes(#[source] std::io::Error),

    #[error("Failed to flush the sink")]
    FlushWriter(#[source] std::io::Error),

    #[error("decode called without a preceding successful has_next")]
    DecodeWithoutHasNext,

    #[error("Writer is unusable after an earlier append error")]
    WriterPoisoned,

    #[error("Metadata key {0} uses the reserved avro. prefix")]
    ReservedMetadataKey(String),

    #[error("Count {0} does not fit into a long")]
    ConvertLengthToLong(usize),

    // ---- registry ----
    #[error("Registry error {code} (HTTP {status}): {message}")]
    Registry {
        status: u16,
        code: i32,
        message: String,
    },

    #[error("Registry transport failure: {0}")]
    RegistryTransport(String),

    #[error("Failed to parse registry response")]
    RegistryResponse(#[source] serde_json::Error),
}
