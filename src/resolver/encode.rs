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

use super::{error_encode_plan, EncodePlan, PlanBuilder, Shape, StructShape};
use crate::error::{Details, Error};
use crate::rw;
use crate::schema::{
    DecimalInner, DecimalSchema, EnumSchema, FixedSchema, RecordSchema, Schema, SchemaKind,
    UnionSchema,
};
use crate::value::Value;
use crate::AvroResult;
use num_bigint::BigInt;
use std::collections::HashMap;
use std::sync::Arc;

fn plan(
    f: impl Fn(&Value, &mut rw::Writer) -> AvroResult<()> + Send + Sync + 'static,
) -> Arc<EncodePlan> {
    Arc::new(EncodePlan::new(Box::new(f)))
}

fn mismatch(expected: &'static str, got: &Value) -> Error {
    Details::EncodeValueMismatch {
        expected,
        got: got.kind_name().to_string(),
    }
    .into()
}

/// Builds the encode plan for a `(schema, shape)` pair. Unsupported pairs
/// resolve to an error plan that fails on first use.
pub(super) fn encode_plan(
    b: &mut PlanBuilder<'_>,
    schema: &Schema,
    shape: &Shape,
) -> AvroResult<Arc<EncodePlan>> {
    let shape = b.expand_shape(shape)?;
    match schema {
        Schema::Ref { name } => {
            let target = b.target_of(name)?;
            encode_plan(b, &target, &shape)
        }

        Schema::Null => match shape {
            Shape::Null | Shape::Dynamic => Ok(plan(|value, _| match value {
                Value::Null => Ok(()),
                other => Err(mismatch("null", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Boolean => match shape {
            Shape::Bool | Shape::Dynamic => Ok(plan(|value, out| match value {
                Value::Boolean(b) => {
                    out.write_bool(*b);
                    Ok(())
                }
                other => Err(mismatch("boolean", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Int => match shape {
            Shape::Int8 | Shape::Int16 | Shape::Int32 | Shape::Dynamic => {
                Ok(plan(|value, out| match value {
                    Value::Int(i) => {
                        out.write_int(*i);
                        Ok(())
                    }
                    other => Err(mismatch("int", other)),
                }))
            }
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Long => match shape {
            Shape::Int8 | Shape::Int16 | Shape::Int32 | Shape::Int64 | Shape::Dynamic => {
                Ok(plan(|value, out| match value {
                    Value::Long(i) => {
                        out.write_long(*i);
                        Ok(())
                    }
                    // int widens on encode
                    Value::Int(i) => {
                        out.write_long(*i as i64);
                        Ok(())
                    }
                    other => Err(mismatch("long", other)),
                }))
            }
            // f64 hosts truncate on encode
            Shape::Float64 => Ok(plan(|value, out| match value {
                Value::Double(d) => {
                    out.write_long(*d as i64);
                    Ok(())
                }
                Value::Long(i) => {
                    out.write_long(*i);
                    Ok(())
                }
                other => Err(mismatch("long", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Float => match shape {
            Shape::Float32 | Shape::Dynamic => Ok(plan(|value, out| match value {
                Value::Float(f) => {
                    out.write_float(*f);
                    Ok(())
                }
                other => Err(mismatch("float", other)),
            })),
            Shape::Float64 => Ok(plan(|value, out| match value {
                Value::Double(d) => {
                    out.write_float(*d as f32);
                    Ok(())
                }
                Value::Float(f) => {
                    out.write_float(*f);
                    Ok(())
                }
                other => Err(mismatch("float", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Double => match shape {
            Shape::Float64 | Shape::Float32 | Shape::Dynamic => {
                Ok(plan(|value, out| match value {
                    Value::Double(d) => {
                        out.write_double(*d);
                        Ok(())
                    }
                    // f32 widens on encode
                    Value::Float(f) => {
                        out.write_double(*f as f64);
                        Ok(())
                    }
                    other => Err(mismatch("double", other)),
                }))
            }
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Bytes => match shape {
            Shape::Bytes | Shape::Dynamic => Ok(plan(|value, out| match value {
                Value::Bytes(bytes) => {
                    out.write_bytes(bytes);
                    Ok(())
                }
                other => Err(mismatch("bytes", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::String => match shape {
            Shape::Str | Shape::Dynamic => Ok(plan(|value, out| match value {
                Value::String(s) => {
                    out.write_string(s);
                    Ok(())
                }
                other => Err(mismatch("string", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Fixed(fixed) => match shape {
            Shape::FixedBytes(n) if n == fixed.size => Ok(fixed_encode(fixed.size)),
            Shape::Dynamic => Ok(fixed_encode(fixed.size)),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Enum(inner) => match shape {
            Shape::Str | Shape::Dynamic => Ok(enum_encode(inner)),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Date => match shape {
            Shape::Date | Shape::Dynamic => Ok(plan(|value, out| match value {
                Value::Date(days) => {
                    out.write_int(*days);
                    Ok(())
                }
                Value::Int(days) => {
                    out.write_int(*days);
                    Ok(())
                }
                other => Err(mismatch("date", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::TimeMillis => match shape {
            Shape::TimeOfDay | Shape::Dynamic => Ok(plan(|value, out| match value {
                Value::TimeMillis(ms) => {
                    out.write_int(*ms);
                    Ok(())
                }
                Value::TimeMicros(us) => {
                    out.write_int((us / 1_000) as i32);
                    Ok(())
                }
                Value::Int(ms) => {
                    out.write_int(*ms);
                    Ok(())
                }
                other => Err(mismatch("time-millis", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::TimeMicros => match shape {
            Shape::TimeOfDay | Shape::Dynamic => Ok(plan(|value, out| match value {
                Value::TimeMicros(us) => {
                    out.write_long(*us);
                    Ok(())
                }
                Value::TimeMillis(ms) => {
                    out.write_long(*ms as i64 * 1_000);
                    Ok(())
                }
                Value::Long(us) => {
                    out.write_long(*us);
                    Ok(())
                }
                other => Err(mismatch("time-micros", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::TimestampMillis => match shape {
            Shape::Instant | Shape::Dynamic => Ok(plan(|value, out| match value {
                Value::TimestampMillis(ms) => {
                    out.write_long(*ms);
                    Ok(())
                }
                Value::TimestampMicros(us) => {
                    out.write_long(us / 1_000);
                    Ok(())
                }
                Value::Long(ms) => {
                    out.write_long(*ms);
                    Ok(())
                }
                other => Err(mismatch("timestamp-millis", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::TimestampMicros => match shape {
            Shape::Instant | Shape::Dynamic => Ok(plan(|value, out| match value {
                Value::TimestampMicros(us) => {
                    out.write_long(*us);
                    Ok(())
                }
                Value::TimestampMillis(ms) => {
                    out.write_long(*ms as i64 * 1_000);
                    Ok(())
                }
                Value::Long(us) => {
                    out.write_long(*us);
                    Ok(())
                }
                other => Err(mismatch("timestamp-micros", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Uuid => match shape {
            Shape::Uuid | Shape::Str | Shape::Dynamic => Ok(plan(|value, out| match value {
                Value::Uuid(uuid) => {
                    out.write_string(&uuid.to_string());
                    Ok(())
                }
                Value::String(s) => {
                    out.write_string(s);
                    Ok(())
                }
                other => Err(mismatch("uuid", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Duration(_) => match shape {
            Shape::Duration | Shape::Dynamic => Ok(plan(|value, out| match value {
                Value::Duration(d) => {
                    out.write_fixed(&d.to_bytes());
                    Ok(())
                }
                Value::Fixed(12, bytes) if bytes.len() == 12 => {
                    out.write_fixed(bytes);
                    Ok(())
                }
                other => Err(mismatch("duration", other)),
            })),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Decimal(decimal) => match shape {
            Shape::Decimal | Shape::Dynamic => Ok(decimal_encode(decimal)),
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Array(inner) => {
            let item_shape = match &shape {
                Shape::Sequence(item) => (**item).clone(),
                Shape::Dynamic => Shape::Dynamic,
                _ => return Ok(error_encode_plan(schema, &shape)),
            };
            let item_plan = encode_plan(b, &inner.items, &item_shape)?;
            Ok(plan(move |value, out| match value {
                Value::Array(items) => {
                    if !items.is_empty() {
                        out.write_block_header(items.len());
                        for item in items {
                            item_plan.encode(item, out)?;
                        }
                    }
                    out.write_block_header(0);
                    Ok(())
                }
                other => Err(mismatch("array", other)),
            }))
        }

        Schema::Map(inner) => {
            let value_shape = match &shape {
                Shape::Mapping(value) => (**value).clone(),
                Shape::Dynamic => Shape::Dynamic,
                _ => return Ok(error_encode_plan(schema, &shape)),
            };
            let value_plan = encode_plan(b, &inner.values, &value_shape)?;
            Ok(plan(move |value, out| match value {
                Value::Map(entries) => {
                    if !entries.is_empty() {
                        out.write_block_header(entries.len());
                        for (key, entry) in entries {
                            out.write_string(key);
                            value_plan.encode(entry, out)?;
                        }
                    }
                    out.write_block_header(0);
                    Ok(())
                }
                other => Err(mismatch("map", other)),
            }))
        }

        Schema::Record(record) => match &shape {
            Shape::Struct(_) | Shape::Dynamic => {
                let fullname = record.name.fullname();
                let record = record.clone();
                let inner_shape = shape.clone();
                b.encode_named(fullname, &shape, move |b| {
                    record_encode(b, &record, &inner_shape)
                })
            }
            _ => Ok(error_encode_plan(schema, &shape)),
        },

        Schema::Union(union) => match &shape {
            Shape::Optional(inner) => optional_encode(b, schema, union, inner),
            Shape::Dynamic => union_encode(b, union),
            _ => Ok(error_encode_plan(schema, &shape)),
        },
    }
}

fn fixed_encode(size: usize) -> Arc<EncodePlan> {
    plan(move |value, out| {
        let bytes = match value {
            Value::Fixed(_, bytes) | Value::Bytes(bytes) => bytes,
            other => return Err(mismatch("fixed", other)),
        };
        if bytes.len() != size {
            return Err(Details::FixedSizeMismatch {
                expected: size,
                got: bytes.len(),
            }
            .into());
        }
        out.write_fixed(bytes);
        Ok(())
    })
}

fn enum_encode(schema: &EnumSchema) -> Arc<EncodePlan> {
    let symbols = schema.symbols.clone();
    plan(move |value, out| {
        let symbol = match value {
            Value::Enum(index, symbol) => {
                if symbols.get(*index as usize) == Some(symbol) {
                    out.write_long(*index as i64);
                    return Ok(());
                }
                symbol
            }
            Value::String(symbol) => symbol,
            other => return Err(mismatch("enum symbol", other)),
        };
        match symbols.iter().position(|s| s == symbol) {
            Some(index) => {
                out.write_long(index as i64);
                Ok(())
            }
            None => Err(Details::EnumSymbolUnknown(symbol.clone()).into()),
        }
    })
}

fn decimal_encode(schema: &DecimalSchema) -> Arc<EncodePlan> {
    let scale = schema.scale as i64;
    let inner = schema.inner.clone();
    plan(move |value, out| {
        let Value::Decimal(decimal) = value else {
            return Err(mismatch("decimal", value));
        };
        let (unscaled, _) = decimal.with_scale(scale).into_bigint_and_exponent();
        match &inner {
            DecimalInner::Bytes => {
                out.write_bytes(&unscaled.to_signed_bytes_be());
                Ok(())
            }
            DecimalInner::Fixed(FixedSchema { size, .. }) => {
                out.write_fixed(&sign_extended(&unscaled, *size)?);
                Ok(())
            }
        }
    })
}

/// Sign-extends the two's-complement form of `unscaled` to exactly `len`
/// bytes, as the fixed-backed decimal wire form requires.
pub(crate) fn sign_extended(unscaled: &BigInt, len: usize) -> AvroResult<Vec<u8>> {
    let raw = unscaled.to_signed_bytes_be();
    if raw.len() > len {
        return Err(Details::SignExtend {
            requested: len,
            needed: raw.len(),
        }
        .into());
    }
    let sign_byte = if unscaled.sign() == num_bigint::Sign::Minus {
        0xFF
    } else {
        0x00
    };
    let mut bytes = vec![sign_byte; len];
    bytes[len - raw.len()..].copy_from_slice(&raw);
    Ok(bytes)
}

struct FieldEncode {
    name: String,
    plan: Arc<EncodePlan>,
    host_index: Option<usize>,
    default: Option<Value>,
}

fn record_encode(
    b: &mut PlanBuilder<'_>,
    record: &RecordSchema,
    shape: &Shape,
) -> AvroResult<super::EncodeFn> {
    let struct_shape = match shape {
        Shape::Struct(inner) => Some(inner),
        _ => None,
    };

    let mut fields = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        let (host_index, field_shape) = match struct_shape {
            Some(host) => match host.fields.iter().position(|(name, _)| name == &field.name) {
                Some(index) => (Some(index), host.fields[index].1.clone()),
                None => (None, Shape::Dynamic),
            },
            None => (None, Shape::Dynamic),
        };
        let default = field
            .default
            .as_ref()
            .map(|json| Value::from_default(&field.schema, json, b.names()))
            .transpose()?;
        if struct_shape.is_some() && host_index.is_none() && default.is_none() {
            return Err(Details::MissingFieldNoDefault {
                field: field.name.clone(),
            }
            .into());
        }
        let plan = encode_plan(b, &field.schema, &field_shape)?;
        fields.push(FieldEncode {
            name: field.name.clone(),
            plan,
            host_index,
            default,
        });
    }

    let structured = struct_shape.is_some();
    Ok(Box::new(move |value, out| {
        match value {
            Value::Record(entries) => {
                for field in &fields {
                    let entry = if structured {
                        field.host_index.and_then(|i| entries.get(i)).map(|(_, v)| v)
                    } else {
                        entries
                            .iter()
                            .find(|(name, _)| name == &field.name)
                            .map(|(_, v)| v)
                    };
                    match entry.or(field.default.as_ref()) {
                        Some(v) => field.plan.encode(v, out)?,
                        None => {
                            return Err(Details::MissingFieldNoDefault {
                                field: field.name.clone(),
                            }
                            .into());
                        }
                    }
                }
                Ok(())
            }
            // A dynamic mapping can stand in for a record.
            Value::Map(entries) if !structured => {
                for field in &fields {
                    match entries.get(&field.name).or(field.default.as_ref()) {
                        Some(v) => field.plan.encode(v, out)?,
                        None => {
                            return Err(Details::MissingFieldNoDefault {
                                field: field.name.clone(),
                            }
                            .into());
                        }
                    }
                }
                Ok(())
            }
            other => Err(mismatch("record", other)),
        }
    }))
}

fn optional_encode(
    b: &mut PlanBuilder<'_>,
    schema: &Schema,
    union: &UnionSchema,
    inner: &Shape,
) -> AvroResult<Arc<EncodePlan>> {
    // An optional host value binds only to a two-member union with null.
    let Some((null_index, value_index)) = union.nullable_pair() else {
        return Err(super::no_codec(schema, &Shape::Optional(Box::new(inner.clone()))).into());
    };
    let value_plan = encode_plan(b, &union.variants()[value_index], inner)?;
    Ok(plan(move |value, out| match value {
        Value::Null => {
            out.write_long(null_index as i64);
            Ok(())
        }
        present => {
            out.write_long(value_index as i64);
            value_plan.encode(present, out)
        }
    }))
}

struct MemberEncode {
    plan: Arc<EncodePlan>,
    kind: SchemaKind,
    enum_symbols: Option<Vec<String>>,
    fixed_size: Option<usize>,
    /// Field names of the shape registered for this record member, if any.
    registered_fields: Option<Vec<String>>,
}

fn union_encode(b: &mut PlanBuilder<'_>, union: &UnionSchema) -> AvroResult<Arc<EncodePlan>> {
    let mut members = Vec::with_capacity(union.variants().len());
    let mut by_discriminant = HashMap::new();
    let mut null_index = None;
    let mut map_index = None;
    let mut record_indices = Vec::new();

    for (index, member) in union.variants().iter().enumerate() {
        let resolved = match member {
            Schema::Ref { name } => b.target_of(name)?,
            other => other.clone(),
        };
        by_discriminant.insert(resolved.union_discriminant(), index);
        let kind = SchemaKind::from(&resolved);
        match &resolved {
            Schema::Null => null_index = Some(index),
            Schema::Map(_) => map_index = Some(index),
            Schema::Record(_) => record_indices.push(index),
            _ => {}
        }
        members.push(MemberEncode {
            plan: encode_plan(b, member, &Shape::Dynamic)?,
            kind,
            enum_symbols: match &resolved {
                Schema::Enum(EnumSchema { symbols, .. }) => Some(symbols.clone()),
                _ => None,
            },
            fixed_size: match &resolved {
                Schema::Fixed(FixedSchema { size, .. }) => Some(*size),
                _ => None,
            },
            registered_fields: match &resolved {
                Schema::Record(record) => b
                    .registry()
                    .get(&record.name.fullname())
                    .and_then(|shape| match shape {
                        Shape::Struct(StructShape { fields, .. }) => {
                            Some(fields.into_iter().map(|(name, _)| name).collect())
                        }
                        _ => None,
                    }),
                _ => None,
            },
        });
    }

    let nullable = union.nullable_pair();
    let num_members = members.len();

    Ok(plan(move |value, out| {
        let write_member = |index: usize, value: &Value, out: &mut rw::Writer| {
            out.write_long(index as i64);
            members[index].plan.encode(value, out)
        };

        // The wrapped form: a single-entry mapping keyed by a member
        // discriminator selects that member explicitly.
        if let Value::Map(entries) = value
            && entries.len() == 1
        {
            let (key, entry) = entries.iter().next().expect("len is 1");
            if let Some(&index) = by_discriminant.get(key.as_str()) {
                return write_member(index, entry, out);
            }
        }

        // A simple nullable union takes the plain value.
        if let Some((null_index, value_index)) = nullable {
            return match value {
                Value::Null => {
                    out.write_long(null_index as i64);
                    Ok(())
                }
                present => write_member(value_index, present, out),
            };
        }

        match value {
            Value::Null => match null_index {
                Some(index) => {
                    out.write_long(index as i64);
                    Ok(())
                }
                None => Err(Details::UnionDiscriminator(
                    "null value for a union without a null member".to_string(),
                )
                .into()),
            },
            Value::Map(_) => match map_index {
                Some(index) => write_member(index, value, out),
                None => Err(Details::UnionDiscriminator(format!(
                    "a map value selects no member of a {num_members}-member union"
                ))
                .into()),
            },
            Value::Record(entries) => match record_indices.as_slice() {
                [] => Err(Details::UnionDiscriminator(
                    "a record value for a union without record members".to_string(),
                )
                .into()),
                [index] => write_member(*index, value, out),
                candidates => {
                    let names: Vec<&String> = entries.iter().map(|(name, _)| name).collect();
                    for index in candidates {
                        if let Some(registered) = &members[*index].registered_fields
                            && registered.len() == names.len()
                            && registered.iter().zip(&names).all(|(a, b)| a == *b)
                        {
                            return write_member(*index, value, out);
                        }
                    }
                    Err(Details::UnionDiscriminator(
                        "multiple record members and no registered shape matches the value"
                            .to_string(),
                    )
                    .into())
                }
            },
            Value::Enum(_, symbol) => {
                for (index, member) in members.iter().enumerate() {
                    if let Some(symbols) = &member.enum_symbols
                        && symbols.iter().any(|s| s == symbol)
                    {
                        return write_member(index, value, out);
                    }
                }
                Err(Details::EnumSymbolUnknown(symbol.clone()).into())
            }
            Value::Fixed(size, _) => {
                match members
                    .iter()
                    .position(|member| member.fixed_size == Some(*size))
                {
                    Some(index) => write_member(index, value, out),
                    None => Err(Details::UnionDiscriminator(format!(
                        "no fixed member of size {size}"
                    ))
                    .into()),
                }
            }
            other => {
                let kind = runtime_kind(other);
                match members.iter().position(|member| Some(member.kind) == kind) {
                    Some(index) => write_member(index, other, out),
                    None => Err(Details::UnionDiscriminator(format!(
                        "a {} value selects no member; use the wrapped single-entry map form",
                        other.kind_name()
                    ))
                    .into()),
                }
            }
        }
    }))
}

fn runtime_kind(value: &Value) -> Option<SchemaKind> {
    Some(match value {
        Value::Boolean(_) => SchemaKind::Boolean,
        Value::Int(_) => SchemaKind::Int,
        Value::Long(_) => SchemaKind::Long,
        Value::Float(_) => SchemaKind::Float,
        Value::Double(_) => SchemaKind::Double,
        Value::Bytes(_) => SchemaKind::Bytes,
        Value::String(_) => SchemaKind::String,
        Value::Array(_) => SchemaKind::Array,
        Value::Date(_) => SchemaKind::Date,
        Value::TimeMillis(_) => SchemaKind::TimeMillis,
        Value::TimeMicros(_) => SchemaKind::TimeMicros,
        Value::TimestampMillis(_) => SchemaKind::TimestampMillis,
        Value::TimestampMicros(_) => SchemaKind::TimestampMicros,
        Value::Decimal(_) => SchemaKind::Decimal,
        Value::Uuid(_) => SchemaKind::Uuid,
        Value::Duration(_) => SchemaKind::Duration,
        _ => return None,
    })
}
