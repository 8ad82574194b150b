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

use super::{error_decode_plan, DecodeFn, DecodePlan, PlanBuilder, Shape, SkipFn};
use crate::error::Details;
use crate::rw;
use crate::schema::{DecimalInner, DecimalSchema, FixedSchema, RecordSchema, Schema, UnionSchema};
use crate::value::{Duration, Value};
use crate::AvroResult;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

fn plan(
    f: impl Fn(&mut rw::Reader<'_>) -> AvroResult<Value> + Send + Sync + 'static,
) -> Arc<DecodePlan> {
    Arc::new(DecodePlan::new(Box::new(f)))
}

/// Builds the decode plan for a `(schema, shape)` pair. Unsupported pairs
/// resolve to an error plan that fails on first use.
pub(super) fn decode_plan(
    b: &mut PlanBuilder<'_>,
    schema: &Schema,
    shape: &Shape,
) -> AvroResult<Arc<DecodePlan>> {
    let shape = b.expand_shape(shape)?;
    match schema {
        Schema::Ref { name } => {
            let target = b.target_of(name)?;
            decode_plan(b, &target, &shape)
        }

        Schema::Null => match shape {
            Shape::Null | Shape::Dynamic => Ok(plan(|_| Ok(Value::Null))),
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Boolean => match shape {
            Shape::Bool | Shape::Dynamic => {
                Ok(plan(|r| Ok(Value::Boolean(r.read_bool()))))
            }
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Int => match shape {
            Shape::Int8 | Shape::Int16 | Shape::Int32 | Shape::Dynamic => {
                Ok(plan(|r| Ok(Value::Int(r.read_int()))))
            }
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Long => match shape {
            Shape::Int64 | Shape::Dynamic => Ok(plan(|r| Ok(Value::Long(r.read_long())))),
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Float => match shape {
            Shape::Float32 | Shape::Dynamic => {
                Ok(plan(|r| Ok(Value::Float(r.read_float()))))
            }
            // a double host widens the narrower wire form on decode
            Shape::Float64 => Ok(plan(|r| Ok(Value::Double(r.read_float() as f64)))),
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Double => match shape {
            Shape::Float64 | Shape::Dynamic => {
                Ok(plan(|r| Ok(Value::Double(r.read_double()))))
            }
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Bytes => match shape {
            Shape::Bytes | Shape::Dynamic => Ok(plan(|r| Ok(Value::Bytes(r.read_bytes())))),
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::String => match shape {
            Shape::Str | Shape::Dynamic => {
                Ok(plan(|r| Ok(Value::String(r.read_string()))))
            }
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Fixed(fixed) => match shape {
            Shape::FixedBytes(n) if n == fixed.size => Ok(fixed_decode(fixed.size)),
            Shape::Dynamic => Ok(fixed_decode(fixed.size)),
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Enum(inner) => match shape {
            Shape::Str | Shape::Dynamic => {
                let symbols = inner.symbols.clone();
                Ok(plan(move |r| {
                    let index = r.read_long();
                    if r.error().is_some() {
                        return Ok(Value::Null);
                    }
                    match usize::try_from(index).ok().and_then(|i| symbols.get(i)) {
                        Some(symbol) => Ok(Value::Enum(index as u32, symbol.clone())),
                        None => Err(Details::EnumIndexOutOfRange {
                            index,
                            num_symbols: symbols.len(),
                        }
                        .into()),
                    }
                }))
            }
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Date => match shape {
            Shape::Date | Shape::Dynamic => Ok(plan(|r| Ok(Value::Date(r.read_int())))),
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::TimeMillis => match shape {
            Shape::TimeOfDay | Shape::Dynamic => {
                Ok(plan(|r| Ok(Value::TimeMillis(r.read_int()))))
            }
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::TimeMicros => match shape {
            Shape::TimeOfDay | Shape::Dynamic => {
                Ok(plan(|r| Ok(Value::TimeMicros(r.read_long()))))
            }
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::TimestampMillis => match shape {
            Shape::Instant | Shape::Dynamic => {
                Ok(plan(|r| Ok(Value::TimestampMillis(r.read_long()))))
            }
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::TimestampMicros => match shape {
            Shape::Instant | Shape::Dynamic => {
                Ok(plan(|r| Ok(Value::TimestampMicros(r.read_long()))))
            }
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Uuid => match shape {
            // a string host takes the text as-is
            Shape::Str => Ok(plan(|r| Ok(Value::String(r.read_string())))),
            Shape::Uuid | Shape::Dynamic => Ok(plan(|r| {
                let text = r.read_string();
                if r.error().is_some() {
                    return Ok(Value::Null);
                }
                match Uuid::parse_str(&text) {
                    Ok(uuid) => Ok(Value::Uuid(uuid)),
                    Err(e) => Err(Details::ConvertStrToUuid(e).into()),
                }
            })),
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Duration(_) => match shape {
            Shape::Duration | Shape::Dynamic => Ok(plan(|r| {
                let bytes = r.read_fixed(12);
                match <[u8; 12]>::try_from(bytes) {
                    Ok(bytes) => Ok(Value::Duration(Duration::from_bytes(bytes))),
                    // short read, the sticky error carries the cause
                    Err(_) => Ok(Value::Null),
                }
            })),
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Decimal(decimal) => match shape {
            Shape::Decimal | Shape::Dynamic => Ok(decimal_decode(decimal)),
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Array(inner) => {
            let item_shape = match &shape {
                Shape::Sequence(item) => (**item).clone(),
                Shape::Dynamic => Shape::Dynamic,
                _ => return Ok(error_decode_plan(schema, &shape)),
            };
            let item_plan = decode_plan(b, &inner.items, &item_shape)?;
            Ok(plan(move |r| {
                let mut items = Vec::new();
                loop {
                    let (count, _) = r.read_block_header();
                    if count == 0 || r.error().is_some() {
                        break;
                    }
                    for _ in 0..count {
                        if r.error().is_some() {
                            break;
                        }
                        items.push(item_plan.decode_unchecked(r)?);
                    }
                }
                Ok(Value::Array(items))
            }))
        }

        Schema::Map(inner) => {
            let value_shape = match &shape {
                Shape::Mapping(value) => (**value).clone(),
                Shape::Dynamic => Shape::Dynamic,
                _ => return Ok(error_decode_plan(schema, &shape)),
            };
            let value_plan = decode_plan(b, &inner.values, &value_shape)?;
            Ok(plan(move |r| {
                let mut entries = HashMap::new();
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
                        entries.insert(key, value_plan.decode_unchecked(r)?);
                    }
                }
                Ok(Value::Map(entries))
            }))
        }

        Schema::Record(record) => match &shape {
            Shape::Struct(_) | Shape::Dynamic => {
                let fullname = record.name.fullname();
                let record = record.clone();
                let inner_shape = shape.clone();
                b.decode_named(fullname, &shape, move |b| {
                    record_decode(b, &record, &inner_shape)
                })
            }
            _ => Ok(error_decode_plan(schema, &shape)),
        },

        Schema::Union(union) => match &shape {
            Shape::Optional(inner) => optional_decode(b, schema, union, inner),
            Shape::Dynamic => union_decode(b, union),
            _ => Ok(error_decode_plan(schema, &shape)),
        },
    }
}

fn fixed_decode(size: usize) -> Arc<DecodePlan> {
    plan(move |r| Ok(Value::Fixed(size, r.read_fixed(size))))
}

fn decimal_decode(schema: &DecimalSchema) -> Arc<DecodePlan> {
    let scale = schema.scale as i64;
    let fixed_size = match &schema.inner {
        DecimalInner::Bytes => None,
        DecimalInner::Fixed(FixedSchema { size, .. }) => Some(*size),
    };
    plan(move |r| {
        let bytes = match fixed_size {
            Some(size) => r.read_fixed(size),
            None => r.read_bytes(),
        };
        let unscaled = BigInt::from_signed_bytes_be(&bytes);
        Ok(Value::Decimal(BigDecimal::new(unscaled, scale)))
    })
}

enum FieldAction {
    Decode(String, Arc<DecodePlan>),
    Skip(SkipFn),
}

fn record_decode(
    b: &mut PlanBuilder<'_>,
    record: &RecordSchema,
    shape: &Shape,
) -> AvroResult<DecodeFn> {
    let struct_shape = match shape {
        Shape::Struct(inner) => Some(inner),
        _ => None,
    };

    let mut actions = Vec::with_capacity(record.fields.len());
    let mut decoded_fields = 0usize;
    for field in &record.fields {
        let action = match struct_shape {
            Some(host) => match host.fields.iter().find(|(name, _)| name == &field.name) {
                Some((_, field_shape)) => {
                    let field_shape = field_shape.clone();
                    decoded_fields += 1;
                    FieldAction::Decode(
                        field.name.clone(),
                        decode_plan(b, &field.schema, &field_shape)?,
                    )
                }
                // the host has no such field, its wire bytes are skipped
                None => FieldAction::Skip(skip_plan(b, &field.schema)?),
            },
            None => {
                decoded_fields += 1;
                FieldAction::Decode(
                    field.name.clone(),
                    decode_plan(b, &field.schema, &Shape::Dynamic)?,
                )
            }
        };
        actions.push(action);
    }

    Ok(Box::new(move |r| {
        let mut fields = Vec::with_capacity(decoded_fields);
        for action in &actions {
            match action {
                FieldAction::Decode(name, plan) => {
                    fields.push((name.clone(), plan.decode_unchecked(r)?));
                }
                FieldAction::Skip(skip) => skip(r),
            }
        }
        Ok(Value::Record(fields))
    }))
}

fn optional_decode(
    b: &mut PlanBuilder<'_>,
    schema: &Schema,
    union: &UnionSchema,
    inner: &Shape,
) -> AvroResult<Arc<DecodePlan>> {
    let Some((null_index, value_index)) = union.nullable_pair() else {
        return Err(super::no_codec(schema, &Shape::Optional(Box::new(inner.clone()))).into());
    };
    let value_plan = decode_plan(b, &union.variants()[value_index], inner)?;
    Ok(plan(move |r| {
        let index = r.read_long();
        if r.error().is_some() {
            return Ok(Value::Null);
        }
        match index as usize {
            i if i == null_index => Ok(Value::Null),
            i if i == value_index => value_plan.decode_unchecked(r),
            _ => Err(Details::UnionIndexOutOfRange {
                index,
                num_members: 2,
            }
            .into()),
        }
    }))
}

struct MemberDecode {
    discriminant: String,
    plan: Arc<DecodePlan>,
    is_null: bool,
}

fn union_decode(b: &mut PlanBuilder<'_>, union: &UnionSchema) -> AvroResult<Arc<DecodePlan>> {
    let mut members = Vec::with_capacity(union.variants().len());
    for member in union.variants() {
        let resolved = match member {
            Schema::Ref { name } => b.target_of(name)?,
            other => other.clone(),
        };
        members.push(MemberDecode {
            discriminant: resolved.union_discriminant(),
            plan: decode_plan(b, member, &Shape::Dynamic)?,
            is_null: matches!(resolved, Schema::Null),
        });
    }
    let simple_nullable = union.nullable_pair().is_some();

    Ok(plan(move |r| {
        let index = r.read_long();
        if r.error().is_some() {
            return Ok(Value::Null);
        }
        let member = usize::try_from(index)
            .ok()
            .and_then(|i| members.get(i))
            .ok_or(Details::UnionIndexOutOfRange {
                index,
                num_members: members.len(),
            })?;
        if member.is_null {
            return Ok(Value::Null);
        }
        let value = member.plan.decode_unchecked(r)?;
        if simple_nullable {
            // a simple nullable union decodes to the plain value
            Ok(value)
        } else {
            // a general union decodes to its wrapped form
            let mut wrapped = HashMap::with_capacity(1);
            wrapped.insert(member.discriminant.clone(), value);
            Ok(Value::Map(wrapped))
        }
    }))
}

/// Builds the plan that discards the wire bytes of one value of `schema`,
/// used when the host side has no field to decode into.
pub(super) fn skip_plan(b: &mut PlanBuilder<'_>, schema: &Schema) -> AvroResult<SkipFn> {
    Ok(match schema {
        Schema::Ref { name } => {
            let target = b.target_of(name)?;
            skip_plan(b, &target)?
        }
        Schema::Null => Arc::new(|_: &mut rw::Reader<'_>| {}),
        Schema::Boolean => Arc::new(|r: &mut rw::Reader<'_>| r.skip(1)),
        Schema::Int
        | Schema::Long
        | Schema::Date
        | Schema::TimeMillis
        | Schema::TimeMicros
        | Schema::TimestampMillis
        | Schema::TimestampMicros => Arc::new(|r: &mut rw::Reader<'_>| {
            r.read_long();
        }),
        Schema::Float => Arc::new(|r: &mut rw::Reader<'_>| r.skip(4)),
        Schema::Double => Arc::new(|r: &mut rw::Reader<'_>| r.skip(8)),
        Schema::Bytes
        | Schema::String
        | Schema::Uuid
        | Schema::Decimal(DecimalSchema {
            inner: DecimalInner::Bytes,
            ..
        }) => Arc::new(skip_length_prefixed),
        Schema::Fixed(FixedSchema { size, .. })
        | Schema::Duration(FixedSchema { size, .. })
        | Schema::Decimal(DecimalSchema {
            inner: DecimalInner::Fixed(FixedSchema { size, .. }),
            ..
        }) => {
            let size = *size as u64;
            Arc::new(move |r: &mut rw::Reader<'_>| r.skip(size))
        }
        Schema::Enum(_) => Arc::new(|r: &mut rw::Reader<'_>| {
            r.read_long();
        }),
        Schema::Array(inner) => {
            let item_skip = skip_plan(b, &inner.items)?;
            Arc::new(move |r: &mut rw::Reader<'_>| skip_blocks(r, |r| item_skip(r)))
        }
        Schema::Map(inner) => {
            let value_skip = skip_plan(b, &inner.values)?;
            Arc::new(move |r: &mut rw::Reader<'_>| {
                skip_blocks(r, |r| {
                    skip_length_prefixed(r);
                    value_skip(r);
                })
            })
        }
        Schema::Record(record) => {
            let fullname = record.name.fullname();
            let record = record.clone();
            b.skip_named(fullname, move |b| {
                let field_skips = record
                    .fields
                    .iter()
                    .map(|field| skip_plan(b, &field.schema))
                    .collect::<AvroResult<Vec<_>>>()?;
                Ok(Arc::new(move |r: &mut rw::Reader<'_>| {
                    for skip in &field_skips {
                        skip(r);
                    }
                }) as SkipFn)
            })?
        }
        Schema::Union(union) => {
            let member_skips = union
                .variants()
                .iter()
                .map(|member| skip_plan(b, member))
                .collect::<AvroResult<Vec<_>>>()?;
            Arc::new(move |r: &mut rw::Reader<'_>| {
                let index = r.read_long();
                if r.error().is_some() {
                    return;
                }
                match usize::try_from(index).ok().and_then(|i| member_skips.get(i)) {
                    Some(skip) => skip(r),
                    None => r.fail(Details::UnionIndexOutOfRange {
                        index,
                        num_members: member_skips.len(),
                    }),
                }
            })
        }
    })
}

fn skip_length_prefixed(r: &mut rw::Reader<'_>) {
    let len = r.read_long();
    if len < 0 {
        r.fail(Details::NegativeLength(len));
    } else if len > 0 {
        r.skip(len as u64);
    }
}

/// Walks array/map block framing, taking the byte-size fast path when the
/// writer provided one via a negative count.
fn skip_blocks(r: &mut rw::Reader<'_>, mut skip_item: impl FnMut(&mut rw::Reader<'_>)) {
    loop {
        let (count, size) = r.read_block_header();
        if count == 0 || r.error().is_some() {
            return;
        }
        if size > 0 {
            r.skip(size);
            continue;
        }
        for _ in 0..count {
            if r.error().is_some() {
                return;
            }
            skip_item(r);
        }
    }
}
