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

//! The codec resolver: turns a `(schema, value shape)` pair into an encode
//! plan and a decode plan once, so that the hot path performs no schema
//! interpretation at all.
//!
//! Plans are composed closures over the primitive wire layer. Resolution
//! failures are themselves plans: an unsupported pair yields a plan that
//! returns the resolution error on first use, never a panic. Plans are
//! cached per resolver under `(schema fingerprint, shape)`.

mod decode;
mod encode;
mod shape;

pub use shape::{register_shape, Shape, ShapeRegistry, StructShape};

use crate::error::Details;
use crate::rw;
use crate::schema::{Name, Names, Schema};
use crate::value::Value;
use crate::AvroResult;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

pub(crate) type EncodeFn = Box<dyn Fn(&Value, &mut rw::Writer) -> AvroResult<()> + Send + Sync>;
pub(crate) type DecodeFn = Box<dyn Fn(&mut rw::Reader<'_>) -> AvroResult<Value> + Send + Sync>;
pub(crate) type SkipFn = Arc<dyn Fn(&mut rw::Reader<'_>) + Send + Sync>;

/// A precompiled encoder for one `(schema, shape)` pair.
pub struct EncodePlan {
    run: EncodeFn,
}

impl EncodePlan {
    pub(crate) fn new(run: EncodeFn) -> Self {
        EncodePlan { run }
    }

    /// Encodes `value` into `out`. Value mismatches surface here; sink
    /// errors cannot happen until the buffer is flushed.
    pub fn encode(&self, value: &Value, out: &mut rw::Writer) -> AvroResult<()> {
        (self.run)(value, out)
    }
}

/// A precompiled decoder for one `(schema, shape)` pair.
pub struct DecodePlan {
    run: DecodeFn,
}

impl DecodePlan {
    pub(crate) fn new(run: DecodeFn) -> Self {
        DecodePlan { run }
    }

    /// Decodes one value. The reader's sticky error is checked once at the
    /// end of the unit, so a caller gets either a value or the first error.
    pub fn decode(&self, reader: &mut rw::Reader<'_>) -> AvroResult<Value> {
        let value = (self.run)(reader)?;
        reader.check()?;
        Ok(value)
    }

    /// Decodes one value without the terminal error check, for callers that
    /// drive several units against one reader.
    pub(crate) fn decode_unchecked(&self, reader: &mut rw::Reader<'_>) -> AvroResult<Value> {
        (self.run)(reader)
    }
}

type PlanKey = ([u8; 32], Shape);

/// Builds and caches codec plans.
///
/// The resolver is safe to share across threads: the plan caches are
/// read-mostly maps, duplicate concurrent plan builds are permitted and the
/// later insert wins (the plans are functionally equivalent).
pub struct Resolver {
    registry: ShapeRegistry,
    encoders: RwLock<HashMap<PlanKey, Arc<EncodePlan>>>,
    decoders: RwLock<HashMap<PlanKey, Arc<DecodePlan>>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// A resolver over the process-wide shape registry.
    pub fn new() -> Self {
        Self::with_registry(shape::global_registry().clone())
    }

    /// A resolver over an explicitly provided shape registry.
    pub fn with_registry(registry: ShapeRegistry) -> Self {
        Resolver {
            registry,
            encoders: RwLock::new(HashMap::new()),
            decoders: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves the encode plan for `(schema, shape)`.
    pub fn encoder(&self, schema: &Schema, shape: &Shape) -> AvroResult<Arc<EncodePlan>> {
        let key = (schema.fingerprint_sha256(), shape.clone());
        if let Some(plan) = self.encoders.read().expect("plan cache poisoned").get(&key) {
            return Ok(plan.clone());
        }
        let names = schema.names()?;
        let mut builder = PlanBuilder::new(&names, &self.registry);
        let plan = encode::encode_plan(&mut builder, schema, shape)?;
        self.encoders
            .write()
            .expect("plan cache poisoned")
            .insert(key, plan.clone());
        Ok(plan)
    }

    /// Resolves the decode plan for `(schema, shape)`.
    pub fn decoder(&self, schema: &Schema, shape: &Shape) -> AvroResult<Arc<DecodePlan>> {
        let key = (schema.fingerprint_sha256(), shape.clone());
        if let Some(plan) = self.decoders.read().expect("plan cache poisoned").get(&key) {
            return Ok(plan.clone());
        }
        let names = schema.names()?;
        let mut builder = PlanBuilder::new(&names, &self.registry);
        let plan = decode::decode_plan(&mut builder, schema, shape)?;
        self.decoders
            .write()
            .expect("plan cache poisoned")
            .insert(key, plan.clone());
        Ok(plan)
    }
}

/// The process-wide resolver behind the convenience datum functions and the
/// container reader/writer.
pub(crate) fn default_resolver() -> &'static Resolver {
    static DEFAULT: OnceLock<Resolver> = OnceLock::new();
    DEFAULT.get_or_init(Resolver::new)
}

/// Per-resolution state: the name table of the schema root and slots that
/// tie recursive references back to the plan being built.
pub(crate) struct PlanBuilder<'a> {
    names: &'a Names,
    registry: &'a ShapeRegistry,
    encode_slots: HashMap<(String, Shape), Arc<OnceLock<Arc<EncodePlan>>>>,
    decode_slots: HashMap<(String, Shape), Arc<OnceLock<Arc<DecodePlan>>>>,
    skip_slots: HashMap<String, Arc<OnceLock<SkipFn>>>,
}

impl<'a> PlanBuilder<'a> {
    fn new(names: &'a Names, registry: &'a ShapeRegistry) -> Self {
        PlanBuilder {
            names,
            registry,
            encode_slots: HashMap::new(),
            decode_slots: HashMap::new(),
            skip_slots: HashMap::new(),
        }
    }

    pub(crate) fn names(&self) -> &Names {
        self.names
    }

    pub(crate) fn registry(&self) -> &ShapeRegistry {
        self.registry
    }

    pub(crate) fn target_of(&self, name: &Name) -> AvroResult<Schema> {
        self.names
            .get(name)
            .cloned()
            .ok_or_else(|| Details::UnresolvedRef(name.clone()).into())
    }

    /// Expands [`Shape::Named`] through the registry. Bounded, so a registry
    /// cycle of names degenerates into a resolution error instead of a hang.
    pub(crate) fn expand_shape(&self, shape: &Shape) -> AvroResult<Shape> {
        let mut current = shape.clone();
        for _ in 0..32 {
            match current {
                Shape::Named(name) => {
                    current = self
                        .registry
                        .get(&name)
                        .ok_or(Details::UnregisteredShapeName(name))?;
                }
                other => return Ok(other),
            }
        }
        Err(Details::UnregisteredShapeName(shape.label()).into())
    }

    /// Runs `build` for the named schema behind a slot, so that a recursive
    /// reference encountered during the build resolves to the finished plan.
    pub(crate) fn encode_named(
        &mut self,
        fullname: String,
        shape: &Shape,
        build: impl FnOnce(&mut Self) -> AvroResult<EncodeFn>,
    ) -> AvroResult<Arc<EncodePlan>> {
        let key = (fullname, shape.clone());
        if let Some(slot) = self.encode_slots.get(&key) {
            if let Some(plan) = slot.get() {
                return Ok(plan.clone());
            }
            return Ok(deferred_encode(slot.clone(), key.0));
        }
        let slot = Arc::new(OnceLock::new());
        self.encode_slots.insert(key, slot.clone());
        let plan = Arc::new(EncodePlan::new(build(self)?));
        let _ = slot.set(plan.clone());
        Ok(plan)
    }

    pub(crate) fn decode_named(
        &mut self,
        fullname: String,
        shape: &Shape,
        build: impl FnOnce(&mut Self) -> AvroResult<DecodeFn>,
    ) -> AvroResult<Arc<DecodePlan>> {
        let key = (fullname, shape.clone());
        if let Some(slot) = self.decode_slots.get(&key) {
            if let Some(plan) = slot.get() {
                return Ok(plan.clone());
            }
            return Ok(deferred_decode(slot.clone(), key.0));
        }
        let slot = Arc::new(OnceLock::new());
        self.decode_slots.insert(key, slot.clone());
        let plan = Arc::new(DecodePlan::new(build(self)?));
        let _ = slot.set(plan.clone());
        Ok(plan)
    }

    pub(crate) fn skip_named(
        &mut self,
        fullname: String,
        build: impl FnOnce(&mut Self) -> AvroResult<SkipFn>,
    ) -> AvroResult<SkipFn> {
        if let Some(slot) = self.skip_slots.get(&fullname) {
            if let Some(skip) = slot.get() {
                return Ok(skip.clone());
            }
            let slot = slot.clone();
            let deferred: SkipFn = Arc::new(move |r: &mut rw::Reader<'_>| {
                if let Some(skip) = slot.get() {
                    skip(r);
                }
            });
            return Ok(deferred);
        }
        let slot = Arc::new(OnceLock::new());
        self.skip_slots.insert(fullname, slot.clone());
        let skip = build(self)?;
        let _ = slot.set(skip.clone());
        Ok(skip)
    }
}

fn deferred_encode(slot: Arc<OnceLock<Arc<EncodePlan>>>, fullname: String) -> Arc<EncodePlan> {
    Arc::new(EncodePlan::new(Box::new(move |value, out| {
        match slot.get() {
            Some(plan) => plan.encode(value, out),
            None => Err(Details::UnresolvedRef(Name::new(&fullname).unwrap_or(Name {
                name: fullname.clone(),
                namespace: None,
            }))
            .into()),
        }
    })))
}

fn deferred_decode(slot: Arc<OnceLock<Arc<DecodePlan>>>, fullname: String) -> Arc<DecodePlan> {
    Arc::new(DecodePlan::new(Box::new(move |reader| {
        match slot.get() {
            Some(plan) => plan.decode_unchecked(reader),
            None => Err(Details::UnresolvedRef(Name::new(&fullname).unwrap_or(Name {
                name: fullname.clone(),
                namespace: None,
            }))
            .into()),
        }
    })))
}

/// The plan produced for a `(schema, shape)` pair outside the decision
/// table: resolution succeeds, the first use fails.
pub(crate) fn no_codec(schema: &Schema, shape: &Shape) -> Details {
    Details::NoCodec {
        schema: schema.to_string(),
        shape: shape.label(),
    }
}

pub(crate) fn error_encode_plan(schema: &Schema, shape: &Shape) -> Arc<EncodePlan> {
    let schema = schema.to_string();
    let shape = shape.label();
    Arc::new(EncodePlan::new(Box::new(move |_, _| {
        Err(Details::NoCodec {
            schema: schema.clone(),
            shape: shape.clone(),
        }
        .into())
    })))
}

pub(crate) fn error_decode_plan(schema: &Schema, shape: &Shape) -> Arc<DecodePlan> {
    let schema = schema.to_string();
    let shape = shape.label();
    Arc::new(DecodePlan::new(Box::new(move |_| {
        Err(Details::NoCodec {
            schema: schema.clone(),
            shape: shape.clone(),
        }
        .into())
    })))
}
