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

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Describes the shape of a host value, the second half of the
/// `(schema, shape)` pair a codec plan is resolved for.
///
/// Shapes are descriptors, not data: an application describes its types once
/// (or registers them by name for recursive types and union dispatch) and
/// the resolver binds them against a schema.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// The absent value; binds only to the `null` schema.
    Null,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    /// A variable-length byte sequence.
    Bytes,
    /// A UTF-8 string.
    Str,
    /// A byte array of exactly this many bytes.
    FixedBytes(usize),
    /// A calendar date, carried as days since the Unix epoch.
    Date,
    /// A time of day, in milli- or microseconds after midnight.
    TimeOfDay,
    /// A wall-clock instant, always UTC.
    Instant,
    /// An arbitrary-precision decimal value.
    Decimal,
    Uuid,
    /// A months/days/milliseconds span.
    Duration,
    /// A struct with named, ordered fields.
    Struct(StructShape),
    /// A variable-length ordered sequence.
    Sequence(Box<Shape>),
    /// An associative mapping with string keys.
    Mapping(Box<Shape>),
    /// An optional box; binds only to `[null, T]` / `[T, null]` unions.
    Optional(Box<Shape>),
    /// An indirection through the shape registry, which is what makes
    /// recursive host types expressible.
    Named(String),
    /// A runtime-typed value; binds to anything, including general unions.
    Dynamic,
}

/// The named, ordered fields of a [`Shape::Struct`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructShape {
    pub name: String,
    pub fields: Vec<(String, Shape)>,
}

impl Shape {
    /// A struct shape from `(field name, field shape)` pairs.
    pub fn record(name: &str, fields: impl IntoIterator<Item = (&'static str, Shape)>) -> Shape {
        Shape::Struct(StructShape {
            name: name.to_string(),
            fields: fields
                .into_iter()
                .map(|(name, shape)| (name.to_string(), shape))
                .collect(),
        })
    }

    pub fn optional(inner: Shape) -> Shape {
        Shape::Optional(Box::new(inner))
    }

    pub fn sequence(inner: Shape) -> Shape {
        Shape::Sequence(Box::new(inner))
    }

    pub fn mapping(inner: Shape) -> Shape {
        Shape::Mapping(Box::new(inner))
    }

    /// A short label for error messages.
    pub(crate) fn label(&self) -> String {
        match self {
            Shape::Struct(inner) => format!("struct {}", inner.name),
            Shape::Named(name) => format!("named shape {name}"),
            other => format!("{other:?}"),
        }
    }
}

/// A mapping of names to value shapes, consulted by the resolver to pick a
/// union branch for a dynamic value of a named type and to expand
/// [`Shape::Named`] indirections.
///
/// The registry is append-only; registering a name again overwrites the
/// earlier shape (last writer wins). Cloning shares the underlying table.
#[derive(Clone, Default)]
pub struct ShapeRegistry {
    inner: Arc<RwLock<HashMap<String, Shape>>>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, shape: Shape) {
        self.inner
            .write()
            .expect("shape registry lock poisoned")
            .insert(name.to_string(), shape);
    }

    pub fn get(&self, name: &str) -> Option<Shape> {
        self.inner
            .read()
            .expect("shape registry lock poisoned")
            .get(name)
            .cloned()
    }
}

/// The process-wide default registry. [`crate::resolver::Resolver::new`]
/// snapshots a handle to this; a registry can also be threaded explicitly
/// with [`crate::resolver::Resolver::with_registry`].
pub(crate) fn global_registry() -> &'static ShapeRegistry {
    static GLOBAL: OnceLock<ShapeRegistry> = OnceLock::new();
    GLOBAL.get_or_init(ShapeRegistry::default)
}

/// Registers a shape under a schema full name in the process-wide registry.
pub fn register_shape(name: &str, shape: Shape) {
    global_registry().register(name, shape);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn registry_is_last_writer_wins() {
        let registry = ShapeRegistry::new();
        registry.register("t", Shape::Int32);
        registry.register("t", Shape::Int64);
        assert_eq!(registry.get("t"), Some(Shape::Int64));
        assert_eq!(registry.get("missing"), None);
    }

    #[test]
    fn shapes_hash_as_plan_cache_keys() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Shape::sequence(Shape::Int32));
        assert!(set.contains(&Shape::Sequence(Box::new(Shape::Int32))));
        assert!(!set.contains(&Shape::sequence(Shape::Int64)));
    }
}
