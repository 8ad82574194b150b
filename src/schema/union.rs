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
use crate::schema::{Schema, SchemaKind};
use crate::AvroResult;
use std::collections::HashSet;

/// A description of a Union schema.
#[derive(Debug, Clone)]
pub struct UnionSchema {
    pub(crate) schemas: Vec<Schema>,
}

impl UnionSchema {
    /// Creates a new `UnionSchema` from a vector of member schemas.
    ///
    /// # Errors
    /// A union may not directly contain another union, may not contain two
    /// unnamed members of the same kind, and may not contain two named
    /// members with the same full name.
    pub fn new(schemas: Vec<Schema>) -> AvroResult<Self> {
        if schemas.is_empty() {
            return Err(Details::EmptyUnion.into());
        }
        let mut kinds: HashSet<SchemaKind> = HashSet::new();
        let mut named: HashSet<String> = HashSet::new();
        for schema in schemas.iter() {
            if let Schema::Union(_) = schema {
                return Err(Details::GetNestedUnion.into());
            }
            if let Some(name) = schema.name() {
                if !named.insert(name.fullname()) {
                    return Err(Details::GetUnionDuplicate.into());
                }
            } else if !kinds.insert(SchemaKind::from(schema)) {
                return Err(Details::GetUnionDuplicate.into());
            }
        }
        Ok(UnionSchema { schemas })
    }

    /// Returns a slice of all members of this union.
    pub fn variants(&self) -> &[Schema] {
        &self.schemas
    }

    /// Returns true if any member of this union is `Null`.
    pub fn is_nullable(&self) -> bool {
        self.schemas.iter().any(|x| matches!(x, Schema::Null))
    }

    /// For a two-member union where exactly one member is `Null`, returns
    /// `(null_index, non_null_index)`. Anything else is not a simple
    /// nullable union and yields `None`.
    pub fn nullable_pair(&self) -> Option<(usize, usize)> {
        if self.schemas.len() != 2 {
            return None;
        }
        match (&self.schemas[0], &self.schemas[1]) {
            (Schema::Null, Schema::Null) => None,
            (Schema::Null, _) => Some((0, 1)),
            (_, Schema::Null) => Some((1, 0)),
            _ => None,
        }
    }

}

impl PartialEq for UnionSchema {
    fn eq(&self, other: &UnionSchema) -> bool {
        self.schemas.eq(&other.schemas)
    }
}
