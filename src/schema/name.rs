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
use crate::util::MapHelper;
use crate::validator::{validate_namespace, validate_schema_name};
use crate::AvroResult;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Represents the namespace of a named schema. `None` is the only valid
/// "no namespace"; an explicitly provided empty namespace is rejected.
pub type Namespace = Option<String>;

/// Lookup of named schemas reachable from a root, keyed by full name.
pub type Names = HashMap<Name, crate::schema::Schema>;

/// Represents names for `record`, `enum` and `fixed` Avro schemas, composed
/// of a name and an optional dot-separated namespace.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Name {
    pub name: String,
    pub namespace: Namespace,
}

impl Name {
    /// Create a new `Name`, splitting off an inline dotted namespace when
    /// present.
    pub fn new(name: &str) -> AvroResult<Self> {
        Self::new_with_enclosing_namespace(name, None)
    }

    /// Create a new `Name`, falling back to `enclosing_namespace` when the
    /// name carries no namespace of its own.
    pub fn new_with_enclosing_namespace(
        name: &str,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Self> {
        let index_of_name = validate_schema_name(name)?;
        if index_of_name > 1 {
            // A dotted name supplies its own namespace.
            Ok(Self {
                name: name[index_of_name..].to_string(),
                namespace: Some(name[..index_of_name - 1].to_string()),
            })
        } else if index_of_name == 1 {
            // A leading dot is the explicit "no namespace".
            Ok(Self {
                name: name[1..].to_string(),
                namespace: None,
            })
        } else {
            let namespace = match enclosing_namespace {
                Some(ns) if !ns.is_empty() => {
                    validate_namespace(ns)?;
                    Some(ns.to_string())
                }
                _ => None,
            };
            Ok(Self {
                name: name.to_string(),
                namespace,
            })
        }
    }

    /// Parse the `name`/`namespace` attributes of a JSON schema object into
    /// a `Name`, resolving against the enclosing namespace.
    pub(crate) fn parse(
        complex: &Map<String, Value>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Self> {
        let name_field = complex.name().ok_or(Details::GetNameField)?;
        let explicit_namespace = complex.string("namespace");
        if let Some(ns) = &explicit_namespace {
            validate_namespace(ns)?;
        }
        Self::new_with_enclosing_namespace(
            &name_field,
            explicit_namespace.as_deref().or(enclosing_namespace),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The dotted full name.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{ns}.")?;
        }
        f.write_str(&self.name)
    }
}
