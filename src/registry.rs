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

//! A client for the Confluent Schema Registry HTTP API.
//!
//! The client is peripheral to the codec core: it fetches and registers
//! schema texts and hands back parsed [`Schema`]s, caching by registry id.
//! HTTP plumbing sits behind the [`Transport`] trait; the default transport
//! is a blocking [`ureq`] agent, keeping with the crate's synchronous model.

use crate::error::Details;
use crate::schema::Schema;
use crate::AvroResult;
use base64::Engine;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, RwLock};
use std::time::Duration;

const CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

/// A schema version registered under a subject.
#[derive(Clone, Debug)]
pub struct SchemaInfo {
    pub id: i32,
    pub version: i32,
    pub schema: Arc<Schema>,
}

/// Blocking HTTP transport used by [`Client`]. Implement it to swap in a
/// different HTTP stack or to test without sockets.
pub trait Transport: Send + Sync {
    /// Performs a GET, returning the status code and the raw body.
    fn get(&self, url: &str) -> Result<(u16, Vec<u8>), String>;

    /// Performs a POST with the registry content type.
    fn post(&self, url: &str, body: &[u8]) -> Result<(u16, Vec<u8>), String>;
}

/// The default [`Transport`]: a [`ureq`] agent with an optional basic-auth
/// identity and a request timeout.
pub struct HttpTransport {
    agent: ureq::Agent,
    authorization: Option<String>,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        HttpTransport {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            authorization: None,
        }
    }

    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        self.authorization = Some(format!("Basic {credentials}"));
        self
    }

    fn run(&self, request: ureq::Request, body: Option<&[u8]>) -> Result<(u16, Vec<u8>), String> {
        let mut request = request.set("Accept", CONTENT_TYPE);
        if let Some(authorization) = &self.authorization {
            request = request.set("Authorization", authorization);
        }
        let outcome = match body {
            Some(body) => request.set("Content-Type", CONTENT_TYPE).send_bytes(body),
            None => request.call(),
        };
        let response = match outcome {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(e.to_string()),
        };
        let status = response.status();
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| e.to_string())?;
        Ok((status, bytes))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<(u16, Vec<u8>), String> {
        self.run(self.agent.get(url), None)
    }

    fn post(&self, url: &str, body: &[u8]) -> Result<(u16, Vec<u8>), String> {
        self.run(self.agent.post(url), Some(body))
    }
}

#[derive(Deserialize)]
struct SchemaBody {
    schema: String,
}

#[derive(Deserialize)]
struct SubjectVersionBody {
    id: i32,
    version: i32,
    schema: String,
}

#[derive(Deserialize)]
struct IdBody {
    id: i32,
}

#[derive(Deserialize)]
struct ErrorBody {
    error_code: i32,
    message: String,
}

/// A Schema Registry client with an id-keyed schema cache.
///
/// The client is safe for concurrent use; parsed schemas are shared behind
/// `Arc`s.
pub struct Client {
    base_url: String,
    transport: Box<dyn Transport>,
    cache: RwLock<HashMap<i32, Arc<Schema>>>,
}

impl Client {
    /// A client over the default HTTP transport.
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(base_url, Box::new(HttpTransport::default()))
    }

    /// A client over a custom transport.
    pub fn with_transport(base_url: &str, transport: Box<dyn Transport>) -> Self {
        Client {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Fetches the schema registered under `id`, consulting the cache first.
    pub fn schema(&self, id: i32) -> AvroResult<Arc<Schema>> {
        if let Some(schema) = self.cache.read().expect("cache poisoned").get(&id) {
            return Ok(schema.clone());
        }
        let body: SchemaBody = self.get(&format!("/schemas/ids/{id}"))?;
        let schema = Arc::new(Schema::parse_str(&body.schema)?);
        self.cache
            .write()
            .expect("cache poisoned")
            .insert(id, schema.clone());
        Ok(schema)
    }

    /// All registered subjects.
    pub fn subjects(&self) -> AvroResult<Vec<String>> {
        self.get("/subjects")
    }

    /// All versions registered under `subject`.
    pub fn versions(&self, subject: &str) -> AvroResult<Vec<i32>> {
        self.get(&format!("/subjects/{subject}/versions"))
    }

    /// The schema registered under `subject` at `version`.
    pub fn schema_by_version(&self, subject: &str, version: i32) -> AvroResult<SchemaInfo> {
        let body: SubjectVersionBody =
            self.get(&format!("/subjects/{subject}/versions/{version}"))?;
        self.into_info(body)
    }

    /// The latest schema registered under `subject`.
    pub fn latest_schema(&self, subject: &str) -> AvroResult<Arc<Schema>> {
        Ok(self.latest_schema_info(subject)?.schema)
    }

    /// The latest schema version registered under `subject`, with its
    /// registry id and version number.
    pub fn latest_schema_info(&self, subject: &str) -> AvroResult<SchemaInfo> {
        let body: SubjectVersionBody =
            self.get(&format!("/subjects/{subject}/versions/latest"))?;
        self.into_info(body)
    }

    /// Registers `schema_text` under `subject` and returns the parsed schema
    /// with its assigned id.
    pub fn create_schema(&self, subject: &str, schema_text: &str) -> AvroResult<Arc<Schema>> {
        let body: IdBody = self.post(
            &format!("/subjects/{subject}/versions"),
            &schema_payload(schema_text),
        )?;
        let schema = Arc::new(Schema::parse_str(schema_text)?);
        self.cache
            .write()
            .expect("cache poisoned")
            .insert(body.id, schema.clone());
        Ok(schema)
    }

    /// Checks whether `schema_text` is already registered under `subject`,
    /// returning its registration. An unregistered schema surfaces as a
    /// [`Details::Registry`] error with the registry's 404 code.
    pub fn is_registered(&self, subject: &str, schema_text: &str) -> AvroResult<SchemaInfo> {
        let body: SubjectVersionBody =
            self.post(&format!("/subjects/{subject}"), &schema_payload(schema_text))?;
        self.into_info(body)
    }

    fn into_info(&self, body: SubjectVersionBody) -> AvroResult<SchemaInfo> {
        let schema = Arc::new(Schema::parse_str(&body.schema)?);
        self.cache
            .write()
            .expect("cache poisoned")
            .insert(body.id, schema.clone());
        Ok(SchemaInfo {
            id: body.id,
            version: body.version,
            schema,
        })
    }

    fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> AvroResult<T> {
        let url = format!("{}{path}", self.base_url);
        let (status, body) = self
            .transport
            .get(&url)
            .map_err(Details::RegistryTransport)?;
        parse_response(status, &body)
    }

    fn post<T: serde::de::DeserializeOwned>(&self, path: &str, body: &[u8]) -> AvroResult<T> {
        let url = format!("{}{path}", self.base_url);
        let (status, body) = self
            .transport
            .post(&url, body)
            .map_err(Details::RegistryTransport)?;
        parse_response(status, &body)
    }
}

fn schema_payload(schema_text: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({ "schema": schema_text }))
        .expect("a string field always serializes")
}

fn parse_response<T: serde::de::DeserializeOwned>(status: u16, body: &[u8]) -> AvroResult<T> {
    if status >= 400 {
        let error: ErrorBody = serde_json::from_slice(body).unwrap_or(ErrorBody {
            error_code: -1,
            message: String::from_utf8_lossy(body).to_string(),
        });
        return Err(Details::Registry {
            status,
            code: error.error_code,
            message: error.message,
        }
        .into());
    }
    serde_json::from_slice(body).map_err(|e| Details::RegistryResponse(e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Canned transport: answers from a URL-keyed table and counts hits.
    struct FakeTransport {
        responses: HashMap<String, (u16, Vec<u8>)>,
        hits: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn new(responses: &[(&str, u16, &str)]) -> Self {
            FakeTransport {
                responses: responses
                    .iter()
                    .map(|(url, status, body)| {
                        (url.to_string(), (*status, body.as_bytes().to_vec()))
                    })
                    .collect(),
                hits: Mutex::new(Vec::new()),
            }
        }

        fn answer(&self, url: &str) -> Result<(u16, Vec<u8>), String> {
            self.hits.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| format!("no canned response for {url}"))
        }
    }

    impl Transport for FakeTransport {
        fn get(&self, url: &str) -> Result<(u16, Vec<u8>), String> {
            self.answer(url)
        }

        fn post(&self, url: &str, _body: &[u8]) -> Result<(u16, Vec<u8>), String> {
            self.answer(url)
        }
    }

    #[test]
    fn schema_by_id_is_cached() {
        let transport = FakeTransport::new(&[(
            "http://registry/schemas/ids/5",
            200,
            r#"{"schema": "\"string\""}"#,
        )]);
        let client = Client::with_transport("http://registry", Box::new(transport));

        let first = client.schema(5).unwrap();
        let again = client.schema(5).unwrap();
        assert_eq!(*first, Schema::String);
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn subjects_and_versions_deserialize() {
        let transport = FakeTransport::new(&[
            ("http://registry/subjects", 200, r#"["events", "orders"]"#),
            ("http://registry/subjects/events/versions", 200, "[1, 2, 3]"),
        ]);
        let client = Client::with_transport("http://registry", Box::new(transport));

        assert_eq!(client.subjects().unwrap(), vec!["events", "orders"]);
        assert_eq!(client.versions("events").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn latest_schema_info_parses_the_schema() {
        let transport = FakeTransport::new(&[(
            "http://registry/subjects/events/versions/latest",
            200,
            r#"{"subject": "events", "id": 7, "version": 3, "schema": "\"long\""}"#,
        )]);
        let client = Client::with_transport("http://registry", Box::new(transport));

        let info = client.latest_schema_info("events").unwrap();
        assert_eq!(info.id, 7);
        assert_eq!(info.version, 3);
        assert_eq!(*info.schema, Schema::Long);
        // the fetch also primed the id cache
        assert_eq!(*client.schema(7).unwrap(), Schema::Long);
    }

    #[test]
    fn error_bodies_carry_registry_codes() {
        let transport = FakeTransport::new(&[(
            "http://registry/subjects/missing/versions",
            404,
            r#"{"error_code": 40401, "message": "Subject not found"}"#,
        )]);
        let client = Client::with_transport("http://registry", Box::new(transport));

        match client.versions("missing").unwrap_err().into_details() {
            Details::Registry {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(code, 40401);
                assert_eq!(message, "Subject not found");
            }
            other => panic!("expected Registry, got {other:?}"),
        }
    }
}
