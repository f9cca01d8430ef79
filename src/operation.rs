//! Operation Binding
//!
//! Walks the document's `paths` into [`OperationDescriptor`]s and turns a
//! descriptor plus call arguments into a concrete [`ApiRequest`].
//!
//! Binding is best-effort: malformed parameter declarations are skipped
//! with a warning and never fail the build. Required-parameter checks
//! happen at invocation time, when the caller's arguments are known.

use std::collections::HashSet;

use serde_json::{Map, Value};
use strum::{Display, EnumString};
use tracing::{debug, warn};
use url::Url;

use crate::document::SchemaDocument;
use crate::error::{BindError, Result};
use crate::names;
use crate::synth::TypeSynthesizer;
use crate::transport::ApiRequest;
use crate::types::{FieldType, TypeId, TypedInstance};

/// HTTP methods recognized as operation keys in a path item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Trace => reqwest::Method::TRACE,
        }
    }
}

/// Where a parameter is carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    /// Folded into a `Cookie` header at request-build time
    Cookie,
}

impl ParamLocation {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

/// One declared parameter of an operation.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    /// Name as declared in the document (the wire name)
    pub raw_name: String,
    /// Translated snake_case name
    pub name: String,
    pub location: ParamLocation,
    /// Path parameters are required by construction
    pub required: bool,
    pub ty: FieldType,
    pub description: Option<String>,
}

/// Synthesized, immutable description of one callable API operation.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub method: HttpMethod,
    /// Path template with `{name}` placeholders
    pub path: String,
    /// `operationId` as declared in the document
    pub operation_id: String,
    /// Translated method name; the assembler may suffix it on collision
    pub method_name: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// First declared tag; operations without tags land in the default
    /// group
    pub tag: Option<String>,
    /// Declaration order: inherited path-level parameters first, then
    /// operation-level additions; operation-level wins on name+location
    pub parameters: Vec<ParameterDescriptor>,
    pub request_body: Option<FieldType>,
    pub body_required: bool,
    /// Typed response marshalling target, when the success response is an
    /// object schema
    pub response: Option<TypeId>,
}

// =============================================================================
// Call Arguments
// =============================================================================

/// Arguments for one invocation, keyed by parameter name.
///
/// Names are matched against the declared raw (wire) name first, then the
/// translated name, so both spellings work at call sites.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    values: Map<String, Value>,
    body: Option<Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Set the request body from a raw JSON value.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the request body from a constructed typed instance.
    pub fn typed_body(mut self, instance: &TypedInstance) -> Self {
        self.body = Some(instance.to_value());
        self
    }

    fn get(&self, raw_name: &str, translated: &str) -> Option<&Value> {
        self.values
            .get(raw_name)
            .or_else(|| self.values.get(translated))
    }

    fn body_value(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

// =============================================================================
// Binding
// =============================================================================

/// Bind every declared operation in the document, in declaration order.
///
/// Operations without an `operationId` are skipped with a warning,
/// matching best-effort synthesis; unresolvable references inside
/// parameter or body schemas abort the build.
pub fn bind_operations<'doc>(
    document: &'doc SchemaDocument,
    synth: &mut TypeSynthesizer<'doc>,
) -> Result<Vec<OperationDescriptor>> {
    let Some(paths) = document.paths() else {
        return Ok(Vec::new());
    };

    let mut operations = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (path, item_node) in paths {
        let item = synth.resolve(item_node)?;
        let Some(item_obj) = item.node.as_object() else {
            continue;
        };

        let shared_params = item_obj.get("parameters").and_then(Value::as_array);

        for (key, op_node) in item_obj {
            let Ok(method) = key.parse::<HttpMethod>() else {
                continue;
            };
            let Some(op) = op_node.as_object() else {
                continue;
            };

            let Some(operation_id) = op.get("operationId").and_then(Value::as_str) else {
                warn!(method = %method, path = %path, "operation without operationId, skipping");
                continue;
            };
            if !seen_ids.insert(operation_id.to_string()) {
                warn!(
                    operation_id,
                    "duplicate operationId; method names will be disambiguated per group"
                );
            }

            // Path-item parameters are inherited unless overridden by
            // name+location at operation level.
            let mut parameters: Vec<ParameterDescriptor> = Vec::new();
            if let Some(shared) = shared_params {
                for node in shared {
                    if let Some(param) = bind_parameter(node, synth, operation_id)? {
                        upsert_parameter(&mut parameters, param);
                    }
                }
            }
            if let Some(own) = op.get("parameters").and_then(Value::as_array) {
                for node in own {
                    if let Some(param) = bind_parameter(node, synth, operation_id)? {
                        upsert_parameter(&mut parameters, param);
                    }
                }
            }

            let mut request_body = None;
            let mut body_required = false;
            if let Some(rb_node) = op.get("requestBody") {
                let rb = synth.resolve(rb_node)?;
                body_required = rb
                    .node
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                request_body = Some(match json_content_schema(rb.node) {
                    Some(schema) => {
                        synth.synthesize_node(schema, &format!("{operation_id} request"))?
                    }
                    None => FieldType::Any,
                });
            }

            let response = bind_response(op, synth, operation_id)?;

            operations.push(OperationDescriptor {
                method,
                path: path.clone(),
                operation_id: operation_id.to_string(),
                method_name: names::member_name(operation_id),
                summary: op.get("summary").and_then(Value::as_str).map(String::from),
                description: op
                    .get("description")
                    .and_then(Value::as_str)
                    .map(String::from),
                tag: op
                    .get("tags")
                    .and_then(Value::as_array)
                    .and_then(|tags| tags.first())
                    .and_then(Value::as_str)
                    .map(String::from),
                parameters,
                request_body,
                body_required,
                response,
            });
        }
    }

    debug!(operations = operations.len(), "operation binding complete");
    Ok(operations)
}

fn bind_parameter<'doc>(
    node: &'doc Value,
    synth: &mut TypeSynthesizer<'doc>,
    operation_id: &str,
) -> Result<Option<ParameterDescriptor>> {
    let resolved = synth.resolve(node)?;
    let Some(obj) = resolved.node.as_object() else {
        warn!(operation_id, "parameter declaration is not an object, skipping");
        return Ok(None);
    };

    let Some(raw_name) = obj.get("name").and_then(Value::as_str) else {
        warn!(operation_id, "parameter without a name, skipping");
        return Ok(None);
    };
    let Some(location) = obj
        .get("in")
        .and_then(Value::as_str)
        .and_then(ParamLocation::parse)
    else {
        warn!(
            operation_id,
            parameter = raw_name,
            "parameter with unknown location, skipping"
        );
        return Ok(None);
    };

    let ty = match obj.get("schema") {
        Some(schema) => synth.synthesize_node(schema, &format!("{operation_id} {raw_name}"))?,
        None => FieldType::Any,
    };

    Ok(Some(ParameterDescriptor {
        raw_name: raw_name.to_string(),
        name: names::member_name(raw_name),
        location,
        required: location == ParamLocation::Path
            || obj.get("required").and_then(Value::as_bool).unwrap_or(false),
        ty,
        description: obj
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
    }))
}

fn upsert_parameter(parameters: &mut Vec<ParameterDescriptor>, param: ParameterDescriptor) {
    match parameters
        .iter()
        .position(|p| p.raw_name == param.raw_name && p.location == param.location)
    {
        Some(index) => parameters[index] = param,
        None => parameters.push(param),
    }
}

fn bind_response<'doc>(
    op: &'doc Map<String, Value>,
    synth: &mut TypeSynthesizer<'doc>,
    operation_id: &str,
) -> Result<Option<TypeId>> {
    let Some(responses) = op.get("responses").and_then(Value::as_object) else {
        return Ok(None);
    };

    // First 2xx response in declaration order, else "default"
    let picked = responses
        .iter()
        .find(|(status, _)| status.starts_with('2'))
        .or_else(|| responses.get_key_value("default"));
    let Some((_, response_node)) = picked else {
        return Ok(None);
    };

    let resolved = synth.resolve(response_node)?;
    let Some(schema) = json_content_schema(resolved.node) else {
        return Ok(None);
    };

    let ty = synth.synthesize_node(schema, &format!("{operation_id} response"))?;
    Ok(ty.as_object())
}

/// The schema of the first JSON-compatible content entry, if any.
/// Covers `application/json` and suffix types like `application/problem+json`.
fn json_content_schema(node: &Value) -> Option<&Value> {
    let content = node.get("content")?.as_object()?;
    content
        .iter()
        .find(|(media_type, _)| media_type.contains("json"))
        .and_then(|(_, entry)| entry.get("schema"))
}

// =============================================================================
// Request Construction
// =============================================================================

impl OperationDescriptor {
    /// Build the concrete request for one invocation.
    ///
    /// Partitions arguments by declared location, substitutes path
    /// placeholders, omits absent optional parameters, folds cookies into
    /// a `Cookie` header, and attaches the body. Fails with
    /// [`BindError::MissingParameter`] when a required parameter (or a
    /// required body) is absent.
    pub fn build_request(&self, base_url: &Url, args: &CallArgs) -> Result<ApiRequest> {
        let mut path = self.path.clone();
        let mut query = Vec::new();
        let mut headers = Vec::new();
        let mut cookies: Vec<String> = Vec::new();

        for param in &self.parameters {
            let value = match args.get(&param.raw_name, &param.name) {
                Some(value) => value,
                None => {
                    if param.required {
                        return Err(BindError::MissingParameter {
                            name: param.raw_name.clone(),
                            operation: self.operation_id.clone(),
                        });
                    }
                    continue;
                }
            };

            let rendered = render_scalar(value);
            match param.location {
                ParamLocation::Path => {
                    path = path.replace(&format!("{{{}}}", param.raw_name), &rendered);
                }
                ParamLocation::Query => query.push((param.raw_name.clone(), rendered)),
                ParamLocation::Header => headers.push((param.raw_name.clone(), rendered)),
                ParamLocation::Cookie => {
                    cookies.push(format!("{}={}", param.raw_name, rendered));
                }
            }
        }

        if !cookies.is_empty() {
            headers.push(("Cookie".to_string(), cookies.join("; ")));
        }

        let body = match args.body_value() {
            Some(body) => Some(body.clone()),
            None if self.request_body.is_some() && self.body_required => {
                return Err(BindError::MissingParameter {
                    name: "body".to_string(),
                    operation: self.operation_id.clone(),
                });
            }
            None => None,
        };

        let mut url = base_url.clone();
        let joined = if path.starts_with('/') {
            format!("{}{}", base_url.path().trim_end_matches('/'), path)
        } else {
            format!("{}/{}", base_url.path().trim_end_matches('/'), path)
        };
        url.set_path(&joined);

        Ok(ApiRequest {
            method: self.method,
            url,
            headers,
            query,
            body,
        })
    }
}

/// Render an argument for a path segment, query pair, or header value.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bind(doc: Value) -> Result<Vec<OperationDescriptor>> {
        let document = SchemaDocument::from_value(doc).unwrap();
        let mut synth = TypeSynthesizer::new(&document);
        synth.synthesize_components()?;
        bind_operations(&document, &mut synth)
    }

    fn petstore_paths() -> Value {
        json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets": {
                    "parameters": [
                        { "name": "X-Trace", "in": "header", "schema": { "type": "string" } }
                    ],
                    "get": {
                        "operationId": "listPets",
                        "summary": "List all pets",
                        "tags": ["pets"],
                        "parameters": [
                            { "name": "limit", "in": "query", "schema": { "type": "integer" } }
                        ]
                    },
                    "post": {
                        "operationId": "createPet",
                        "tags": ["pets"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Pet" }
                                }
                            }
                        }
                    }
                },
                "/pets/{petId}": {
                    "get": {
                        "operationId": "getPet",
                        "tags": ["pets"],
                        "parameters": [
                            { "name": "petId", "in": "path", "required": true,
                              "schema": { "type": "integer" } }
                        ],
                        "responses": {
                            "200": {
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Pet" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "name": { "type": "string" }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_bind_extracts_operations_in_order() {
        let ops = bind(petstore_paths()).unwrap();
        let ids: Vec<&str> = ops.iter().map(|o| o.operation_id.as_str()).collect();
        assert_eq!(ids, ["listPets", "createPet", "getPet"]);

        let list = &ops[0];
        assert_eq!(list.method, HttpMethod::Get);
        assert_eq!(list.method_name, "list_pets");
        assert_eq!(list.summary.as_deref(), Some("List all pets"));
        assert_eq!(list.tag.as_deref(), Some("pets"));
    }

    #[test]
    fn test_path_level_parameters_inherited() {
        let ops = bind(petstore_paths()).unwrap();
        let list = &ops[0];

        let locations: Vec<(&str, ParamLocation)> = list
            .parameters
            .iter()
            .map(|p| (p.raw_name.as_str(), p.location))
            .collect();
        assert_eq!(
            locations,
            [
                ("X-Trace", ParamLocation::Header),
                ("limit", ParamLocation::Query)
            ]
        );
        assert_eq!(list.parameters[0].name, "x_trace");
    }

    #[test]
    fn test_operation_level_parameter_overrides() {
        let ops = bind(json!({
            "openapi": "3.0.0",
            "paths": {
                "/things": {
                    "parameters": [
                        { "name": "limit", "in": "query", "schema": { "type": "string" } }
                    ],
                    "get": {
                        "operationId": "listThings",
                        "parameters": [
                            { "name": "limit", "in": "query", "required": true,
                              "schema": { "type": "integer" } }
                        ]
                    }
                }
            }
        }))
        .unwrap();

        let params = &ops[0].parameters;
        assert_eq!(params.len(), 1);
        assert!(params[0].required);
        assert_eq!(params[0].ty, FieldType::Integer);
    }

    #[test]
    fn test_operation_without_id_skipped() {
        let ops = bind(json!({
            "openapi": "3.0.0",
            "paths": {
                "/a": { "get": { "summary": "anonymous" } },
                "/b": { "get": { "operationId": "getB" } }
            }
        }))
        .unwrap();

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operation_id, "getB");
    }

    #[test]
    fn test_malformed_parameter_skipped_binding_succeeds() {
        let ops = bind(json!({
            "openapi": "3.0.0",
            "paths": {
                "/a": {
                    "get": {
                        "operationId": "getA",
                        "parameters": [
                            { "in": "query" },
                            { "name": "mystery", "in": "matrix" },
                            "not even an object",
                            { "name": "ok", "in": "query" }
                        ]
                    }
                }
            }
        }))
        .unwrap();

        let params = &ops[0].parameters;
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].raw_name, "ok");
        assert_eq!(params[0].ty, FieldType::Any);
    }

    #[test]
    fn test_json_suffix_media_type_bound() {
        let ops = bind(json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets": {
                    "get": {
                        "operationId": "listPets",
                        "responses": {
                            "200": {
                                "content": {
                                    "application/vnd.api+json": {
                                        "schema": { "$ref": "#/components/schemas/Pet" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "properties": { "id": { "type": "integer" } }
                    }
                }
            }
        }))
        .unwrap();

        assert!(ops[0].response.is_some());
    }

    #[test]
    fn test_typed_response_bound() {
        let ops = bind(petstore_paths()).unwrap();
        let get_pet = ops.iter().find(|o| o.operation_id == "getPet").unwrap();
        assert!(get_pet.response.is_some());

        let list = ops.iter().find(|o| o.operation_id == "listPets").unwrap();
        assert!(list.response.is_none());
    }

    #[test]
    fn test_build_request_substitutes_path() {
        let ops = bind(petstore_paths()).unwrap();
        let get_pet = ops.iter().find(|o| o.operation_id == "getPet").unwrap();
        let base = Url::parse("https://api.example.com/v2").unwrap();

        let request = get_pet
            .build_request(&base, &CallArgs::new().arg("petId", 42))
            .unwrap();
        assert_eq!(request.url.as_str(), "https://api.example.com/v2/pets/42");
        assert_eq!(request.method, HttpMethod::Get);
    }

    #[test]
    fn test_missing_path_parameter() {
        let ops = bind(petstore_paths()).unwrap();
        let get_pet = ops.iter().find(|o| o.operation_id == "getPet").unwrap();
        let base = Url::parse("https://api.example.com").unwrap();

        let err = get_pet.build_request(&base, &CallArgs::new());
        assert!(matches!(
            err,
            Err(BindError::MissingParameter { name, .. }) if name == "petId"
        ));
    }

    #[test]
    fn test_translated_argument_name_accepted() {
        let ops = bind(json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets/{petId}": {
                    "get": {
                        "operationId": "getPet",
                        "parameters": [
                            { "name": "petId", "in": "path", "required": true,
                              "schema": { "type": "integer" } }
                        ]
                    }
                }
            }
        }))
        .unwrap();

        let base = Url::parse("https://api.example.com").unwrap();
        let request = ops[0]
            .build_request(&base, &CallArgs::new().arg("pet_id", 7))
            .unwrap();
        assert_eq!(request.url.path(), "/pets/7");
    }

    #[test]
    fn test_optional_query_omitted_cookie_folded() {
        let ops = bind(json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets": {
                    "get": {
                        "operationId": "listPets",
                        "parameters": [
                            { "name": "limit", "in": "query", "schema": { "type": "integer" } },
                            { "name": "offset", "in": "query", "schema": { "type": "integer" } },
                            { "name": "session", "in": "cookie", "schema": { "type": "string" } },
                            { "name": "csrf", "in": "cookie", "schema": { "type": "string" } }
                        ]
                    }
                }
            }
        }))
        .unwrap();

        let base = Url::parse("https://api.example.com").unwrap();
        let request = ops[0]
            .build_request(
                &base,
                &CallArgs::new()
                    .arg("limit", 10)
                    .arg("session", "abc")
                    .arg("csrf", "xyz"),
            )
            .unwrap();

        assert_eq!(request.query, [("limit".to_string(), "10".to_string())]);
        assert_eq!(
            request.headers,
            [("Cookie".to_string(), "session=abc; csrf=xyz".to_string())]
        );
    }

    #[test]
    fn test_required_body_enforced_at_call_time() {
        let ops = bind(petstore_paths()).unwrap();
        let create = ops.iter().find(|o| o.operation_id == "createPet").unwrap();
        let base = Url::parse("https://api.example.com").unwrap();

        let err = create.build_request(&base, &CallArgs::new());
        assert!(matches!(
            err,
            Err(BindError::MissingParameter { name, .. }) if name == "body"
        ));

        let request = create
            .build_request(&base, &CallArgs::new().body(json!({ "name": "Rex" })))
            .unwrap();
        assert_eq!(request.body, Some(json!({ "name": "Rex" })));
    }
}
