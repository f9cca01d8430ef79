//! Schema Document
//!
//! Wraps a parsed OpenAPI document and provides loading from in-memory
//! values, strings, files, and URLs. Documents are immutable once loaded;
//! every later pass (resolution, synthesis, binding) borrows from here.

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{BindError, Result};

/// One entry from the document's `servers` array.
///
/// The URL has any `{variable}` placeholders substituted with the
/// variable's declared default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub url: String,
    pub description: Option<String>,
}

/// An immutable, parsed OpenAPI document.
///
/// Owns the full document tree; schema nodes are addressed into it by
/// JSON pointer. Construction performs a structural sanity check only
/// (`openapi` and `paths` must be present), not schema validation.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    root: Value,
}

impl SchemaDocument {
    /// Wrap an already-parsed document value.
    pub fn from_value(root: Value) -> Result<Self> {
        if !root.is_object() {
            return Err(BindError::InvalidDocument(
                "document root must be an object".to_string(),
            ));
        }
        for key in ["openapi", "paths"] {
            if root.get(key).is_none() {
                return Err(BindError::InvalidDocument(format!(
                    "missing required top-level key '{key}'"
                )));
            }
        }

        if let Some(title) = root.pointer("/info/title").and_then(Value::as_str) {
            debug!(title, "loaded schema document");
        }

        Ok(Self { root })
    }

    /// Parse a document from JSON or YAML text.
    pub fn from_str(text: &str) -> Result<Self> {
        // Try JSON first; most documents are one or the other and YAML
        // rejects are cheap.
        let root: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(_) => serde_yaml::from_str(text)?,
        };
        Self::from_value(root)
    }

    /// Load a document from a local file path.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }

    /// Fetch and parse a document from a URL.
    pub async fn from_url(url: &str) -> Result<Self> {
        let response = reqwest::get(url).await?.error_for_status()?;
        let text = response.text().await?;
        Self::from_str(&text)
    }

    /// The raw document root.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look up a node by JSON pointer, with or without the leading `#`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        let path = pointer.strip_prefix('#').unwrap_or(pointer);
        self.root.pointer(path)
    }

    /// The `paths` object, in declaration order.
    pub fn paths(&self) -> Option<&serde_json::Map<String, Value>> {
        self.root.get("paths").and_then(Value::as_object)
    }

    /// The `components/schemas` object, in declaration order.
    pub fn component_schemas(&self) -> Option<&serde_json::Map<String, Value>> {
        self.root
            .pointer("/components/schemas")
            .and_then(Value::as_object)
    }

    /// Declared servers, with URL variables substituted by their defaults.
    pub fn servers(&self) -> Vec<Server> {
        let Some(entries) = self.root.get("servers").and_then(Value::as_array) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let mut url = entry.get("url")?.as_str()?.to_string();

                if let Some(variables) = entry.get("variables").and_then(Value::as_object) {
                    for (name, var) in variables {
                        if let Some(default) = var.get("default").and_then(Value::as_str) {
                            url = url.replace(&format!("{{{name}}}"), default);
                        }
                    }
                }

                Some(Server {
                    url,
                    description: entry
                        .get("description")
                        .and_then(Value::as_str)
                        .map(String::from),
                })
            })
            .collect()
    }

    /// Base URL taken from the first declared server, if it parses.
    pub fn default_base_url(&self) -> Option<Url> {
        self.servers()
            .first()
            .and_then(|server| Url::parse(&server.url).ok())
    }
}
