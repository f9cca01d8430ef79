//! Reference Resolution
//!
//! Resolves `$ref` pointers inside a schema document into concrete nodes.
//! A resolution cache maps every pointer string to the canonical pointer
//! of the concrete node it lands on, so repeated lookups of the same
//! reference observe the same identity. The synthesizer keys its type
//! memoization off that canonical pointer, which is what lets
//! self-referential schemas close onto a single type instead of
//! duplicating or recursing forever.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::document::SchemaDocument;
use crate::error::{BindError, Result};

/// A dereferenced schema node.
///
/// `pointer` is the canonical document pointer for the node, present when
/// the node was reached through at least one `$ref`. Inline nodes have no
/// pointer and therefore no shared identity.
#[derive(Debug, Clone)]
pub struct Resolved<'doc> {
    pub node: &'doc Value,
    pub pointer: Option<String>,
}

/// Resolves references against one document, caching pointer lookups for
/// the lifetime of a single build.
///
/// Not safe to share across concurrent builds; the module builder owns
/// one resolver per run.
pub struct Resolver<'doc> {
    document: &'doc SchemaDocument,
    /// raw pointer -> canonical pointer of the concrete (non-$ref) node
    cache: HashMap<String, String>,
}

impl<'doc> Resolver<'doc> {
    pub fn new(document: &'doc SchemaDocument) -> Self {
        Self {
            document,
            cache: HashMap::new(),
        }
    }

    /// Resolve a node that may be a `$ref`, following chained references
    /// until a concrete node is reached.
    pub fn resolve_node(&mut self, node: &'doc Value) -> Result<Resolved<'doc>> {
        match ref_target(node) {
            Some(pointer) => self.resolve_pointer(pointer),
            None => Ok(Resolved {
                node,
                pointer: None,
            }),
        }
    }

    /// Resolve a pointer string (e.g. `#/components/schemas/Pet`) to the
    /// concrete node it names.
    ///
    /// Fails with [`BindError::UnresolvedReference`] when the pointer does
    /// not exist in the document, names a non-local document, or is part
    /// of a pure `$ref` cycle with no concrete node to land on.
    pub fn resolve_pointer(&mut self, pointer: &str) -> Result<Resolved<'doc>> {
        if let Some(canonical) = self.cache.get(pointer).cloned() {
            debug!(pointer, canonical, "reference cache hit");
            let node = self.lookup(&canonical)?;
            return Ok(Resolved {
                node,
                pointer: Some(canonical),
            });
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut current = pointer.to_string();

        loop {
            if !visited.insert(current.clone()) {
                return Err(BindError::UnresolvedReference {
                    pointer: pointer.to_string(),
                });
            }

            let node = self.lookup(&current)?;
            match ref_target(node) {
                Some(next) => current = next.to_string(),
                None => {
                    self.cache.insert(pointer.to_string(), current.clone());
                    return Ok(Resolved {
                        node,
                        pointer: Some(current),
                    });
                }
            }
        }
    }

    /// Canonical pointer for a raw pointer, if it has been resolved.
    pub fn canonical(&self, pointer: &str) -> Option<&str> {
        self.cache.get(pointer).map(String::as_str)
    }

    fn lookup(&self, pointer: &str) -> Result<&'doc Value> {
        if !pointer.starts_with('#') {
            // Only single-document resolution is supported; remote refs
            // are a hard failure, not a degradation.
            return Err(BindError::UnresolvedReference {
                pointer: pointer.to_string(),
            });
        }
        self.document
            .pointer(pointer)
            .ok_or_else(|| BindError::UnresolvedReference {
                pointer: pointer.to_string(),
            })
    }
}

/// Extract the `$ref` pointer from a node, if it is a reference node.
pub fn ref_target(node: &Value) -> Option<&str> {
    node.get("$ref").and_then(Value::as_str)
}
