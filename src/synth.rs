//! Type Synthesis
//!
//! Walks resolved schema nodes and realizes them as [`TypeDescriptor`]s in
//! the registry arena. Synthesis is memoized on the canonical reference
//! pointer, and object slots are reserved before their fields are walked,
//! so self-referential and mutually recursive schemas terminate and close
//! onto a single shared type.
//!
//! Unsupported constructs (`oneOf`, `anyOf`, unknown `type` values,
//! boolean schemas) degrade to [`FieldType::Any`] rather than failing the
//! build; only unresolvable references abort.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::document::SchemaDocument;
use crate::error::Result;
use crate::names;
use crate::resolve::{Resolved, Resolver};
use crate::types::{FieldDescriptor, FieldType, TypeId, TypeRegistry};

/// Synthesizes the type surface for one document.
///
/// Owns the reference resolver and the registry under construction;
/// single-threaded, one per build.
pub struct TypeSynthesizer<'doc> {
    document: &'doc SchemaDocument,
    resolver: Resolver<'doc>,
    registry: TypeRegistry,
    /// canonical pointer -> synthesized type, the cycle-closure table
    memo: HashMap<String, FieldType>,
}

impl<'doc> TypeSynthesizer<'doc> {
    pub fn new(document: &'doc SchemaDocument) -> Self {
        Self {
            document,
            resolver: Resolver::new(document),
            registry: TypeRegistry::new(),
            memo: HashMap::new(),
        }
    }

    /// Synthesize every schema declared under `components/schemas`, in
    /// declaration order. Unresolvable references fail the whole pass.
    pub fn synthesize_components(&mut self) -> Result<()> {
        let Some(schemas) = self.document.component_schemas() else {
            return Ok(());
        };

        for name in schemas.keys() {
            let pointer = format!("#/components/schemas/{}", escape_token(name));
            self.synthesize_pointer(&pointer, name)?;
        }

        debug!(types = self.registry.len(), "component synthesis complete");
        Ok(())
    }

    /// Synthesize the schema a pointer names.
    pub fn synthesize_pointer(&mut self, pointer: &str, hint: &str) -> Result<FieldType> {
        let resolved = self.resolver.resolve_pointer(pointer)?;
        self.synthesize_resolved(resolved.node, resolved.pointer, hint)
    }

    /// Synthesize an arbitrary schema node, following a leading `$ref`.
    pub fn synthesize_node(&mut self, node: &'doc Value, hint: &str) -> Result<FieldType> {
        let resolved = self.resolver.resolve_node(node)?;
        self.synthesize_resolved(resolved.node, resolved.pointer, hint)
    }

    /// Resolve a node without synthesizing it, for callers that need to
    /// inspect non-schema structures (path items, parameters) that may
    /// themselves be references.
    pub fn resolve(&mut self, node: &'doc Value) -> Result<Resolved<'doc>> {
        self.resolver.resolve_node(node)
    }

    /// Freeze and hand over the completed registry.
    pub fn into_registry(self) -> TypeRegistry {
        self.registry
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    fn synthesize_resolved(
        &mut self,
        node: &'doc Value,
        pointer: Option<String>,
        hint: &str,
    ) -> Result<FieldType> {
        if let Some(ptr) = &pointer {
            if let Some(ty) = self.memo.get(ptr) {
                return Ok(ty.clone());
            }
            // In-progress marker. Object nodes replace it with their
            // reserved id before walking fields; a cycle that re-enters
            // through any other position (array items, primitive alias)
            // lands here and degrades to opaque instead of recursing.
            self.memo.insert(ptr.clone(), FieldType::Any);
        }

        // The name this node gets if it realizes as an object type
        let raw_name = pointer
            .as_deref()
            .map(pointer_tail)
            .unwrap_or_else(|| hint.to_string());

        let Some(obj) = node.as_object() else {
            debug!(name = %raw_name, "non-object schema node, degrading to opaque");
            return Ok(self.memoize(pointer, FieldType::Any));
        };

        if let Some(parts) = obj.get("allOf").and_then(Value::as_array) {
            return self.synthesize_all_of(parts, pointer, &raw_name);
        }

        let type_kind = obj.get("type").and_then(Value::as_str);

        if obj.get("properties").is_some() && matches!(type_kind, Some("object") | None) {
            // Reserve (and memoize) before walking fields so recursive
            // references land on this id.
            let id = self.reserve_object(&raw_name, pointer);
            let fields = self.object_fields(node, &raw_name)?;
            self.registry.fill(id, fields);
            return Ok(FieldType::Object(id));
        }

        let ty = match type_kind {
            Some("array") => {
                let inner = match obj.get("items") {
                    Some(items) => self.synthesize_node(items, &format!("{raw_name} item"))?,
                    None => FieldType::Any,
                };
                FieldType::Array(Box::new(inner))
            }
            Some("string") => {
                if obj.get("format").and_then(Value::as_str) == Some("date-time") {
                    FieldType::DateTime
                } else {
                    FieldType::String
                }
            }
            Some("integer") => FieldType::Integer,
            Some("number") => FieldType::Number,
            Some("boolean") => FieldType::Boolean,
            // A map-shaped object with no declared fields stays opaque
            Some("object") => FieldType::Any,
            Some(other) => {
                debug!(name = %raw_name, kind = other, "unknown schema type, degrading to opaque");
                FieldType::Any
            }
            None => {
                // oneOf, anyOf, not, bare enum, empty schema
                debug!(name = %raw_name, "unsupported schema construct, degrading to opaque");
                FieldType::Any
            }
        };

        Ok(self.memoize(pointer, ty))
    }

    /// Merge the field sets of `allOf` constituents, later constituents
    /// overriding earlier ones on raw-name collision.
    fn synthesize_all_of(
        &mut self,
        parts: &'doc [Value],
        pointer: Option<String>,
        raw_name: &str,
    ) -> Result<FieldType> {
        let id = self.reserve_object(raw_name, pointer);
        let mut merged: Vec<FieldDescriptor> = Vec::new();

        for part in parts {
            let resolved = self.resolver.resolve_node(part)?;
            let part_fields = match resolved.pointer.clone() {
                Some(part_ptr) => {
                    // Shared constituent: synthesize (or reuse) its type
                    // and copy the realized fields.
                    match self.synthesize_resolved(resolved.node, Some(part_ptr), raw_name)? {
                        FieldType::Object(part_id) => self.registry.get(part_id).fields.clone(),
                        _ => {
                            debug!(name = %raw_name, "allOf constituent is not an object, skipping");
                            Vec::new()
                        }
                    }
                }
                None => self.object_fields(resolved.node, raw_name)?,
            };

            for field in part_fields {
                match merged.iter().position(|f| f.raw_name == field.raw_name) {
                    Some(index) => merged[index] = field,
                    None => merged.push(field),
                }
            }
        }

        self.registry.fill(id, merged);
        Ok(FieldType::Object(id))
    }

    /// Walk an object node's `properties` into field descriptors, in
    /// declaration order.
    fn object_fields(&mut self, node: &'doc Value, owner: &str) -> Result<Vec<FieldDescriptor>> {
        let required: HashSet<&str> = node
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let Some(props) = node.get("properties").and_then(Value::as_object) else {
            return Ok(Vec::new());
        };

        let mut fields = Vec::with_capacity(props.len());
        for (prop_name, prop_node) in props {
            let hint = format!("{owner} {prop_name}");
            let ty = self.synthesize_node(prop_node, &hint)?;

            fields.push(FieldDescriptor {
                raw_name: prop_name.clone(),
                name: names::member_name(prop_name),
                ty,
                required: required.contains(prop_name.as_str()),
                nullable: prop_node
                    .get("nullable")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                default: prop_node.get("default").cloned(),
            });
        }

        Ok(fields)
    }

    /// Reserve a registry slot under a collision-free translated name and
    /// pre-memoize the pointer so cycles close onto the reserved id.
    fn reserve_object(&mut self, raw_name: &str, pointer: Option<String>) -> TypeId {
        let name = self.unique_type_name(raw_name);
        let id = self.registry.reserve(name, raw_name.to_string());
        if let Some(ptr) = pointer {
            self.memo.insert(ptr, FieldType::Object(id));
        }
        id
    }

    /// Deterministic type-name disambiguation: first claimant keeps the
    /// base name, later ones get a numeric suffix in document order.
    fn unique_type_name(&self, raw: &str) -> String {
        let base = names::type_name(raw);
        if !self.registry.contains_name(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}{n}");
            if !self.registry.contains_name(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn memoize(&mut self, pointer: Option<String>, ty: FieldType) -> FieldType {
        if let Some(ptr) = pointer {
            self.memo.insert(ptr, ty.clone());
        }
        ty
    }
}

/// Last reference token of a pointer, unescaped per RFC 6901.
fn pointer_tail(pointer: &str) -> String {
    let tail = pointer.rsplit('/').next().unwrap_or(pointer);
    tail.replace("~1", "/").replace("~0", "~")
}

/// Escape a name for use as a JSON pointer reference token.
fn escape_token(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}
