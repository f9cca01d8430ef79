//! Type Descriptors
//!
//! The synthesized, immutable type surface: an arena of [`TypeDescriptor`]s
//! addressed by [`TypeId`], plus [`TypedInstance`] values constructed from
//! raw mappings at call time.
//!
//! The arena is what makes self-referential schemas tractable: a type's
//! slot is reserved (and its id handed out) before its fields are
//! synthesized, so a field can point at its own type, or at a type
//! declared later in the document, by id. After the build pass the
//! registry is frozen and safe to share across threads.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Value};

/// Stable index of a type in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

/// The type of a field or parameter.
///
/// Unknown or unsupported schema constructs degrade to [`FieldType::Any`]
/// instead of failing synthesis; partial typing beats total failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// `string` with `format: date-time`; values are normalized to
    /// Z-suffixed RFC 3339 on serialization
    DateTime,
    /// Opaque: unknown, unsupported, or deliberately untyped
    Any,
    Array(Box<FieldType>),
    Object(TypeId),
}

impl FieldType {
    /// Whether this type carries a synthesized object descriptor.
    pub fn as_object(&self) -> Option<TypeId> {
        match self {
            FieldType::Object(id) => Some(*id),
            _ => None,
        }
    }
}

/// One field of a synthesized type.
///
/// Carries both the original schema name (the wire name) and the
/// translated idiomatic name; the pair is fixed at synthesis time.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field name as declared in the schema document
    pub raw_name: String,
    /// Translated snake_case name
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
    pub nullable: bool,
    /// Schema-declared default, applied when construction input omits
    /// the field
    pub default: Option<Value>,
}

/// Synthesized description of a constructible data shape.
///
/// Field order follows document declaration order and is deterministic
/// for a given input document. Descriptors never point back into the
/// schema document.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Translated PascalCase name, unique within the registry
    pub name: String,
    /// Name as declared in the schema document
    pub raw_name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Look up a field by its translated name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by its original schema name.
    pub fn field_by_raw(&self, raw_name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.raw_name == raw_name)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Arena of synthesized types for one document.
///
/// Built once by the synthesizer, then frozen; all lookups are reads.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<TypeDescriptor>,
    by_name: HashMap<String, TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for a type before its fields exist, returning the
    /// id forward references will use.
    pub(crate) fn reserve(&mut self, name: String, raw_name: String) -> TypeId {
        let id = TypeId(self.types.len());
        self.by_name.insert(name.clone(), id);
        self.types.push(TypeDescriptor {
            name,
            raw_name,
            fields: Vec::new(),
        });
        id
    }

    /// Fill in the fields of a reserved slot.
    pub(crate) fn fill(&mut self, id: TypeId, fields: Vec<FieldDescriptor>) {
        self.types[id.0].fields = fields;
    }

    pub fn get(&self, id: TypeId) -> &TypeDescriptor {
        &self.types[id.0]
    }

    /// Look up a type by its translated name.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDescriptor)> {
        self.types.iter().enumerate().map(|(i, t)| (TypeId(i), t))
    }
}

// =============================================================================
// Typed Instances
// =============================================================================

/// A value of a synthesized type.
///
/// Constructed from a mapping keyed by *original* schema field names;
/// fields are read back under their *translated* names. Serializing
/// reproduces the original names and values, restricted to the fields
/// declared on the type and modulo fields absent at construction.
#[derive(Debug, Clone)]
pub struct TypedInstance {
    registry: Arc<TypeRegistry>,
    ty: TypeId,
    /// raw field name -> value, in field declaration order
    values: Map<String, Value>,
}

impl TypedInstance {
    /// Construct an instance from a raw mapping.
    ///
    /// Undeclared keys are dropped. Declared fields absent from the input
    /// fall back to their schema default, or stay absent. An explicit
    /// `null` is kept only for nullable or required fields; for an
    /// optional non-nullable field it means "not set".
    pub fn new(registry: Arc<TypeRegistry>, ty: TypeId, data: &Map<String, Value>) -> Self {
        let mut values = Map::new();

        for field in &registry.get(ty).fields {
            match data.get(&field.raw_name) {
                Some(Value::Null) if !field.nullable && !field.required => {}
                Some(value) => {
                    values.insert(field.raw_name.clone(), value.clone());
                }
                None => {
                    if let Some(default) = &field.default {
                        values.insert(field.raw_name.clone(), default.clone());
                    }
                }
            }
        }

        Self {
            registry,
            ty,
            values,
        }
    }

    /// The descriptor this instance was constructed against.
    pub fn descriptor(&self) -> &TypeDescriptor {
        self.registry.get(self.ty)
    }

    pub fn type_id(&self) -> TypeId {
        self.ty
    }

    /// Read a field by its translated name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let field = self.descriptor().field(name)?;
        self.values.get(&field.raw_name)
    }

    /// Read an object-typed field as a typed instance.
    pub fn get_instance(&self, name: &str) -> Option<TypedInstance> {
        let field = self.descriptor().field(name)?;
        let id = field.ty.as_object()?;
        let value = self.values.get(&field.raw_name)?.as_object()?;
        Some(TypedInstance::new(self.registry.clone(), id, value))
    }

    /// Serialize back to a mapping under the original schema field names.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for field in &self.descriptor().fields {
            if let Some(value) = self.values.get(&field.raw_name) {
                out.insert(
                    field.raw_name.clone(),
                    serialize_field(value, &field.ty),
                );
            }
        }
        out
    }

    /// Serialize as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }
}

/// Serialize one field value, normalizing date-times to a `Z` suffix.
fn serialize_field(value: &Value, ty: &FieldType) -> Value {
    match (ty, value) {
        (FieldType::DateTime, Value::String(s)) => {
            match DateTime::parse_from_rfc3339(s) {
                Ok(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                Err(_) => value.clone(),
            }
        }
        (FieldType::Array(inner), Value::Array(items)) => Value::Array(
            items.iter().map(|item| serialize_field(item, inner)).collect(),
        ),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry_with_pet() -> (Arc<TypeRegistry>, TypeId) {
        let mut registry = TypeRegistry::new();
        let id = registry.reserve("Pet".to_string(), "pet".to_string());
        registry.fill(
            id,
            vec![
                FieldDescriptor {
                    raw_name: "petId".to_string(),
                    name: "pet_id".to_string(),
                    ty: FieldType::Integer,
                    required: true,
                    nullable: false,
                    default: None,
                },
                FieldDescriptor {
                    raw_name: "petName".to_string(),
                    name: "pet_name".to_string(),
                    ty: FieldType::String,
                    required: false,
                    nullable: false,
                    default: None,
                },
                FieldDescriptor {
                    raw_name: "status".to_string(),
                    name: "status".to_string(),
                    ty: FieldType::String,
                    required: false,
                    nullable: false,
                    default: Some(json!("available")),
                },
            ],
        );
        (Arc::new(registry), id)
    }

    #[test]
    fn test_round_trip_restricted_to_declared_fields() {
        let (registry, id) = registry_with_pet();
        let input = json!({
            "petId": 42,
            "petName": "Rex",
            "status": "sold",
            "undeclared": true
        });

        let instance = TypedInstance::new(registry, id, input.as_object().unwrap());
        let out = instance.to_map();

        assert_eq!(out.get("petId"), Some(&json!(42)));
        assert_eq!(out.get("petName"), Some(&json!("Rex")));
        assert_eq!(out.get("status"), Some(&json!("sold")));
        assert!(out.get("undeclared").is_none());
    }

    #[test]
    fn test_translated_name_access() {
        let (registry, id) = registry_with_pet();
        let input = json!({ "petId": 7 });
        let instance = TypedInstance::new(registry, id, input.as_object().unwrap());

        assert_eq!(instance.get("pet_id"), Some(&json!(7)));
        assert_eq!(instance.get("pet_name"), None);
        // Raw names are not the access surface
        assert_eq!(instance.get("petId"), None);
    }

    #[test]
    fn test_default_applied_when_absent() {
        let (registry, id) = registry_with_pet();
        let input = json!({ "petId": 1 });
        let instance = TypedInstance::new(registry, id, input.as_object().unwrap());

        assert_eq!(instance.get("status"), Some(&json!("available")));
    }

    #[test]
    fn test_null_dropped_for_optional_non_nullable() {
        let (registry, id) = registry_with_pet();
        let input = json!({ "petId": 1, "petName": null });
        let instance = TypedInstance::new(registry, id, input.as_object().unwrap());

        assert_eq!(instance.get("pet_name"), None);
        assert!(instance.to_map().get("petName").is_none());
    }

    #[test]
    fn test_field_order_is_declaration_order() {
        let (registry, id) = registry_with_pet();
        let input = json!({ "status": "x", "petName": "y", "petId": 1 });
        let instance = TypedInstance::new(registry, id, input.as_object().unwrap());

        let map = instance.to_map();
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["petId", "petName", "status"]);
    }

    #[test]
    fn test_datetime_normalized_to_z() {
        let mut registry = TypeRegistry::new();
        let id = registry.reserve("Event".to_string(), "event".to_string());
        registry.fill(
            id,
            vec![FieldDescriptor {
                raw_name: "at".to_string(),
                name: "at".to_string(),
                ty: FieldType::DateTime,
                required: true,
                nullable: false,
                default: None,
            }],
        );

        let input = json!({ "at": "2023-01-01T00:00:00+00:00" });
        let instance =
            TypedInstance::new(Arc::new(registry), id, input.as_object().unwrap());
        assert_eq!(
            instance.to_map().get("at"),
            Some(&json!("2023-01-01T00:00:00Z"))
        );
    }

    #[test]
    fn test_nested_instance() {
        let mut registry = TypeRegistry::new();
        let owner = registry.reserve("Owner".to_string(), "owner".to_string());
        registry.fill(
            owner,
            vec![FieldDescriptor {
                raw_name: "fullName".to_string(),
                name: "full_name".to_string(),
                ty: FieldType::String,
                required: true,
                nullable: false,
                default: None,
            }],
        );
        let pet = registry.reserve("Pet".to_string(), "pet".to_string());
        registry.fill(
            pet,
            vec![FieldDescriptor {
                raw_name: "owner".to_string(),
                name: "owner".to_string(),
                ty: FieldType::Object(owner),
                required: false,
                nullable: false,
                default: None,
            }],
        );

        let input = json!({ "owner": { "fullName": "Ada" } });
        let instance =
            TypedInstance::new(Arc::new(registry), pet, input.as_object().unwrap());
        let nested = instance.get_instance("owner").unwrap();
        assert_eq!(nested.get("full_name"), Some(&json!("Ada")));
    }
}
