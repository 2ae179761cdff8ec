//! JSON Schema (draft 2020-12) export and import.
//!
//! Covers objects, arrays, unions (`anyOf`) and primitives, with
//! `format: "date-time"` tagging `DateTime`. Sample counts and examples have
//! no slot in JSON Schema and are not carried; imported objects count as one
//! sample with `required_count` 1 or 0.
use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::ir::{FieldInfo, ObjectType, TypeNode};

pub const JSON_SCHEMA_URI: &str = "https://json-schema.org/draft/2020-12/schema";
pub const DEFAULT_TITLE: &str = "InferredSchema";

// ------------------------------- Emission --------------------------------- //

pub fn to_json_schema(root: &TypeNode, title: &str) -> Value {
    let mut out = Map::new();
    out.insert("$schema".into(), Value::from(JSON_SCHEMA_URI));
    out.insert("title".into(), Value::from(title));
    if let Value::Object(body) = emit(root) {
        out.extend(body);
    }
    Value::Object(out)
}

fn emit(node: &TypeNode) -> Value {
    match node {
        TypeNode::Any => json!({}),
        TypeNode::Null => json!({ "type": "null" }),
        TypeNode::Bool => json!({ "type": "boolean" }),
        TypeNode::Int => json!({ "type": "integer" }),
        TypeNode::Float => json!({ "type": "number" }),
        TypeNode::Str => json!({ "type": "string" }),
        TypeNode::DateTime => json!({ "type": "string", "format": "date-time" }),
        TypeNode::Array(item) => json!({ "type": "array", "items": emit(item) }),
        TypeNode::Object(obj) => {
            let mut props = Map::new();
            let mut required: Vec<Value> = Vec::new();
            for (k, f) in &obj.fields {
                props.insert(k.clone(), emit(&f.ty));
                if f.is_required() {
                    required.push(Value::from(k.as_str()));
                }
            }
            let mut o = json!({
                "type": "object",
                "properties": props,
                "additionalProperties": true,
            });
            if !required.is_empty() {
                o["required"] = Value::Array(required);
            }
            o
        }
        TypeNode::Union(u) => json!({ "anyOf": u.options().iter().map(emit).collect::<Vec<_>>() }),
    }
}

// ------------------------------- Import ----------------------------------- //

/// Lenient import: fragments that are not objects, or that carry no
/// recognised keyword, become `Any`.
pub fn from_json_schema(schema: &Value) -> TypeNode {
    let Value::Object(schema) = schema else {
        return TypeNode::Any;
    };

    for key in ["anyOf", "oneOf"] {
        if let Some(options) = schema.get(key) {
            let options = options.as_array().map(Vec::as_slice).unwrap_or_default();
            return TypeNode::union(options.iter().filter(|o| o.is_object()).map(from_json_schema));
        }
    }

    match schema.get("type") {
        Some(Value::Array(types)) => {
            let options = types.iter().map(|t| {
                let mut single = schema.clone();
                single.insert("type".into(), t.clone());
                from_json_schema(&Value::Object(single))
            });
            TypeNode::union(options)
        }
        Some(Value::String(t)) => match t.as_str() {
            "null" => TypeNode::Null,
            "boolean" => TypeNode::Bool,
            "integer" => TypeNode::Int,
            "number" => TypeNode::Float,
            "string" if schema.get("format").and_then(Value::as_str) == Some("date-time") => {
                TypeNode::DateTime
            }
            "string" => TypeNode::Str,
            "array" => {
                let item = schema.get("items").filter(|i| i.is_object()).map(from_json_schema);
                TypeNode::array(item.unwrap_or(TypeNode::Any))
            }
            "object" => import_object(schema),
            _ => TypeNode::Any,
        },
        _ if schema.contains_key("properties") => import_object(schema),
        _ => TypeNode::Any,
    }
}

fn import_object(schema: &Map<String, Value>) -> TypeNode {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut fields = BTreeMap::new();
    if let Some(Value::Object(props)) = schema.get("properties") {
        for (name, field_schema) in props {
            let info = FieldInfo {
                ty: from_json_schema(field_schema),
                required_count: u64::from(required.contains(&name.as_str())),
                sample_count: 1,
                examples: Default::default(),
            };
            fields.insert(name.clone(), info);
        }
    }
    TypeNode::Object(ObjectType::new(fields, 1))
}

// ------------------------------- Files ------------------------------------ //

/// Strict entry point: the document root must be a JSON object.
pub fn from_json_schema_root(schema: &Value) -> Result<TypeNode> {
    if !schema.is_object() {
        return Err(Error::InvalidJsonSchema("JSON Schema root must be an object".into()));
    }
    Ok(from_json_schema(schema))
}

pub fn save_json_schema(path: &Path, root: &TypeNode, title: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let src = serde_json::to_string_pretty(&to_json_schema(root, title))
        .map_err(|e| Error::json(path, e))?;
    std::fs::write(path, src).map_err(|e| Error::io(path, e))
}

pub fn load_json_schema(path: &Path) -> Result<TypeNode> {
    let src = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let schema: Value = serde_json::from_str(&src).map_err(|e| Error::json(path, e))?;
    from_json_schema_root(&schema)
}

// ------------------------------- Tests ------------------------------------ //
