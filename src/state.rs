//! Persistence codec for the expected-schema baseline.
//!
//! Lossless: every count and example survives a save/load round trip.
//! Payload shape: `{"schema_version": 1, "root": {"kind": ..., ...}}`.
use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::ir::{FieldInfo, ObjectType, TypeNode};

pub const SCHEMA_STATE_VERSION: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    #[serde(default = "default_version")]
    pub schema_version: u64,
    pub root: NodeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeData {
    Any,
    Null,
    Bool,
    Int,
    Float,
    Str,
    #[serde(rename = "datetime")]
    DateTime,
    Array {
        item_type: Box<NodeData>,
    },
    Object {
        sample_count: u64,
        fields: Vec<FieldData>,
    },
    Union {
        options: Vec<NodeData>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldData {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: NodeData,
    pub required_count: u64,
    pub sample_count: u64,
    #[serde(default)]
    pub examples: Vec<String>,
}

fn default_version() -> u64 {
    SCHEMA_STATE_VERSION
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSION
// ————————————————————————————————————————————————————————————————————————————

impl From<&TypeNode> for NodeData {
    fn from(node: &TypeNode) -> Self {
        match node {
            TypeNode::Any => NodeData::Any,
            TypeNode::Null => NodeData::Null,
            TypeNode::Bool => NodeData::Bool,
            TypeNode::Int => NodeData::Int,
            TypeNode::Float => NodeData::Float,
            TypeNode::Str => NodeData::Str,
            TypeNode::DateTime => NodeData::DateTime,
            TypeNode::Array(item) => NodeData::Array { item_type: Box::new(item.as_ref().into()) },
            TypeNode::Object(obj) => NodeData::Object {
                sample_count: obj.sample_count,
                fields: obj
                    .fields
                    .iter()
                    .map(|(name, f)| FieldData {
                        name: name.clone(),
                        ty: (&f.ty).into(),
                        required_count: f.required_count,
                        sample_count: f.sample_count,
                        examples: f.examples.iter().cloned().collect(),
                    })
                    .collect(),
            },
            TypeNode::Union(u) => NodeData::Union {
                options: u.options().iter().map(NodeData::from).collect(),
            },
        }
    }
}

impl TryFrom<NodeData> for TypeNode {
    type Error = Error;

    fn try_from(data: NodeData) -> Result<Self> {
        node_from_data(data, "root")
    }
}

/// Rebuild a node, rejecting counts and unions the engine never produces.
fn node_from_data(data: NodeData, path: &str) -> Result<TypeNode> {
    let node = match data {
        NodeData::Any => TypeNode::Any,
        NodeData::Null => TypeNode::Null,
        NodeData::Bool => TypeNode::Bool,
        NodeData::Int => TypeNode::Int,
        NodeData::Float => TypeNode::Float,
        NodeData::Str => TypeNode::Str,
        NodeData::DateTime => TypeNode::DateTime,
        NodeData::Array { item_type } => {
            TypeNode::array(node_from_data(*item_type, &format!("{path}.item_type"))?)
        }
        NodeData::Object { sample_count, fields: data_fields } => {
            let mut fields = BTreeMap::new();
            for f in data_fields {
                let at = format!("{path}.fields.{}", f.name);
                if f.required_count > f.sample_count {
                    return Err(Error::InvalidState(format!(
                        "at {at}: required_count {} exceeds sample_count {}",
                        f.required_count, f.sample_count
                    )));
                }
                let info = FieldInfo {
                    ty: node_from_data(f.ty, &format!("{at}.type"))?,
                    required_count: f.required_count,
                    sample_count: f.sample_count,
                    examples: f.examples.into_iter().collect(),
                };
                if fields.insert(f.name, info).is_some() {
                    return Err(Error::InvalidState(format!("at {at}: duplicate field")));
                }
            }
            TypeNode::Object(ObjectType::new(fields, sample_count))
        }
        NodeData::Union { options } => {
            if options.len() < 2 {
                return Err(Error::InvalidState(format!(
                    "at {path}: union needs at least 2 options, found {}",
                    options.len()
                )));
            }
            let options = options
                .into_iter()
                .enumerate()
                .map(|(i, o)| node_from_data(o, &format!("{path}.options[{i}]")))
                .collect::<Result<Vec<_>>>()?;
            TypeNode::union(options)
        }
    };
    Ok(node)
}

// ————————————————————————————————————————————————————————————————————————————
// PAYLOAD
// ————————————————————————————————————————————————————————————————————————————

pub fn schema_state_payload(root: &TypeNode) -> StatePayload {
    StatePayload { schema_version: SCHEMA_STATE_VERSION, root: root.into() }
}

pub fn root_from_payload(payload: StatePayload) -> Result<TypeNode> {
    if payload.schema_version != SCHEMA_STATE_VERSION {
        return Err(Error::UnsupportedStateVersion(payload.schema_version));
    }
    payload.root.try_into()
}

/// SHA-256 over the compact payload; stable for structurally equal roots.
pub fn schema_state_hash(root: &TypeNode) -> String {
    let canonical = serde_json::to_vec(&schema_state_payload(root))
        .expect("state payload is plain data and always serializes");
    hex::encode(Sha256::digest(&canonical))
}

pub fn to_state_string(root: &TypeNode) -> String {
    serde_json::to_string_pretty(&schema_state_payload(root))
        .expect("state payload is plain data and always serializes")
}

pub fn from_state_str(src: &str) -> Result<TypeNode> {
    let payload: StatePayload = from_str_with_path(src)?;
    root_from_payload(payload)
}

pub fn save_schema_state(path: &Path, root: &TypeNode) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    std::fs::write(path, to_state_string(root)).map_err(|e| Error::io(path, e))
}

pub fn load_schema_state(path: &Path) -> Result<TypeNode> {
    let src = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    from_state_str(&src)
}

/// Deserialize with JSON-path context in error messages.
fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        Error::StatePath(format!("at JSON path {path} → {}", err.into_inner()))
    })
}

// ————————————————————————————————————————————————————————————————————————————
// SUMMARY
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    pub any: u64,
    pub null: u64,
    pub bool: u64,
    pub int: u64,
    pub float: u64,
    pub str: u64,
    pub datetime: u64,
    pub array: u64,
    pub object: u64,
    pub union: u64,
    pub field_total: u64,
    pub field_required: u64,
    pub field_optional: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaSummary {
    pub root_type: String,
    pub counts: TypeCounts,
}

impl TypeCounts {
    pub fn scalars(&self) -> u64 {
        self.any + self.null + self.bool + self.int + self.float + self.str + self.datetime
    }

    fn walk(&mut self, node: &TypeNode) {
        match node {
            TypeNode::Any => self.any += 1,
            TypeNode::Null => self.null += 1,
            TypeNode::Bool => self.bool += 1,
            TypeNode::Int => self.int += 1,
            TypeNode::Float => self.float += 1,
            TypeNode::Str => self.str += 1,
            TypeNode::DateTime => self.datetime += 1,
            TypeNode::Array(item) => {
                self.array += 1;
                self.walk(item);
            }
            TypeNode::Object(obj) => {
                self.object += 1;
                self.field_total += obj.fields.len() as u64;
                for f in obj.fields.values() {
                    if f.is_required() {
                        self.field_required += 1;
                    } else {
                        self.field_optional += 1;
                    }
                    self.walk(&f.ty);
                }
            }
            TypeNode::Union(u) => {
                self.union += 1;
                for o in u.options() {
                    self.walk(o);
                }
            }
        }
    }
}

pub fn schema_summary(root: &TypeNode) -> SchemaSummary {
    let mut counts = TypeCounts::default();
    counts.walk(root);
    SchemaSummary { root_type: root.name(), counts }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{infer_from_values, TypeInferer};
    use serde_json::json;

    fn rich_root() -> TypeNode {
        infer_from_values(
            [
                json!({
                    "id": 1,
                    "when": "2024-01-01T00:00:00Z",
                    "tags": ["a", 1],
                    "items": [{"sku": "x", "qty": 2}]
                }),
                json!({"id": "2", "items": [{"sku": "y"}], "meta": null}),
                json!({"id": 3, "items": [{"sku": "z", "qty": 1.5}], "meta": {"note": "n"}}),
            ],
            true,
        )
        .unwrap()
    }

    #[test]
    fn state_round_trip() {
        let root = rich_root();
        let back = from_state_str(&to_state_string(&root)).unwrap();
        assert_eq!(back, root);
    }

    #[test]
    fn state_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let root = rich_root();
        save_schema_state(&path, &root).unwrap();
        assert_eq!(load_schema_state(&path).unwrap(), root);
    }

    #[test]
    fn payload_shape() {
        let mut inf = TypeInferer::new();
        inf.observe(&json!({"at": "2024-01-01"}));
        let value = serde_json::to_value(schema_state_payload(inf.root().unwrap())).unwrap();
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["root"]["kind"], "object");
        assert_eq!(value["root"]["fields"][0]["type"]["kind"], "datetime");
        assert_eq!(value["root"]["fields"][0]["examples"][0], "\"2024-01-01\"");
    }

    #[test]
    fn unknown_kind_fails_with_path() {
        let src =
            r#"{"schema_version": 1, "root": {"kind": "array", "item_type": {"kind": "decimal"}}}"#;
        let err = from_state_str(src).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("root"), "{msg}");
        assert!(msg.contains("decimal"), "{msg}");
    }

    #[test]
    fn required_count_above_sample_count_is_rejected() {
        let src = r#"{"schema_version": 1, "root": {"kind": "object", "sample_count": 1, "fields": [
            {"name": "a", "type": {"kind": "int"}, "required_count": 5, "sample_count": 1}
        ]}}"#;
        let err = from_state_str(src).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)), "{err}");
        assert!(err.to_string().contains("root.fields.a"), "{err}");
    }

    #[test]
    fn single_option_union_is_rejected() {
        let src = r#"{"root": {"kind": "array", "item_type":
            {"kind": "union", "options": [{"kind": "int"}]}}}"#;
        let err = from_state_str(src).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)), "{err}");
        assert!(err.to_string().contains("root.item_type"), "{err}");

        let empty = r#"{"root": {"kind": "union", "options": []}}"#;
        assert!(matches!(from_state_str(empty), Err(Error::InvalidState(_))));
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let field =
            r#"{"name": "a", "type": {"kind": "int"}, "required_count": 1, "sample_count": 1}"#;
        let src = format!(
            r#"{{"root": {{"kind": "object", "sample_count": 1, "fields": [{field}, {field}]}}}}"#
        );
        assert!(matches!(from_state_str(&src), Err(Error::InvalidState(_))));
    }

    #[test]
    fn unsupported_version_fails() {
        let src = r#"{"schema_version": 2, "root": {"kind": "int"}}"#;
        assert!(matches!(from_state_str(src), Err(Error::UnsupportedStateVersion(2))));
    }

    #[test]
    fn missing_version_defaults_to_current() {
        let src = r#"{"root": {"kind": "str"}}"#;
        assert_eq!(from_state_str(src).unwrap(), TypeNode::Str);
    }

    #[test]
    fn hash_is_stable_and_sensitive() {
        let root = rich_root();
        assert_eq!(schema_state_hash(&root), schema_state_hash(&root.clone()));
        assert_eq!(schema_state_hash(&root).len(), 64);
        assert_ne!(schema_state_hash(&root), schema_state_hash(&TypeNode::Str));
    }

    #[test]
    fn summary_counts() {
        let mut inf = TypeInferer::new();
        inf.observe(&json!({"id": 1, "tags": ["a"]}));
        inf.observe(&json!({"id": 2}));
        let summary = schema_summary(inf.root().unwrap());
        assert_eq!(summary.root_type, "object<id,tags>");
        assert_eq!(summary.counts.object, 1);
        assert_eq!(summary.counts.array, 1);
        assert_eq!(summary.counts.field_total, 2);
        assert_eq!(summary.counts.field_required, 1);
        assert_eq!(summary.counts.field_optional, 1);
        assert_eq!(summary.counts.scalars(), 2);
    }
}
