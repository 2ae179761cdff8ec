//! Structural type algebra. No serde_json::Value here.
//!
//! Every node is an immutable value with deep structural equality, ordering
//! and hashing. Object fields live in a `BTreeMap` and union options are kept
//! in canonical order, so two nodes built in different orders compare equal.
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Upper bound on the human-readable examples kept per field.
pub const MAX_EXAMPLES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeNode {
    Any,                     // top; absorbs everything in a join
    Null,
    Bool,
    Int,
    Float,
    Str,
    DateTime,                // string recognised as an ISO-8601 date/date-time
    Array(Box<TypeNode>),    // homogeneous list; item type is the join of all elements
    Object(ObjectType),
    Union(UnionType),        // flat, ≥ 2 options, never contains Any
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectType {
    pub fields: BTreeMap<String, FieldInfo>,
    /// Number of object samples folded into this shape.
    pub sample_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldInfo {
    pub ty: TypeNode,
    /// Samples of the owning object that carried this field.
    pub required_count: u64,
    pub sample_count: u64,
    /// Sorted, deduplicated, at most [`MAX_EXAMPLES`]. Never used for typing.
    pub examples: BTreeSet<String>,
}

/// Options are private so the flat/sorted/≥2 invariant cannot be broken from outside.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnionType {
    options: Vec<TypeNode>,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl TypeNode {
    pub fn array(item: TypeNode) -> Self {
        TypeNode::Array(Box::new(item))
    }

    /// Build a union from arbitrary options without any lattice merging.
    ///
    /// Nested unions are flattened, an `Any` collapses the result to `Any`,
    /// duplicates are dropped and the survivors are put in canonical order.
    /// Zero options yield `Any`, a single option is returned as-is.
    pub fn union<I>(options: I) -> Self
    where
        I: IntoIterator<Item = TypeNode>,
    {
        let mut flat = Vec::new();
        flatten_into(options, &mut flat);
        if flat.iter().any(|o| matches!(o, TypeNode::Any)) {
            return TypeNode::Any;
        }
        sort_canonical(&mut flat);
        flat.dedup();
        match flat.len() {
            0 => TypeNode::Any,
            1 => flat.remove(0),
            _ => TypeNode::Union(UnionType { options: flat }),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            TypeNode::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Canonical, stable type name used in drift/diff messages and for ordering.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl UnionType {
    pub fn options(&self) -> &[TypeNode] {
        &self.options
    }
}

impl ObjectType {
    pub fn new(fields: BTreeMap<String, FieldInfo>, sample_count: u64) -> Self {
        Self { fields, sample_count }
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.get(name)
    }
}

impl FieldInfo {
    /// A field seen once, in the single sample of its owning object.
    pub fn observed(ty: TypeNode, example: String) -> Self {
        Self {
            ty,
            required_count: 1,
            sample_count: 1,
            examples: BTreeSet::from([example]),
        }
    }

    /// Present in every sample seen for the owning object.
    pub fn is_required(&self) -> bool {
        self.required_count == self.sample_count
    }
}

/// Unnest union options into `out`.
pub(crate) fn flatten_into<I>(nodes: I, out: &mut Vec<TypeNode>)
where
    I: IntoIterator<Item = TypeNode>,
{
    for node in nodes {
        match node {
            TypeNode::Union(u) => flatten_into(u.options, out),
            other => out.push(other),
        }
    }
}

/// Sort by canonical name; structurally different shapes sharing a name
/// (e.g. two objects with the same keys) fall back to structural order.
pub(crate) fn sort_canonical(nodes: &mut [TypeNode]) {
    nodes.sort_by_cached_key(|n| (n.name(), n.clone()));
}

// ————————————————————————————————————————————————————————————————————————————
// NAMES
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Any => f.write_str("Any"),
            TypeNode::Null => f.write_str("None"),
            TypeNode::Bool => f.write_str("bool"),
            TypeNode::Int => f.write_str("int"),
            TypeNode::Float => f.write_str("float"),
            TypeNode::Str => f.write_str("str"),
            TypeNode::DateTime => f.write_str("datetime"),
            TypeNode::Array(item) => write!(f, "list[{item}]"),
            TypeNode::Object(obj) => {
                let keys = obj.fields.keys().map(|k| display_key(k)).collect::<Vec<_>>();
                write!(f, "object<{}>", keys.join(","))
            }
            TypeNode::Union(u) => {
                let mut parts = u.options.iter().map(TypeNode::name).collect::<Vec<_>>();
                parts.sort();
                f.write_str(&parts.join(" | "))
            }
        }
    }
}

/// Keys that could be confused with the name syntax are written quoted.
fn display_key(key: &str) -> Cow<'_, str> {
    let plain = !key.is_empty()
        && key.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '$' | '@'));
    if plain {
        Cow::Borrowed(key)
    } else {
        Cow::Owned(format!("{key:?}"))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
