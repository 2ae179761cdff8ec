//! Value → type inference and the streaming accumulator.
//!
//! Stream JSON samples in; each sample is inferred on its own and folded into
//! the running root with the lattice join. Because the join is commutative and
//! associative the resulting shape does not depend on sample order.
pub mod datetime;

use std::borrow::Borrow;

use serde_json::{Map, Value};

use crate::ir::{FieldInfo, ObjectType, TypeNode};
use crate::lattice::join;

/// Examples longer than this are cut to `EXAMPLE_MAX_CHARS - 3` chars plus `...`.
const EXAMPLE_MAX_CHARS: usize = 80;

// ------------------------------ Observe ---------------------------------- //

/// Infer the type of a single value (lenient numeric widening inside arrays).
pub fn infer(v: &Value) -> TypeNode {
    infer_with(v, false)
}

/// Infer with an explicit numeric policy for the joins inside arrays.
pub fn infer_with(v: &Value, strict_numbers: bool) -> TypeNode {
    match v {
        Value::Null => TypeNode::Null,
        Value::Bool(_) => TypeNode::Bool,
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                TypeNode::Int
            } else {
                TypeNode::Float
            }
        }
        Value::String(s) => {
            if datetime::looks_like_datetime(s) {
                TypeNode::DateTime
            } else {
                TypeNode::Str
            }
        }
        Value::Array(xs) => infer_array(xs, strict_numbers),
        Value::Object(m) => infer_object(m, strict_numbers),
    }
}

fn infer_array(xs: &[Value], strict_numbers: bool) -> TypeNode {
    let mut items = xs.iter().map(|el| infer_with(el, strict_numbers));
    let Some(first) = items.next() else {
        return TypeNode::array(TypeNode::Any);
    };
    let item = items.fold(first, |acc, next| join(&acc, &next, strict_numbers));
    TypeNode::array(item)
}

fn infer_object(map: &Map<String, Value>, strict_numbers: bool) -> TypeNode {
    let fields = map
        .iter()
        .map(|(k, v)| {
            let info = FieldInfo::observed(infer_with(v, strict_numbers), example_of(v));
            (k.clone(), info)
        })
        .collect();
    TypeNode::Object(ObjectType::new(fields, 1))
}

/// Compact JSON rendering of a value, truncated for display.
fn example_of(v: &Value) -> String {
    let text = v.to_string();
    if text.chars().count() <= EXAMPLE_MAX_CHARS {
        return text;
    }
    let mut short: String = text.chars().take(EXAMPLE_MAX_CHARS - 3).collect();
    short.push_str("...");
    short
}

// ------------------------------- Front API -------------------------------- //

/// Running root over a stream of samples. Owned by the caller; no globals.
#[derive(Debug, Clone, Default)]
pub struct TypeInferer {
    strict_numbers: bool,
    root: Option<TypeNode>,
}

impl TypeInferer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `int` and `float` apart as a union instead of widening to `float`.
    pub fn with_strict_numbers(strict_numbers: bool) -> Self {
        Self { strict_numbers, root: None }
    }

    pub fn strict_numbers(&self) -> bool {
        self.strict_numbers
    }

    pub fn observe(&mut self, v: &Value) -> &TypeNode {
        let observed = infer_with(v, self.strict_numbers);
        let next = match self.root.take() {
            None => observed,
            Some(root) => join(&root, &observed, self.strict_numbers),
        };
        self.root.insert(next)
    }

    pub fn observe_many<I>(&mut self, values: I) -> Option<&TypeNode>
    where
        I: IntoIterator,
        I::Item: Borrow<Value>,
    {
        for v in values {
            self.observe(v.borrow());
        }
        self.root.as_ref()
    }

    pub fn root(&self) -> Option<&TypeNode> {
        self.root.as_ref()
    }

    pub fn into_root(self) -> Option<TypeNode> {
        self.root
    }
}

/// Fold a batch of values into one root; `None` for an empty batch.
pub fn infer_from_values<I>(values: I, strict_numbers: bool) -> Option<TypeNode>
where
    I: IntoIterator,
    I::Item: Borrow<Value>,
{
    let mut inf = TypeInferer::with_strict_numbers(strict_numbers);
    inf.observe_many(values);
    inf.into_root()
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert_eq!(infer(&json!(null)), TypeNode::Null);
        assert_eq!(infer(&json!(true)), TypeNode::Bool);
        assert_eq!(infer(&json!(3)), TypeNode::Int);
        assert_eq!(infer(&json!(u64::MAX)), TypeNode::Int);
        assert_eq!(infer(&json!(3.5)), TypeNode::Float);
        assert_eq!(infer(&json!("hello")), TypeNode::Str);
        assert_eq!(infer(&json!("2024-05-01T10:00:00Z")), TypeNode::DateTime);
    }

    #[test]
    fn arrays_join_their_elements() {
        assert_eq!(infer(&json!([])), TypeNode::array(TypeNode::Any));
        assert_eq!(infer(&json!([1, 2.5])), TypeNode::array(TypeNode::Float));
        assert_eq!(
            infer(&json!([1, "a", null])),
            TypeNode::array(TypeNode::union([TypeNode::Int, TypeNode::Str, TypeNode::Null]))
        );
        assert_eq!(
            infer_with(&json!([1, 2.5]), true),
            TypeNode::array(TypeNode::union([TypeNode::Int, TypeNode::Float]))
        );
    }

    #[test]
    fn objects_record_examples() {
        let ty = infer(&json!({"id": 7, "name": "alice"}));
        let obj = ty.as_object().unwrap();
        assert_eq!(obj.sample_count, 1);
        let name = obj.field("name").unwrap();
        assert!(name.is_required());
        assert_eq!(name.examples.iter().next().unwrap(), "\"alice\"");
    }

    #[test]
    fn long_examples_are_truncated() {
        let long = "x".repeat(200);
        let ty = infer(&json!({ "blob": long }));
        let field = ty.as_object().unwrap().field("blob").unwrap();
        let example = field.examples.iter().next().unwrap().clone();
        assert_eq!(example.chars().count(), 80);
        assert!(example.ends_with("..."));
    }

    #[test]
    fn required_and_optional_tracking() {
        let mut inf = TypeInferer::new();
        inf.observe(&json!({"id": 1, "name": "a"}));
        inf.observe(&json!({"id": 2}));
        let obj = inf.root().and_then(TypeNode::as_object).unwrap();
        assert!(obj.field("id").unwrap().is_required());
        assert!(!obj.field("name").unwrap().is_required());
        assert_eq!(obj.sample_count, 2);
    }

    #[test]
    fn observe_many_on_empty_stream_has_no_root() {
        let mut inf = TypeInferer::new();
        assert!(inf.observe_many(Vec::<Value>::new()).is_none());
    }

    #[test]
    fn strict_inferer_keeps_numbers_apart() {
        let root = infer_from_values([json!({"v": 1}), json!({"v": 1.5})], true).unwrap();
        let v = &root.as_object().unwrap().field("v").unwrap().ty;
        assert_eq!(v.name(), "float | int");

        let root = infer_from_values([json!({"v": 1}), json!({"v": 1.5})], false).unwrap();
        assert_eq!(root.as_object().unwrap().field("v").unwrap().ty, TypeNode::Float);
    }
}
