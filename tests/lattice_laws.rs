//! Property-based tests for the join lattice
//!
//! Types are inferred from random JSON documents so every generated node is
//! one the engine can actually produce.

use json_drift::drift::detect_drift;
use json_drift::inference::infer_with;
use json_drift::json_schema::to_json_schema;
use json_drift::lattice::join;
use json_drift::state::{from_state_str, to_state_string};
use json_drift::TypeNode;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// ===== Strategies =====

/// A small key space so objects overlap often enough to exercise field merging.
fn arb_key() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["id", "name", "tags", "meta", "at"]).prop_map(str::to_string)
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-1000i64..1000).prop_map(Value::from),
        (-1000.0f64..1000.0).prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
        Just(json!("2024-01-02T03:04:05Z")),
    ];

    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(arb_key(), inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn arb_node() -> impl Strategy<Value = (TypeNode, bool)> {
    (arb_json(), any::<bool>()).prop_map(|(v, strict)| (infer_with(&v, strict), strict))
}

/// Shape and requiredness only; counts and examples are dropped.
fn shape(node: &TypeNode) -> Value {
    to_json_schema(node, "T")
}

// ===== Property Tests =====

proptest! {
    #[test]
    fn prop_join_is_commutative(a in arb_json(), b in arb_json(), strict in any::<bool>()) {
        let (a, b) = (infer_with(&a, strict), infer_with(&b, strict));
        prop_assert_eq!(join(&a, &b, strict), join(&b, &a, strict));
    }

    #[test]
    fn prop_join_is_idempotent((a, strict) in arb_node()) {
        prop_assert_eq!(join(&a, &a, strict), a);
    }

    #[test]
    fn prop_any_absorbs((a, strict) in arb_node()) {
        prop_assert_eq!(join(&a, &TypeNode::Any, strict), TypeNode::Any);
        prop_assert_eq!(join(&TypeNode::Any, &a, strict), TypeNode::Any);
    }

    #[test]
    fn prop_join_is_associative_on_shapes(
        a in arb_json(),
        b in arb_json(),
        c in arb_json(),
        strict in any::<bool>(),
    ) {
        let (a, b, c) = (infer_with(&a, strict), infer_with(&b, strict), infer_with(&c, strict));
        let left = join(&join(&a, &b, strict), &c, strict);
        let right = join(&a, &join(&b, &c, strict), strict);
        prop_assert_eq!(shape(&left), shape(&right));
    }

    #[test]
    fn prop_state_round_trip_is_lossless(a in arb_json(), b in arb_json()) {
        let root = join(&infer_with(&a, false), &infer_with(&b, false), false);
        let back = from_state_str(&to_state_string(&root)).unwrap();
        prop_assert_eq!(back, root);
    }

    #[test]
    fn prop_no_drift_against_itself((a, _strict) in arb_node()) {
        prop_assert!(detect_drift(&a, &a, "$").is_empty());
    }

    #[test]
    fn prop_names_distinguish_object_shapes(a in arb_json(), b in arb_json()) {
        let (a, b) = (infer_with(&a, false), infer_with(&b, false));
        if let (TypeNode::Object(x), TypeNode::Object(y)) = (&a, &b) {
            let same_keys = x.fields.keys().eq(y.fields.keys());
            prop_assert_eq!(a.name() == b.name(), same_keys);
        }
    }
}
