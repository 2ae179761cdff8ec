//! Least-upper-bound join over [`TypeNode`].
//!
//! - Join ⊔ is commutative, associative and idempotent, so streaming
//!   inference is order independent.
//! - `Any` is absorbing.
//! - `int ⊔ float` widens to `float` unless `strict_numbers` is set.
//! - Unions keep one arm per structural kind: every object option is merged
//!   into a single object arm and every array option into a single array arm.
mod obj;

use crate::ir::{flatten_into, ObjectType, TypeNode};

// -------------------------------- Join (⊔) -------------------------------- //

pub fn join(a: &TypeNode, b: &TypeNode, strict_numbers: bool) -> TypeNode {
    if a == b {
        return a.clone();
    }
    match (a, b) {
        (TypeNode::Any, _) | (_, TypeNode::Any) => TypeNode::Any,
        (TypeNode::Int, TypeNode::Float) | (TypeNode::Float, TypeNode::Int) => {
            if strict_numbers {
                simplify_union(vec![a.clone(), b.clone()], true)
            } else {
                TypeNode::Float
            }
        }
        (TypeNode::Array(x), TypeNode::Array(y)) => TypeNode::array(join(x, y, strict_numbers)),
        (TypeNode::Object(x), TypeNode::Object(y)) => {
            TypeNode::Object(ObjectType::join(x, y, strict_numbers))
        }
        _ => simplify_union(vec![a.clone(), b.clone()], strict_numbers),
    }
}

/// Fold many nodes; `None` when the iterator is empty.
pub fn join_all<I>(nodes: I, strict_numbers: bool) -> Option<TypeNode>
where
    I: IntoIterator<Item = TypeNode>,
{
    nodes
        .into_iter()
        .reduce(|acc, next| join(&acc, &next, strict_numbers))
}

// ------------------------------- Normalize -------------------------------- //

/// Flatten, merge same-kind arms, apply numeric widening and canonicalize.
pub fn simplify_union(nodes: Vec<TypeNode>, strict_numbers: bool) -> TypeNode {
    let mut flat = Vec::with_capacity(nodes.len());
    flatten_into(nodes, &mut flat);
    if flat.iter().any(|o| matches!(o, TypeNode::Any)) {
        return TypeNode::Any;
    }

    let mut object_arm: Option<TypeNode> = None;
    let mut array_arm: Option<TypeNode> = None;
    let mut arms: Vec<TypeNode> = Vec::with_capacity(flat.len());
    for node in flat {
        match node {
            TypeNode::Object(_) => {
                object_arm = Some(match object_arm {
                    None => node,
                    Some(prev) => join(&prev, &node, strict_numbers),
                });
            }
            TypeNode::Array(_) => {
                array_arm = Some(match array_arm {
                    None => node,
                    Some(prev) => join(&prev, &node, strict_numbers),
                });
            }
            scalar => {
                if !arms.contains(&scalar) {
                    arms.push(scalar);
                }
            }
        }
    }

    if !strict_numbers && arms.contains(&TypeNode::Float) {
        arms.retain(|t| *t != TypeNode::Int);
    }
    arms.extend(object_arm);
    arms.extend(array_arm);
    TypeNode::union(arms)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::infer;
    use serde_json::json;

    #[test]
    fn equal_operands_are_returned_unchanged() {
        let a = infer(&json!({"id": 1, "tags": ["x"]}));
        assert_eq!(join(&a, &a, false), a);
        assert_eq!(join(&TypeNode::Str, &TypeNode::Str, true), TypeNode::Str);
    }

    #[test]
    fn any_absorbs() {
        let x = infer(&json!({"id": 1}));
        assert_eq!(join(&TypeNode::Any, &x, false), TypeNode::Any);
        assert_eq!(join(&x, &TypeNode::Any, true), TypeNode::Any);
        let u = TypeNode::union([TypeNode::Str, TypeNode::Null]);
        assert_eq!(join(&u, &TypeNode::Any, false), TypeNode::Any);
    }

    #[test]
    fn numeric_widening() {
        assert_eq!(join(&TypeNode::Int, &TypeNode::Float, false), TypeNode::Float);
        assert_eq!(join(&TypeNode::Float, &TypeNode::Int, false), TypeNode::Float);

        let ab = join(&TypeNode::Int, &TypeNode::Float, true);
        let ba = join(&TypeNode::Float, &TypeNode::Int, true);
        assert_eq!(ab, ba);
        assert_eq!(ab.name(), "float | int");
    }

    #[test]
    fn widening_applies_inside_unions() {
        let u = TypeNode::union([TypeNode::Int, TypeNode::Str]);
        assert_eq!(
            join(&u, &TypeNode::Float, false),
            TypeNode::union([TypeNode::Float, TypeNode::Str])
        );
        assert_eq!(
            join(&u, &TypeNode::Float, true),
            TypeNode::union([TypeNode::Float, TypeNode::Int, TypeNode::Str])
        );
    }

    #[test]
    fn unions_stay_flat() {
        let a = TypeNode::union([TypeNode::Int, TypeNode::Str]);
        let b = TypeNode::union([TypeNode::Bool, TypeNode::Null]);
        let TypeNode::Union(u) = join(&a, &b, false) else { panic!("expected union") };
        assert_eq!(u.options().len(), 4);
        assert!(u.options().iter().all(|o| !matches!(o, TypeNode::Union(_))));
    }

    #[test]
    fn arrays_join_items() {
        let a = infer(&json!([1]));
        let b = infer(&json!(["x"]));
        assert_eq!(join(&a, &b, false).name(), "list[int | str]");
    }

    #[test]
    fn commutative_for_objects() {
        let left = infer(&json!({"id": 1, "name": "a"}));
        let right = infer(&json!({"id": 2.5, "active": true}));
        assert_eq!(join(&left, &right, false), join(&right, &left, false));
    }

    #[test]
    fn associative_for_mixed_samples() {
        let a = infer(&json!({"id": 1}));
        let b = infer(&json!({"id": 2, "name": "x"}));
        let c = infer(&json!({"id": 3.1, "name": "y", "active": false}));
        assert_eq!(
            join(&join(&a, &b, false), &c, false),
            join(&a, &join(&b, &c, false), false)
        );
    }

    #[test]
    fn associative_when_objects_meet_unions() {
        let o1 = infer(&json!({"id": 1}));
        let o2 = infer(&json!({"name": "x"}));
        let s = TypeNode::Str;
        let left = join(&join(&o1, &s, false), &o2, false);
        let right = join(&o1, &join(&s, &o2, false), false);
        assert_eq!(left, right);
        assert_eq!(left.name(), "object<id,name> | str");
    }

    #[test]
    fn join_all_folds() {
        let nodes = vec![TypeNode::Int, TypeNode::Float, TypeNode::Null];
        assert_eq!(
            join_all(nodes, false),
            Some(TypeNode::union([TypeNode::Float, TypeNode::Null]))
        );
        assert_eq!(join_all(Vec::new(), false), None);
    }
}
