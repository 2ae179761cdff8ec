//! Lower a `TypeNode` tree to named model definitions plus Python annotations.
use std::collections::HashSet;

use indexmap::IndexMap;

use crate::codegen::naming::{ensure_unique_name, to_class_name};
use crate::ir::{ObjectType, TypeNode};

/// Structurally identical object shapes share one definition.
/// Insertion order is definition order: the root first, then nested shapes
/// in field order.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    by_node: IndexMap<ObjectType, String>,
    used_names: HashSet<String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for `node`, registering it (and every object shape reachable from
    /// its fields) on first sight.
    pub fn ensure_model(&mut self, node: &ObjectType, suggested_name: &str) -> String {
        if let Some(name) = self.by_node.get(node) {
            return name.clone();
        }
        let model_name = ensure_unique_name(&to_class_name(suggested_name), &mut self.used_names);
        self.by_node.insert(node.clone(), model_name.clone());

        for (field_name, field) in &node.fields {
            let nested = format!("{model_name}{}", to_class_name(field_name));
            self.walk(&field.ty, &nested);
        }
        model_name
    }

    fn walk(&mut self, node: &TypeNode, suggested_name: &str) {
        match node {
            TypeNode::Object(obj) => {
                self.ensure_model(obj, suggested_name);
            }
            TypeNode::Array(item) => self.walk(item, &format!("{suggested_name}Item")),
            TypeNode::Union(u) => {
                for option in u.options() {
                    self.walk(option, suggested_name);
                }
            }
            _ => {}
        }
    }

    /// Reserve a class name that is not backed by an object shape.
    pub fn claim_name(&mut self, suggested_name: &str) -> String {
        ensure_unique_name(&to_class_name(suggested_name), &mut self.used_names)
    }

    /// `(name, shape)` pairs in definition order.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, &ObjectType)> {
        self.by_node.iter().map(|(node, name)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }

    /// Python annotation for `node`. Union parts are sorted and deduplicated,
    /// with `None` moved last.
    pub fn annotation(&mut self, node: &TypeNode, context_name: &str) -> String {
        match node {
            TypeNode::Any => "Any".to_string(),
            TypeNode::Null => "None".to_string(),
            TypeNode::Bool => "bool".to_string(),
            TypeNode::Int => "int".to_string(),
            TypeNode::Float => "float".to_string(),
            TypeNode::Str => "str".to_string(),
            TypeNode::DateTime => "datetime".to_string(),
            TypeNode::Array(item) => {
                format!("list[{}]", self.annotation(item, &format!("{context_name}Item")))
            }
            TypeNode::Object(obj) => self.ensure_model(obj, context_name),
            TypeNode::Union(u) => {
                let mut parts: Vec<String> =
                    u.options().iter().map(|o| self.annotation(o, context_name)).collect();
                parts.sort();
                parts.dedup();
                let had_none = parts.iter().any(|p| p == "None");
                parts.retain(|p| p != "None");
                if had_none {
                    parts.push("None".to_string());
                }
                parts.join(" | ")
            }
        }
    }
}
