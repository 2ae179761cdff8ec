//! Pydantic v2 model source from an inferred schema.
pub mod naming;

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::ir::{FieldInfo, ObjectType, TypeNode};
use crate::lower::ModelRegistry;
use naming::{ensure_unique_name, is_identifier, to_class_name, to_field_name};

const HEADER: &str = "\
from __future__ import annotations

from datetime import datetime
from typing import Any

from pydantic import BaseModel, ConfigDict, Field, RootModel
";

/// Accumulates rendered classes; see [`generate_models`] for the one-shot form.
#[derive(Debug, Default)]
pub struct Codegen {
    registry: ModelRegistry,
    blocks: Vec<String>,
}

impl Codegen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Object roots become `BaseModel` classes; anything else becomes a
    /// `RootModel[...]` named `root_name`, preceded by any nested models.
    pub fn emit(&mut self, root: &TypeNode, root_name: &str) {
        match root {
            TypeNode::Object(obj) => {
                self.registry.ensure_model(obj, root_name);
                self.render_definitions();
            }
            other => {
                let class_name = self.registry.claim_name(root_name);
                let annotation = self.registry.annotation(other, &class_name);
                self.render_definitions();
                self.blocks.push(format!("class {class_name}(RootModel[{annotation}]):\n    pass"));
            }
        }
    }

    pub fn into_string(self) -> String {
        let mut out = String::from(HEADER);
        for block in &self.blocks {
            out.push_str("\n\n");
            out.push_str(block);
            out.push('\n');
        }
        out
    }

    fn render_definitions(&mut self) {
        // Every nested shape is registered by now, so rendering only reads names back.
        let defs: Vec<(String, ObjectType)> = self
            .registry
            .definitions()
            .map(|(name, node)| (name.to_string(), node.clone()))
            .collect();
        for (name, node) in &defs {
            let block = self.render_class(name, node);
            self.blocks.push(block);
        }
    }

    fn render_class(&mut self, name: &str, node: &ObjectType) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "class {name}(BaseModel):");
        let _ = writeln!(
            out,
            "    \"\"\"Inferred from {} sample(s); extra fields are allowed.\"\"\"",
            node.sample_count
        );
        out.push_str("    model_config = ConfigDict(extra=\"allow\")");
        if node.fields.is_empty() {
            out.push_str("\n    pass");
            return out;
        }
        let mut attr_names = HashSet::new();
        for (field_name, info) in &node.fields {
            out.push('\n');
            out.push_str(&self.field_line(name, field_name, info, &mut attr_names));
        }
        out
    }

    fn field_line(
        &mut self,
        owner: &str,
        field_name: &str,
        info: &FieldInfo,
        attr_names: &mut HashSet<String>,
    ) -> String {
        let context = format!("{owner}{}", to_class_name(field_name));
        let mut annotation = self.registry.annotation(&info.ty, &context);
        let optional = !info.is_required();
        if optional && !annotation.split(" | ").any(|part| part == "None") {
            annotation.push_str(" | None");
        }

        // JSON keys that are not Python identifiers keep the key as an alias.
        let attr = if is_identifier(field_name) {
            ensure_unique_name(field_name, attr_names)
        } else {
            ensure_unique_name(&to_field_name(field_name), attr_names)
        };
        // a JSON string literal is also a valid Python one
        let alias = (attr != field_name).then(|| serde_json::Value::from(field_name).to_string());

        match (alias, optional) {
            (None, false) => format!("    {attr}: {annotation}"),
            (None, true) => format!("    {attr}: {annotation} = None"),
            (Some(alias), false) => format!("    {attr}: {annotation} = Field(..., alias={alias})"),
            (Some(alias), true) => {
                format!("    {attr}: {annotation} = Field(default=None, alias={alias})")
            }
        }
    }
}

pub fn generate_models(root: &TypeNode, root_name: &str) -> String {
    let mut cg = Codegen::new();
    cg.emit(root, root_name);
    cg.into_string()
}
