//! Semantic diff between two model schemas.
//!
//! Works on annotation strings rather than [`TypeNode`](crate::ir::TypeNode)s:
//! the two snapshots are parsed independently and share no node identity.
//! Widening (old alternatives ⊆ new alternatives) is the only type change
//! that is not breaking.
pub mod extract;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::Serialize;

pub use extract::parse_models;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelField {
    pub annotation: String,
    pub required: bool,
}

/// class name → field name → field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelSchema {
    pub classes: BTreeMap<String, BTreeMap<String, ModelField>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiffSeverity {
    #[serde(rename = "breaking")]
    Breaking,
    #[serde(rename = "non-breaking")]
    NonBreaking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub severity: DiffSeverity,
    pub class_name: String,
    pub field_name: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeChange {
    Same,
    Widened,
    Narrowed,
    Changed,
}

impl DiffSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            DiffSeverity::Breaking => "breaking",
            DiffSeverity::NonBreaking => "non-breaking",
        }
    }
}

impl fmt::Display for TypeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeChange::Same => "same",
            TypeChange::Widened => "widened",
            TypeChange::Narrowed => "narrowed",
            TypeChange::Changed => "changed",
        })
    }
}

impl DiffEntry {
    fn new(
        severity: DiffSeverity,
        class_name: &str,
        field_name: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            class_name: class_name.to_string(),
            field_name: field_name.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn is_breaking(&self) -> bool {
        self.severity == DiffSeverity::Breaking
    }
}

// ------------------------------ Annotations ------------------------------ //

/// Drop `typing.` qualifiers and whitespace so formatting does not register as change.
pub fn normalize_annotation(annotation: &str) -> String {
    annotation
        .replace("typing.", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Split on `|` at bracket depth zero: `dict[str,int|None]|str` → {`dict[str,int|None]`, `str`}.
pub fn split_top_level_union(annotation: &str) -> BTreeSet<String> {
    let mut parts = BTreeSet::new();
    let mut buf = String::new();
    let mut depth: i32 = 0;
    for ch in annotation.chars() {
        match ch {
            '[' => depth += 1,
            ']' => depth -= 1,
            '|' if depth == 0 => {
                if !buf.is_empty() {
                    parts.insert(std::mem::take(&mut buf));
                }
                continue;
            }
            _ => {}
        }
        buf.push(ch);
    }
    if !buf.is_empty() {
        parts.insert(buf);
    }
    parts
}

pub fn classify_type_change(old: &str, new: &str) -> TypeChange {
    let old_set = split_top_level_union(old);
    let new_set = split_top_level_union(new);
    if old_set == new_set {
        TypeChange::Same
    } else if old_set.is_subset(&new_set) {
        TypeChange::Widened
    } else if new_set.is_subset(&old_set) {
        TypeChange::Narrowed
    } else {
        TypeChange::Changed
    }
}

// ---------------------------------- Diff ---------------------------------- //

/// Severity-classified changes from `old` to `new`, in sorted class/field order.
pub fn diff_schemas(old: &ModelSchema, new: &ModelSchema) -> Vec<DiffEntry> {
    use DiffSeverity::*;
    let mut entries = Vec::new();

    for class_name in old.classes.keys().filter(|c| !new.classes.contains_key(*c)) {
        entries.push(DiffEntry::new(Breaking, class_name, None, "Model removed"));
    }
    for class_name in new.classes.keys().filter(|c| !old.classes.contains_key(*c)) {
        entries.push(DiffEntry::new(NonBreaking, class_name, None, "Model added"));
    }

    for (class_name, old_fields) in &old.classes {
        let Some(new_fields) = new.classes.get(class_name) else {
            continue;
        };

        for field_name in old_fields.keys().filter(|f| !new_fields.contains_key(*f)) {
            entries.push(DiffEntry::new(Breaking, class_name, Some(field_name), "Field removed"));
        }

        for (field_name, field) in new_fields.iter().filter(|(f, _)| !old_fields.contains_key(*f)) {
            let (severity, message) = if field.required {
                (Breaking, "New required field")
            } else {
                (NonBreaking, "New optional field")
            };
            entries.push(DiffEntry::new(severity, class_name, Some(field_name), message));
        }

        for (field_name, old_field) in old_fields {
            let Some(new_field) = new_fields.get(field_name) else {
                continue;
            };

            match (old_field.required, new_field.required) {
                (true, false) => entries.push(DiffEntry::new(
                    NonBreaking,
                    class_name,
                    Some(field_name),
                    "Field changed from required to optional",
                )),
                (false, true) => entries.push(DiffEntry::new(
                    Breaking,
                    class_name,
                    Some(field_name),
                    "Field changed from optional to required",
                )),
                _ => {}
            }

            let change = classify_type_change(&old_field.annotation, &new_field.annotation);
            let severity = match change {
                TypeChange::Same => continue,
                TypeChange::Widened => NonBreaking,
                TypeChange::Narrowed | TypeChange::Changed => Breaking,
            };
            entries.push(DiffEntry::new(
                severity,
                class_name,
                Some(field_name),
                format!("Type {change}: {} -> {}", old_field.annotation, new_field.annotation),
            ));
        }
    }

    entries
}

/// Extract both model files and diff them.
pub fn diff_models(old_path: &Path, new_path: &Path) -> crate::error::Result<Vec<DiffEntry>> {
    let old = extract::load_models(old_path)?;
    let new = extract::load_models(new_path)?;
    Ok(diff_schemas(&old, &new))
}

/// One `[severity] Class.field: message` line per entry.
pub fn format_diff(entries: &[DiffEntry]) -> String {
    if entries.is_empty() {
        return "No semantic changes detected.".to_string();
    }
    entries
        .iter()
        .map(|e| {
            let target = match &e.field_name {
                Some(field) => format!("{}.{field}", e.class_name),
                None => e.class_name.clone(),
            };
            format!("[{}] {target}: {}", e.severity.as_str(), e.message)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ------------------------------- Tests ------------------------------------ //
