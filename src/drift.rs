//! Compatibility predicate and structural drift detection.
//!
//! `expected` is the persisted baseline, `observed` the type inferred from a
//! new sample. Compatibility is a yes/no answer; drift walks the structure and
//! reports every path that differs, even below a compatible parent.
use serde::Serialize;

use crate::ir::{ObjectType, TypeNode};

/// Placeholder for the `observed` side of a required field that is gone.
pub const MISSING: &str = "<missing>";
/// Placeholder for the `expected` side of a field the baseline never had.
pub const ABSENT: &str = "<absent>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    TypeMismatch,
    MissingRequiredField,
    NewField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Breaking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftEvent {
    /// `$` is the root, `.name` an object member, `[]` the array element.
    pub path: String,
    pub expected: String,
    pub observed: String,
    pub kind: DriftKind,
}

impl DriftKind {
    pub fn severity(self) -> Severity {
        match self {
            DriftKind::TypeMismatch | DriftKind::MissingRequiredField => Severity::Breaking,
            DriftKind::NewField => Severity::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DriftKind::TypeMismatch => "type_mismatch",
            DriftKind::MissingRequiredField => "missing_required_field",
            DriftKind::NewField => "new_field",
        }
    }
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Breaking => "breaking",
        }
    }
}

impl DriftEvent {
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

// ------------------------------ Compatibility ------------------------------ //

/// Does `observed` conform to `expected`?
///
/// `float` always accepts `int` here; the strict-numbers switch only governs
/// inference-time joins.
pub fn is_compatible(expected: &TypeNode, observed: &TypeNode) -> bool {
    if matches!(expected, TypeNode::Any) || expected == observed {
        return true;
    }
    match (expected, observed) {
        (TypeNode::Float, TypeNode::Int) => true,
        (TypeNode::Union(u), _) => u.options().iter().any(|o| is_compatible(o, observed)),
        (TypeNode::Array(e), TypeNode::Array(o)) => is_compatible(e, o),
        (TypeNode::Object(e), TypeNode::Object(o)) => objects_compatible(e, o),
        _ => same_scalar_family(expected, observed),
    }
}

fn objects_compatible(expected: &ObjectType, observed: &ObjectType) -> bool {
    expected.fields.iter().all(|(name, field)| match observed.field(name) {
        None => !field.is_required(),
        Some(seen) => is_compatible(&field.ty, &seen.ty),
    })
}

fn same_scalar_family(expected: &TypeNode, observed: &TypeNode) -> bool {
    use TypeNode::*;
    match (expected, observed) {
        (Null, Null) | (Bool, Bool) | (Int, Int) | (Float, Float) | (Str, Str)
        | (DateTime, DateTime) => true,
        (
            Any | Null | Bool | Int | Float | Str | DateTime | Array(_) | Object(_) | Union(_),
            _,
        ) => false,
    }
}

// ---------------------------------- Drift ---------------------------------- //

/// Every structural difference between `expected` and `observed`, rooted at `path`.
/// An empty list means no findings.
pub fn detect_drift(expected: &TypeNode, observed: &TypeNode, path: &str) -> Vec<DriftEvent> {
    let mut out = Vec::new();
    walk(expected, observed, path, &mut out);
    out
}

fn walk(expected: &TypeNode, observed: &TypeNode, path: &str, out: &mut Vec<DriftEvent>) {
    if let TypeNode::Union(u) = expected {
        if u.options().iter().any(|o| is_compatible(o, observed)) {
            return;
        }
    }

    // Object and array pairs are walked whether or not the parent is
    // compatible: optional fields and new fields still need reporting.
    match (expected, observed) {
        (TypeNode::Object(e), TypeNode::Object(o)) => walk_object(e, o, path, out),
        (TypeNode::Array(e), TypeNode::Array(o)) => walk(e, o, &format!("{path}[]"), out),
        _ if !is_compatible(expected, observed) => out.push(DriftEvent {
            path: path.to_string(),
            expected: expected.name(),
            observed: observed.name(),
            kind: DriftKind::TypeMismatch,
        }),
        _ => {}
    }
}

fn walk_object(
    expected: &ObjectType,
    observed: &ObjectType,
    path: &str,
    out: &mut Vec<DriftEvent>,
) {
    for (name, field) in &expected.fields {
        let child = format!("{path}.{name}");
        match observed.field(name) {
            None if field.is_required() => out.push(DriftEvent {
                path: child,
                expected: field.ty.name(),
                observed: MISSING.to_string(),
                kind: DriftKind::MissingRequiredField,
            }),
            None => {}
            Some(seen) => walk(&field.ty, &seen.ty, &child, out),
        }
    }
    for (name, seen) in &observed.fields {
        if expected.fields.contains_key(name) {
            continue;
        }
        out.push(DriftEvent {
            path: format!("{path}.{name}"),
            expected: ABSENT.to_string(),
            observed: seen.ty.name(),
            kind: DriftKind::NewField,
        });
    }
}

/// (breaking, warning) counts over a batch of events.
pub fn count_by_severity<'a, I>(events: I) -> (usize, usize)
where
    I: IntoIterator<Item = &'a DriftEvent>,
{
    events.into_iter().fold((0, 0), |(b, w), e| match e.severity() {
        Severity::Breaking => (b + 1, w),
        Severity::Warning => (b, w + 1),
    })
}

// ------------------------------- Tests ------------------------------------ //
