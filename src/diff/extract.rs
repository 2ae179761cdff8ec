//! Lightweight reader for Pydantic model sources.
//!
//! Understands the shape `codegen` emits and most hand-written models:
//! top-level `class X(BaseModel):` blocks whose body holds annotated
//! attributes (`name: annotation [= default]`) at one indentation level.
//! It is not a Python parser; anything it does not recognise is skipped.
use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{normalize_annotation, ModelField, ModelSchema};
use crate::error::{Error, Result};

static CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^class\s+([A-Za-z_]\w*)\s*\(([^)]*)\)\s*:").unwrap());

static FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*:\s*(.+?)\s*(?:=\s*(.+?))?\s*$").unwrap());

pub fn load_models(path: &Path) -> Result<ModelSchema> {
    let source = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(parse_models(&source))
}

pub fn parse_models(source: &str) -> ModelSchema {
    let mut classes = BTreeMap::new();
    let mut current: Option<(String, BTreeMap<String, ModelField>)> = None;
    let mut body_indent: Option<usize> = None;
    let mut in_docstring = false;
    // a field statement whose brackets are still open, and the open depth
    let mut pending: Option<(String, i32)> = None;

    for raw in source.lines() {
        let line = strip_comment(raw);
        let trimmed = line.trim();

        if let Some((mut statement, depth)) = pending.take() {
            statement.push(' ');
            statement.push_str(trimmed);
            let depth = depth + bracket_depth(trimmed);
            if depth > 0 {
                pending = Some((statement, depth));
            } else if let Some((_, fields)) = current.as_mut() {
                insert_field(fields, &statement);
            }
            continue;
        }

        let quotes = trimmed.matches("\"\"\"").count() + trimmed.matches("'''").count();
        if in_docstring {
            if quotes % 2 == 1 {
                in_docstring = false;
            }
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        if quotes % 2 == 1 {
            in_docstring = true;
            continue;
        }

        let indent = line.len() - line.trim_start().len();
        if indent == 0 {
            if let Some((name, fields)) = current.take() {
                classes.insert(name, fields);
            }
            body_indent = None;
            if let Some(caps) = CLASS_RE.captures(trimmed) {
                if is_basemodel_subclass(&caps[2]) {
                    current = Some((caps[1].to_string(), BTreeMap::new()));
                }
            }
            continue;
        }

        let Some((_, fields)) = current.as_mut() else {
            continue;
        };
        let expected_indent = *body_indent.get_or_insert(indent);
        if indent != expected_indent {
            continue;
        }
        let depth = bracket_depth(trimmed);
        if depth > 0 {
            pending = Some((trimmed.to_string(), depth));
            continue;
        }
        insert_field(fields, trimmed);
    }

    if let Some((name, fields)) = current.take() {
        classes.insert(name, fields);
    }
    ModelSchema { classes }
}

fn insert_field(fields: &mut BTreeMap<String, ModelField>, statement: &str) {
    if let Some(caps) = FIELD_RE.captures(statement) {
        let required = is_field_required(caps.get(3).map(|m| m.as_str()));
        fields.insert(
            caps[1].to_string(),
            ModelField { annotation: normalize_annotation(&caps[2]), required },
        );
    }
}

/// Net count of brackets opened on a line, ignoring string literals.
fn bracket_depth(line: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    for ch in line.chars() {
        match (quote, ch) {
            (None, '"' | '\'') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth -= 1,
            _ => {}
        }
    }
    depth
}

fn is_basemodel_subclass(bases: &str) -> bool {
    bases
        .split(',')
        .map(str::trim)
        .any(|b| b == "BaseModel" || b.ends_with(".BaseModel"))
}

/// No default, or `Field(...)` with an Ellipsis first argument.
fn is_field_required(default: Option<&str>) -> bool {
    let Some(default) = default else {
        return true;
    };
    match default.strip_prefix("Field(") {
        Some(args) => args.trim_start().starts_with("..."),
        None => false,
    }
}

/// Cut a trailing `# comment` that is not inside a string literal.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, ch) in line.char_indices() {
        match (quote, ch) {
            (None, '#') => return &line[..i],
            (None, '"' | '\'') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            _ => {}
        }
    }
    line
}
