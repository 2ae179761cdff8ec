//! Identifier helpers for generated Python source.
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9]+").unwrap());

const PY_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// `order_items` → `OrderItems`; empty input → `Model`; leading digit gets a `Model` prefix.
pub fn to_class_name(raw: &str) -> String {
    let name: String = WORD_RE
        .find_iter(raw)
        .map(|m| {
            let mut chars = m.as_str().chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    if name.is_empty() {
        return "Model".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("Model{name}");
    }
    name
}

/// Claim `candidate`, or the first free `candidate2`, `candidate3`, ...
pub fn ensure_unique_name(candidate: &str, used: &mut HashSet<String>) -> String {
    if used.insert(candidate.to_string()) {
        return candidate.to_string();
    }
    (2..)
        .map(|i| format!("{candidate}{i}"))
        .find(|name| used.insert(name.clone()))
        .unwrap_or_else(|| candidate.to_string())
}

/// A name usable as a public model attribute as-is.
///
/// Leading underscores are excluded: pydantic treats those as private
/// attributes, not fields.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic());
    head_ok && chars.all(|c| c == '_' || c.is_ascii_alphanumeric()) && !PY_KEYWORDS.contains(&name)
}

/// A usable attribute name for a JSON key; the caller keeps the key as an alias.
pub fn to_field_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let name_trimmed = name.trim_start_matches('_');
    if name_trimmed.is_empty() {
        name = "field".to_string();
    } else if name_trimmed.len() != name.len() {
        // leading underscores mark private attributes in pydantic
        name = name_trimmed.to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name = format!("field_{name}");
    }
    if PY_KEYWORDS.contains(&name.as_str()) {
        name.push('_');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names() {
        assert_eq!(to_class_name("order_items"), "OrderItems");
        assert_eq!(to_class_name("Root"), "Root");
        assert_eq!(to_class_name("9lives"), "Model9lives");
        assert_eq!(to_class_name("--"), "Model");
    }

    #[test]
    fn unique_names() {
        let mut used = HashSet::new();
        assert_eq!(ensure_unique_name("Item", &mut used), "Item");
        assert_eq!(ensure_unique_name("Item", &mut used), "Item2");
        assert_eq!(ensure_unique_name("Item", &mut used), "Item3");
    }

    #[test]
    fn field_names() {
        assert!(is_identifier("user_id"));
        assert!(!is_identifier("first-name"));
        assert!(!is_identifier("class"));
        assert!(!is_identifier("_id"));
        assert!(!is_identifier("__root__"));
        assert_eq!(to_field_name("first-name"), "first_name");
        assert_eq!(to_field_name("class"), "class_");
        assert_eq!(to_field_name("2fa"), "field_2fa");
        assert_eq!(to_field_name("_id"), "id");
        assert_eq!(to_field_name("@@"), "field");
    }
}
