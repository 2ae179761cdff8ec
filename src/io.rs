//! Sample sources: JSON files, directories of JSON files and NDJSON streams.
use std::io::BufRead;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

pub fn read_json_file(path: &Path) -> Result<Value> {
    let source = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_slice(&source).map_err(|e| Error::json(path, e))
}

/// Sorted `*.json` files under `dir` (descending into subdirectories when `recursive`).
pub fn iter_json_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let suffix = if recursive { "**/*.json" } else { "*.json" };
    // the directory itself is literal; only the suffix is a pattern
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = Path::new(&base).join(suffix);
    let pattern = pattern.to_string_lossy();
    let mut out = Vec::new();
    for entry in glob::glob(&pattern).map_err(|e| Error::Glob(e.to_string()))? {
        let path = entry.map_err(|e| Error::Glob(e.to_string()))?;
        if path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    debug!(dir = %dir.display(), files = out.len(), "scanned directory");
    Ok(out)
}

/// A top-level array is a batch of samples; anything else is one sample.
pub fn samples_of(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Newline-delimited JSON; blank lines are skipped and array lines expand.
pub fn iter_json_from_stream<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Value>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let label = format!("<stream line {}>", i + 1);
            match line {
                Err(e) => Some(Err(Error::io(label, e))),
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(
                    serde_json::from_str::<Value>(line.trim()).map_err(|e| Error::json(label, e)),
                ),
            }
        })
        .flat_map(|item| match item {
            Ok(value) => samples_of(value).into_iter().map(Ok).collect::<Vec<_>>(),
            Err(e) => vec![Err(e)],
        })
}

/// Literal paths, directories (scanned recursively) or quoted glob patterns.
pub fn resolve_inputs<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).map_err(|e| Error::Glob(e.to_string()))? {
                let path = entry.map_err(|e| Error::Glob(e.to_string()))?;
                matched_any = true;
                out.push(path);
            }
            if !matched_any {
                return Err(Error::Glob(format!("glob pattern matched no files: {pattern}")));
            }
        } else {
            let path = PathBuf::from(pattern);
            if path.is_dir() {
                out.extend(iter_json_files(&path, true)?);
            } else {
                out.push(path);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn directory_scan_is_sorted_and_optionally_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("sub").join("c.json"), "{}").unwrap();

        let flat = iter_json_files(dir.path(), false).unwrap();
        let names: Vec<_> = flat.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);

        let deep = iter_json_files(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn directory_names_with_glob_metacharacters_are_literal() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("data[1]");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("a.json"), "{}").unwrap();

        assert_eq!(iter_json_files(&sub, true).unwrap(), vec![sub.join("a.json")]);
        assert_eq!(iter_json_files(&sub, false).unwrap(), vec![sub.join("a.json")]);
    }

    #[test]
    fn array_payload_expands() {
        assert_eq!(samples_of(json!([1, 2])).len(), 2);
        assert_eq!(samples_of(json!({"a": 1})), vec![json!({"a": 1})]);
    }

    #[test]
    fn ndjson_stream() {
        let input = "{\"a\": 1}\n\n[{\"a\": 2}, {\"a\": 3}]\n  \n{\"a\": 4}\n";
        let values: Vec<Value> =
            iter_json_from_stream(input.as_bytes()).collect::<Result<_>>().unwrap();
        assert_eq!(
            values,
            vec![json!({"a": 1}), json!({"a": 2}), json!({"a": 3}), json!({"a": 4})]
        );
    }

    #[test]
    fn ndjson_reports_bad_lines() {
        let input = "{\"a\": 1}\nnot json\n";
        let results: Vec<_> = iter_json_from_stream(input.as_bytes()).collect();
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err().to_string();
        assert!(err.contains("line 2"), "{err}");
    }

    #[test]
    fn unmatched_glob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.json", dir.path().display());
        assert!(matches!(resolve_inputs([pattern]), Err(Error::Glob(_))));
    }

    #[test]
    fn directories_expand_to_their_json_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.json"), "[]").unwrap();
        let resolved = resolve_inputs([dir.path().to_string_lossy()]).unwrap();
        assert_eq!(resolved, vec![dir.path().join("one.json")]);
    }
}
