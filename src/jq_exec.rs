//! Optional jq pre-filter applied to each document before inference.
use jaq_core::{compile::Undefined, load, Compiler, Ctx, Native, RcIter};
use jaq_json::Val;
use serde_json::Value;

use crate::error::{Error, Result};

/// A jq program compiled once and run against any number of documents.
pub struct JqFilter {
    filter: jaq_core::Filter<Native<Val>>,
}

impl JqFilter {
    pub fn compile(filter_src: &str) -> Result<Self> {
        let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let arena = load::Arena::default();
        let program = load::File { code: filter_src, path: () };

        let modules = loader.load(&arena, program).map_err(parse_errors)?;

        let filter = Compiler::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(undefined_errors)?;
        Ok(Self { filter })
    }

    /// Every output of the filter is one sample.
    pub fn run(&self, input: &Value) -> Result<Vec<Value>> {
        let inputs = RcIter::new(core::iter::empty());
        let outputs = self.filter.run((Ctx::new([], &inputs), Val::from(input.clone())));
        outputs
            .map(|item| item.map(Value::from).map_err(|e| Error::Jq(format!("{e:?}"))))
            .collect()
    }
}

fn parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> Error {
    let msg = errs
        .into_iter()
        .map(|(file, err)| format!("parse error: {err:?} in `{}`", file.code))
        .collect::<Vec<_>>()
        .join("; ");
    Error::Jq(msg)
}

fn undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> Error {
    let msg = errs
        .into_iter()
        .flat_map(|(file, list)| {
            list.into_iter().map(move |(name, undef)| {
                format!("undefined `{name}`: {undef:?} in `{}`", file.code)
            })
        })
        .collect::<Vec<_>>()
        .join("; ");
    Error::Jq(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_and_fans_out() {
        let doc = json!({"data": {"items": [{"id": 1}, {"id": 2}]}});
        let out = JqFilter::compile(".data.items[]").unwrap().run(&doc).unwrap();
        assert_eq!(out, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[test]
    fn compiled_filter_is_reused_across_documents() {
        let filter = JqFilter::compile("{id: .id, n: (.xs | length)}").unwrap();
        let a = filter.run(&json!({"id": "a", "xs": [1, 2]})).unwrap();
        let b = filter.run(&json!({"id": 7, "xs": []})).unwrap();
        assert_eq!(a, vec![json!({"id": "a", "n": 2})]);
        assert_eq!(b, vec![json!({"id": 7, "n": 0})]);
    }

    #[test]
    fn runtime_errors_surface() {
        let filter = JqFilter::compile(".a + 1").unwrap();
        assert!(matches!(filter.run(&json!({"a": "x"})), Err(Error::Jq(_))));
    }

    #[test]
    fn bad_filter_is_an_error() {
        assert!(matches!(JqFilter::compile(".["), Err(Error::Jq(_))));
    }
}
