use std::collections::{BTreeMap, BTreeSet};

use super::join;
use crate::ir::{FieldInfo, ObjectType, MAX_EXAMPLES};

impl ObjectType {
    /// Field-wise merge. Counts are additive, so a field missing from any
    /// sample ends up with `required_count < sample_count` (optional).
    pub(super) fn join(a: &Self, b: &Self, strict_numbers: bool) -> Self {
        let total = a.sample_count + b.sample_count;
        let mut fields = BTreeMap::new();

        // merge keys from a
        for (k, fa) in &a.fields {
            let merged = match b.fields.get(k) {
                None => FieldInfo { sample_count: total, ..fa.clone() },
                Some(fb) => FieldInfo {
                    ty: join(&fa.ty, &fb.ty, strict_numbers),
                    required_count: fa.required_count + fb.required_count,
                    sample_count: total,
                    examples: merge_examples(&fa.examples, &fb.examples),
                },
            };
            fields.insert(k.clone(), merged);
        }
        // add keys only in b
        for (k, fb) in &b.fields {
            if !a.fields.contains_key(k) {
                fields.insert(k.clone(), FieldInfo { sample_count: total, ..fb.clone() });
            }
        }

        ObjectType::new(fields, total)
    }
}

fn merge_examples(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
    a.union(b).take(MAX_EXAMPLES).cloned().collect()
}
