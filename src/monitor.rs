//! One-shot drift scan of a directory of JSON files against a baseline.
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::drift::{count_by_severity, detect_drift, DriftEvent};
use crate::error::Result;
use crate::inference::infer_with;
use crate::io::{iter_json_files, read_json_file, samples_of};
use crate::ir::TypeNode;
use crate::lattice::join;

#[derive(Debug, Clone, Copy)]
pub struct MonitorOptions {
    pub recursive: bool,
    /// Fold each drifting sample into the baseline after reporting it.
    pub autopatch: bool,
    pub strict_numbers: bool,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self { recursive: true, autopatch: false, strict_numbers: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDrift {
    pub path: PathBuf,
    pub events: Vec<DriftEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorReport {
    pub files_scanned: usize,
    pub files_with_drift: usize,
    pub drifts: Vec<FileDrift>,
}

impl MonitorReport {
    /// (breaking, warning) across every file.
    pub fn severity_counts(&self) -> (usize, usize) {
        count_by_severity(self.drifts.iter().flat_map(|d| d.events.iter()))
    }

    pub fn total_events(&self) -> usize {
        self.drifts.iter().map(|d| d.events.len()).sum()
    }
}

/// Compare every sample under `dir` with `expected`.
///
/// Without a baseline the first sample becomes one. Events for a sample are
/// computed against the baseline as it stood before that sample, so an
/// autopatched baseline only affects later samples.
pub fn monitor_directory_once(
    dir: &Path,
    expected: Option<TypeNode>,
    opts: &MonitorOptions,
) -> Result<(Option<TypeNode>, MonitorReport)> {
    let mut expected = expected;
    let mut report = MonitorReport::default();

    for path in iter_json_files(dir, opts.recursive)? {
        report.files_scanned += 1;
        let mut file_events = Vec::new();

        for sample in samples_of(read_json_file(&path)?) {
            let observed = infer_with(&sample, opts.strict_numbers);
            let Some(baseline) = expected.take() else {
                debug!(path = %path.display(), "no baseline; adopting first sample");
                expected = Some(observed);
                continue;
            };
            let events = detect_drift(&baseline, &observed, "$");
            let next = if opts.autopatch && !events.is_empty() {
                join(&baseline, &observed, opts.strict_numbers)
            } else {
                baseline
            };
            expected = Some(next);
            file_events.extend(events);
        }

        if !file_events.is_empty() {
            debug!(path = %path.display(), events = file_events.len(), "drift detected");
            report.drifts.push(FileDrift { path, events: file_events });
        }
    }

    report.files_with_drift = report.drifts.len();
    let (breaking, warning) = report.severity_counts();
    info!(
        dir = %dir.display(),
        files = report.files_scanned,
        files_with_drift = report.files_with_drift,
        breaking,
        warning,
        "monitor pass complete"
    );
    Ok((expected, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::DriftKind;
    use crate::inference::infer;
    use serde_json::json;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn detects_drift_and_autopatches() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "{\"id\": 1}\n");
        write(dir.path(), "b.json", "{\"id\": \"x\"}\n");

        let opts = MonitorOptions { autopatch: true, ..Default::default() };
        let (root, report) =
            monitor_directory_once(dir.path(), Some(infer(&json!({"id": 1}))), &opts).unwrap();

        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.files_with_drift, 1);
        assert_eq!(report.drifts[0].path, dir.path().join("b.json"));
        assert_eq!(report.drifts[0].events[0].kind, DriftKind::TypeMismatch);

        let root = root.unwrap();
        let id = &root.as_object().unwrap().field("id").unwrap().ty;
        assert_eq!(*id, TypeNode::union([TypeNode::Int, TypeNode::Str]));
    }

    #[test]
    fn without_autopatch_the_baseline_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "[{\"id\": \"x\"}, {\"id\": \"y\"}]");
        let baseline = infer(&json!({"id": 1}));

        let options = MonitorOptions::default();
        let (root, report) =
            monitor_directory_once(dir.path(), Some(baseline.clone()), &options).unwrap();

        assert_eq!(root, Some(baseline));
        assert_eq!(report.total_events(), 2);
        assert_eq!(report.severity_counts(), (2, 0));
    }

    #[test]
    fn first_sample_becomes_the_baseline() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "[{\"id\": 1}, {\"id\": 2, \"extra\": true}]");

        let (root, report) =
            monitor_directory_once(dir.path(), None, &MonitorOptions::default()).unwrap();

        assert_eq!(root, Some(infer(&json!({"id": 1}))));
        assert_eq!(report.files_with_drift, 1);
        assert_eq!(report.drifts[0].events[0].kind, DriftKind::NewField);
        assert_eq!(report.severity_counts(), (0, 1));
    }

    #[test]
    fn autopatch_only_affects_later_samples() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "[{\"id\": \"x\"}, {\"id\": \"y\"}]");

        let opts = MonitorOptions { autopatch: true, ..Default::default() };
        let (_, report) =
            monitor_directory_once(dir.path(), Some(infer(&json!({"id": 1}))), &opts).unwrap();

        // the second sample already fits the patched baseline
        assert_eq!(report.total_events(), 1);
    }

    #[test]
    fn non_recursive_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "a.json", "{\"id\": \"x\"}");

        let opts = MonitorOptions { recursive: false, ..Default::default() };
        let (_, report) =
            monitor_directory_once(dir.path(), Some(infer(&json!({"id": 1}))), &opts).unwrap();
        assert_eq!(report.files_scanned, 0);
    }

    #[test]
    fn unreadable_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "{nope");
        assert!(monitor_directory_once(dir.path(), None, &MonitorOptions::default()).is_err());
    }
}
