//! CLI: infer → (models | state | JSON Schema), drift monitoring, model diffs.
use std::collections::BTreeMap;
use std::io::{BufReader, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codegen::generate_models;
use crate::diff::{diff_models, format_diff, DiffEntry};
use crate::drift::{DriftKind, Severity};
use crate::error::Error;
use crate::inference::{infer_from_values, TypeInferer};
use crate::io::{iter_json_from_stream, read_json_file, resolve_inputs, samples_of};
use crate::ir::TypeNode;
use crate::jq_exec::JqFilter;
use crate::json_schema::{load_json_schema, save_json_schema, DEFAULT_TITLE};
use crate::lattice::join_all;
use crate::monitor::{monitor_directory_once, MonitorOptions, MonitorReport};
use crate::state::{
    load_schema_state, save_schema_state, schema_state_hash, schema_summary, SchemaSummary,
};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_MONITOR_WARNING: i32 = 20;
pub const EXIT_MONITOR_BREAKING: i32 = 21;

const DEFAULT_STATE: &str = ".json-drift/state.json";
const STDIN: &str = "-";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// infer and maintain Pydantic models from messy, evolving JSON
#[derive(Parser, Debug)]
#[command(name = "json-drift", version)]
pub struct CommandLineInterface {
    #[command(flatten)]
    log: LogSettings,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// infer a schema incrementally from NDJSON on stdin
    Watch(WatchCmd),
    /// generate Pydantic models from samples, a saved state or a JSON Schema
    Generate(GenerateCmd),
    /// scan a directory of JSON files for drift against the saved state
    Monitor(MonitorCmd),
    /// semantic diff between two Pydantic model files
    Diff(DiffCmd),
    /// deterministic schema/drift snapshot for CI
    Status(StatusCmd),
    /// convert between saved state and JSON Schema
    Schema(SchemaCmd),
}

#[derive(Args, Debug, Clone)]
struct LogSettings {
    /// log level or filter directive (RUST_LOG wins when set)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs. May be literal paths, directories, quoted glob patterns or '-' for stdin
    ///
    /// Without any input, NDJSON is read from stdin.
    #[arg(long, short, num_args = 1..)]
    input: Vec<String>,

    /// treat input files as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items)
    #[arg(long)]
    json_pointer: Option<String>,

    /// jq pre-process filter for each document; every output is a sample
    #[arg(long = "jq")]
    jq_expr: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct ModelSettings {
    /// top-level model class name
    #[arg(long, default_value = "Root")]
    root_name: String,

    /// keep int and float apart instead of widening to float
    #[arg(long, default_value_t = false)]
    strict_numbers: bool,
}

#[derive(Args, Debug, Clone)]
struct JsonSchemaExport {
    /// also write the schema as JSON Schema (draft 2020-12)
    #[arg(long)]
    export_json_schema: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_TITLE)]
    json_schema_title: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FailOn {
    None,
    Breaking,
    Any,
}

#[derive(clap::Parser, Debug)]
struct WatchCmd {
    #[command(flatten)]
    model: ModelSettings,

    #[command(flatten)]
    export: JsonSchemaExport,

    /// output .py file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_STATE)]
    state: PathBuf,

    /// re-emit models every N samples (0 = only at the end)
    #[arg(long, default_value_t = 0)]
    every: usize,
}

#[derive(clap::Parser, Debug)]
#[command(group(ArgGroup::new("source").args(["from_state", "from_json_schema"])))]
struct GenerateCmd {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    model: ModelSettings,

    #[command(flatten)]
    export: JsonSchemaExport,

    /// load the schema from a saved state instead of inferring it
    #[arg(long, conflicts_with = "input")]
    from_state: Option<PathBuf>,

    /// load the schema from a JSON Schema document instead of inferring it
    #[arg(long, conflicts_with = "input")]
    from_json_schema: Option<PathBuf>,

    /// output .py file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    save_state: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct MonitorCmd {
    directory: PathBuf,

    #[command(flatten)]
    model: ModelSettings,

    #[command(flatten)]
    export: JsonSchemaExport,

    #[arg(long, default_value = DEFAULT_STATE)]
    state: PathBuf,

    /// with --autopatch, rewrite this model file from the patched schema
    #[arg(long)]
    model_output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    no_recursive: bool,

    /// fold drifting samples into the saved state
    #[arg(long, default_value_t = false)]
    autopatch: bool,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[arg(long, value_enum, default_value_t = FailOn::None)]
    fail_on: FailOn,
}

#[derive(clap::Parser, Debug)]
struct DiffCmd {
    old_model: PathBuf,
    new_model: PathBuf,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// exit with status 1 when any change is breaking
    #[arg(long, default_value_t = false)]
    fail_on_breaking: bool,
}

#[derive(clap::Parser, Debug)]
struct StatusCmd {
    /// optional directory to take a drift snapshot of
    directory: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_STATE)]
    state: PathBuf,

    #[arg(long, default_value_t = false)]
    no_recursive: bool,

    #[arg(long, default_value_t = false)]
    strict_numbers: bool,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
#[command(group(ArgGroup::new("from").required(true).args(["from_state", "from_json_schema"])))]
#[command(group(
    ArgGroup::new("to").required(true).multiple(true).args(["to_state", "to_json_schema"])
))]
struct SchemaCmd {
    #[arg(long)]
    from_state: Option<PathBuf>,

    #[arg(long)]
    from_json_schema: Option<PathBuf>,

    #[arg(long)]
    to_state: Option<PathBuf>,

    #[arg(long)]
    to_json_schema: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_TITLE)]
    json_schema_title: String,
}

// ————————————————————————————————————————————————————————————————————————————
// REPORT PAYLOADS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Serialize)]
struct MonitorPayload {
    summary: MonitorSummary,
    files: Vec<FilePayload>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    actions: BTreeMap<&'static str, String>,
}

#[derive(Debug, Serialize)]
struct MonitorSummary {
    files_scanned: usize,
    files_with_drift: usize,
    total_events: usize,
    breaking_events: usize,
    warning_events: usize,
}

#[derive(Debug, Serialize)]
struct FilePayload {
    path: String,
    events: Vec<EventPayload>,
}

#[derive(Debug, Serialize)]
struct EventPayload {
    path: String,
    expected: String,
    observed: String,
    kind: DriftKind,
    severity: Severity,
}

#[derive(Debug, Serialize)]
struct DiffPayload<'a> {
    summary: DiffSummary,
    changes: &'a [DiffEntry],
}

#[derive(Debug, Serialize)]
struct DiffSummary {
    total_changes: usize,
    breaking_changes: usize,
    non_breaking_changes: usize,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    state_path: String,
    state_hash: String,
    schema: SchemaSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    drift: Option<MonitorPayload>,
}

impl MonitorPayload {
    fn from_report(report: &MonitorReport) -> Self {
        let (breaking_events, warning_events) = report.severity_counts();
        let files = report
            .drifts
            .iter()
            .map(|file| FilePayload {
                path: file.path.display().to_string(),
                events: file
                    .events
                    .iter()
                    .map(|e| EventPayload {
                        path: e.path.clone(),
                        expected: e.expected.clone(),
                        observed: e.observed.clone(),
                        kind: e.kind,
                        severity: e.severity(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            summary: MonitorSummary {
                files_scanned: report.files_scanned,
                files_with_drift: report.files_with_drift,
                total_events: breaking_events + warning_events,
                breaking_events,
                warning_events,
            },
            files,
            actions: BTreeMap::new(),
        }
    }

    fn to_text(&self) -> String {
        let s = &self.summary;
        let mut lines = vec![format!("Scanned {} file(s)", s.files_scanned)];
        if s.total_events == 0 {
            lines.push("No schema drift detected.".green().to_string());
            return lines.join("\n");
        }
        lines.push(format!(
            "Detected {} drift event(s) in {} file(s).",
            s.total_events, s.files_with_drift
        ));
        lines.push(format!("Breaking: {} | Warning: {}", s.breaking_events, s.warning_events));
        for file in &self.files {
            lines.push(format!("- {}", file.path));
            for e in &file.events {
                let tag = format!("[{}/{}]", e.severity.as_str(), e.kind.as_str());
                let tag = match e.severity {
                    Severity::Breaking => tag.red().bold(),
                    Severity::Warning => tag.yellow(),
                };
                lines.push(format!(
                    "  {tag} {}: expected {}, observed {}",
                    e.path, e.expected, e.observed
                ));
            }
        }
        lines.join("\n")
    }

    fn exit_code(&self, fail_on: FailOn) -> i32 {
        let s = &self.summary;
        match fail_on {
            FailOn::None => EXIT_OK,
            _ if s.breaking_events > 0 => EXIT_MONITOR_BREAKING,
            FailOn::Any if s.warning_events > 0 => EXIT_MONITOR_WARNING,
            _ => EXIT_OK,
        }
    }
}

impl<'a> DiffPayload<'a> {
    fn new(entries: &'a [DiffEntry]) -> Self {
        let breaking = entries.iter().filter(|e| e.is_breaking()).count();
        Self {
            summary: DiffSummary {
                total_changes: entries.len(),
                breaking_changes: breaking,
                non_breaking_changes: entries.len() - breaking,
            },
            changes: entries,
        }
    }
}

impl StatusPayload {
    fn to_text(&self) -> String {
        let c = &self.schema.counts;
        let mut lines = vec![
            format!("State: {}", self.state_path),
            format!("State hash: {}", self.state_hash),
            format!("Root type: {}", self.schema.root_type),
            format!(
                "Type counts: object={}, array={}, union={}, scalars={}",
                c.object,
                c.array,
                c.union,
                c.scalars()
            ),
            format!(
                "Fields: total={}, required={}, optional={}",
                c.field_total, c.field_required, c.field_optional
            ),
        ];
        if let Some(drift) = &self.drift {
            let s = &drift.summary;
            lines.push("Drift snapshot:".to_string());
            lines.push(format!(
                "  scanned={}, files_with_drift={}, events={} (breaking={}, warning={})",
                s.files_scanned,
                s.files_with_drift,
                s.total_events,
                s.breaking_events,
                s.warning_events
            ));
        }
        lines.join("\n")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn describe(&self) -> String {
        if self.input.is_empty() {
            "stdin".to_string()
        } else {
            self.input.join(", ")
        }
    }

    fn reads_stdin(&self) -> bool {
        self.input.is_empty() || self.input.iter().any(|i| i == STDIN)
    }

    /// Pointer and jq selection for one document. Plain file documents expand
    /// a top-level array; stream lines were already expanded by the reader.
    fn select(
        &self,
        doc: Value,
        expand: bool,
        origin: &str,
        jq: Option<&JqFilter>,
    ) -> anyhow::Result<Vec<Value>> {
        let selected = match self.json_pointer.as_deref() {
            None => doc,
            Some(pointer) => match doc.pointer(pointer) {
                Some(node) => node.clone(),
                None => {
                    warn!(origin, pointer, "JSON pointer matched nothing; document skipped");
                    return Ok(Vec::new());
                }
            },
        };
        let docs = match jq {
            None => vec![selected],
            Some(filter) => filter
                .run(&selected)
                .with_context(|| format!("failed to apply jq expression to {origin}"))?,
        };
        let filtered = self.json_pointer.is_some() || self.jq_expr.is_some();
        Ok(if expand || filtered {
            docs.into_iter().flat_map(samples_of).collect()
        } else {
            docs
        })
    }

    fn load_file(&self, path: &Path, jq: Option<&JqFilter>) -> anyhow::Result<Vec<Value>> {
        let origin = path.display().to_string();
        if self.ndjson {
            let file =
                std::fs::File::open(path).with_context(|| format!("failed to open {origin}"))?;
            let mut out = Vec::new();
            for doc in iter_json_from_stream(BufReader::new(file)) {
                let doc = doc.with_context(|| format!("in {origin}"))?;
                out.extend(self.select(doc, false, &origin, jq)?);
            }
            return Ok(out);
        }
        let doc = read_json_file(path)?;
        self.select(doc, true, &origin, jq)
    }

    fn load_stdin(&self, jq: Option<&JqFilter>) -> anyhow::Result<Vec<Value>> {
        let mut out = Vec::new();
        for doc in iter_json_from_stream(std::io::stdin().lock()) {
            out.extend(self.select(doc?, false, "<stdin>", jq)?);
        }
        Ok(out)
    }

    /// Each file is inferred on its own (in parallel) and the per-file roots
    /// are joined in input order.
    fn infer(&self, strict_numbers: bool) -> anyhow::Result<Option<TypeNode>> {
        let patterns: Vec<&String> = self.input.iter().filter(|i| *i != STDIN).collect();
        let paths = resolve_inputs(patterns)?;
        debug!(files = paths.len(), "resolved inputs");
        let jq = match self.jq_expr.as_deref() {
            Some(src) => Some(JqFilter::compile(src).context("failed to compile jq expression")?),
            None => None,
        };
        let jq = jq.as_ref();

        let mut roots = paths
            .par_iter()
            .map(|path| -> anyhow::Result<Option<TypeNode>> {
                let samples = self.load_file(path, jq)?;
                if samples.is_empty() {
                    warn!(path = %path.display(), "no samples in file");
                }
                Ok(infer_from_values(&samples, strict_numbers))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        if self.reads_stdin() {
            roots.push(infer_from_values(self.load_stdin(jq)?, strict_numbers));
        }
        Ok(join_all(roots.into_iter().flatten(), strict_numbers))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Run the selected command and return its process exit code.
    pub fn run(&self) -> anyhow::Result<i32> {
        crate::logging::init(&crate::logging::Config {
            level: self.log.log_level.clone(),
            json: self.log.log_json,
        });
        if !std::io::stdout().is_terminal() {
            colored::control::set_override(false);
        }
        match &self.cmd {
            Command::Watch(cmd) => cmd.run(),
            Command::Generate(cmd) => cmd.run(),
            Command::Monitor(cmd) => cmd.run(),
            Command::Diff(cmd) => cmd.run(),
            Command::Status(cmd) => cmd.run(),
            Command::Schema(cmd) => cmd.run(),
        }
    }
}

impl WatchCmd {
    fn run(&self) -> anyhow::Result<i32> {
        let mut inf = TypeInferer::with_strict_numbers(self.model.strict_numbers);
        for (seen, doc) in iter_json_from_stream(std::io::stdin().lock()).enumerate() {
            inf.observe(&doc?);
            let seen = seen + 1;
            if self.every > 0 && seen % self.every == 0 {
                if let Some(root) = inf.root() {
                    info!(samples = seen, "periodic model refresh");
                    let models = generate_models(root, &self.model.root_name);
                    emit_models(&models, self.output.as_deref())?;
                }
            }
        }
        let Some(root) = inf.root() else {
            return Err(Error::NoSamples("stdin".into()).into());
        };

        emit_models(&generate_models(root, &self.model.root_name), self.output.as_deref())?;
        save_schema_state(&self.state, root)?;
        note(format!("Saved state to {}", self.state.display()));
        self.export.write(root)?;
        Ok(EXIT_OK)
    }
}

impl GenerateCmd {
    fn run(&self) -> anyhow::Result<i32> {
        let root = if let Some(path) = &self.from_state {
            Some(load_schema_state(path)?)
        } else if let Some(path) = &self.from_json_schema {
            Some(load_json_schema(path)?)
        } else {
            self.input_settings.infer(self.model.strict_numbers)?
        };
        let Some(root) = root else {
            return Err(Error::NoSamples(self.input_settings.describe()).into());
        };

        emit_models(&generate_models(&root, &self.model.root_name), self.output.as_deref())?;
        if let Some(path) = &self.save_state {
            save_schema_state(path, &root)?;
            note(format!("Saved state to {}", path.display()));
        }
        self.export.write(&root)?;
        Ok(EXIT_OK)
    }
}

impl MonitorCmd {
    fn run(&self) -> anyhow::Result<i32> {
        let expected = if self.state.exists() {
            Some(load_schema_state(&self.state)?)
        } else {
            info!(
                state = %self.state.display(),
                "no saved state; the first sample becomes the baseline"
            );
            None
        };

        let opts = MonitorOptions {
            recursive: !self.no_recursive,
            autopatch: self.autopatch,
            strict_numbers: self.model.strict_numbers,
        };
        let (new_root, report) = monitor_directory_once(&self.directory, expected, &opts)?;
        let mut payload = MonitorPayload::from_report(&report);

        if let Some(root) = &new_root {
            save_schema_state(&self.state, root)?;
            payload.actions.insert("saved_state", self.state.display().to_string());

            if self.autopatch {
                if let Some(path) = &self.model_output {
                    write_text(path, &generate_models(root, &self.model.root_name))?;
                    payload.actions.insert("saved_model", path.display().to_string());
                }
                if let Some(path) = &self.export.export_json_schema {
                    save_json_schema(path, root, &self.export.json_schema_title)?;
                    payload.actions.insert("saved_json_schema", path.display().to_string());
                }
            }
        }

        match self.format {
            Format::Json => println!("{}", serde_json::to_string_pretty(&payload)?),
            Format::Text => {
                println!("{}", payload.to_text());
                for (label, path) in &payload.actions {
                    println!("{label}: {path}");
                }
            }
        }
        Ok(payload.exit_code(self.fail_on))
    }
}

impl DiffCmd {
    fn run(&self) -> anyhow::Result<i32> {
        let entries = diff_models(&self.old_model, &self.new_model)?;
        match self.format {
            Format::Json => {
                println!("{}", serde_json::to_string_pretty(&DiffPayload::new(&entries))?)
            }
            Format::Text => println!("{}", format_diff(&entries)),
        }
        if self.fail_on_breaking && entries.iter().any(DiffEntry::is_breaking) {
            return Ok(EXIT_FAILURE);
        }
        Ok(EXIT_OK)
    }
}

impl StatusCmd {
    fn run(&self) -> anyhow::Result<i32> {
        if !self.state.exists() {
            let msg = format!("state file does not exist: {}", self.state.display());
            return Err(Error::Config(msg).into());
        }
        let root = load_schema_state(&self.state)?;

        let drift = match &self.directory {
            None => None,
            Some(dir) => {
                let opts = MonitorOptions {
                    recursive: !self.no_recursive,
                    autopatch: false,
                    strict_numbers: self.strict_numbers,
                };
                let (_, report) = monitor_directory_once(dir, Some(root.clone()), &opts)?;
                Some(MonitorPayload::from_report(&report))
            }
        };
        let payload = StatusPayload {
            state_path: self.state.display().to_string(),
            state_hash: schema_state_hash(&root),
            schema: schema_summary(&root),
            drift,
        };

        let text = match self.format {
            Format::Json => serde_json::to_string_pretty(&payload)?,
            Format::Text => payload.to_text(),
        };
        match &self.output {
            None => println!("{text}"),
            Some(path) => {
                write_text(path, &format!("{text}\n"))?;
                note(format!("Wrote report to {}", path.display()));
            }
        }
        Ok(EXIT_OK)
    }
}

impl SchemaCmd {
    fn run(&self) -> anyhow::Result<i32> {
        let root = match (&self.from_state, &self.from_json_schema) {
            (Some(path), None) => load_schema_state(path)?,
            (None, Some(path)) => load_json_schema(path)?,
            _ => {
                let msg = "specify exactly one input: --from-state or --from-json-schema";
                return Err(Error::Config(msg.into()).into());
            }
        };
        if let Some(path) = &self.to_state {
            save_schema_state(path, &root)?;
            note(format!("Wrote state to {}", path.display()));
        }
        if let Some(path) = &self.to_json_schema {
            save_json_schema(path, &root, &self.json_schema_title)?;
            note(format!("Wrote JSON Schema to {}", path.display()));
        }
        Ok(EXIT_OK)
    }
}

impl JsonSchemaExport {
    fn write(&self, root: &TypeNode) -> anyhow::Result<()> {
        if let Some(path) = &self.export_json_schema {
            save_json_schema(path, root, &self.json_schema_title)?;
            note(format!("Wrote JSON Schema to {}", path.display()));
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Status lines go to stderr; stdout carries generated source and reports.
fn note(msg: String) {
    eprintln!("{}", msg.dimmed());
}

fn write_text(path: &Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

fn emit_models(code: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        None => print!("{code}"),
        Some(path) => {
            write_text(path, code)?;
            note(format!("Wrote models to {}", path.display()));
        }
    }
    Ok(())
}
