//! Subcommand handlers. Each takes its input and output streams explicitly so
//! stdout stays machine-readable and the handlers can be exercised in tests.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use decision_log::{DecisionEntry, DecisionEventType, DecisionSource, DecisionWriter, VerdictRecord};
use guardrail_engine::loader::{load_policy_set, to_yaml};
use guardrail_engine::{
    evaluate, run_conformance, ActionRequest, CaseOutcome, Policy, PolicyEngine, PolicySet,
    Verdict,
};
use guardrail_normalizer::{normalize, parse_foreign_document};
use guardrail_testgen::{compile, CompileOptions, TargetLanguage};

/// Where decision entries go for the lifetime of one command.
pub struct DecisionSink {
    writer: Option<DecisionWriter>,
}

impl DecisionSink {
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let writer = path
            .map(|p| {
                DecisionWriter::open(p)
                    .with_context(|| format!("failed to open decision log {}", p.display()))
            })
            .transpose()?;
        Ok(Self { writer })
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self { writer: None }
    }

    /// Append `entry`. Once a log is configured, losing an entry fails the
    /// command.
    fn record(&mut self, entry: DecisionEntry) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.write(&entry).with_context(|| {
                format!(
                    "failed to record {:?} in decision log {}",
                    entry.event_type,
                    writer.path().display()
                )
            })?;
        }
        Ok(())
    }
}

fn verdict_record(request: &ActionRequest, verdict: &Verdict) -> VerdictRecord {
    VerdictRecord {
        tool: request.tool.clone(),
        allowed: verdict.allowed,
        policy_id: verdict.policy_id.clone(),
        reason: verdict.reason.to_string(),
    }
}

fn source(component: &str, path: &Path) -> DecisionSource {
    DecisionSource::new(component).with_policy_file(path.display().to_string())
}

fn load(component: &str, path: &Path, sink: &mut DecisionSink) -> Result<PolicySet> {
    let set = load_policy_set(path)?;
    info!(
        policy_file = %path.display(),
        policies = set.len(),
        "policy set loaded"
    );
    sink.record(DecisionEntry::new(
        DecisionEventType::PolicySetLoaded,
        source(component, path),
        serde_json::json!({
            "project": set.project(),
            "policies": set.policies().iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        }),
    ))?;
    Ok(set)
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn validate(file: &Path, sink: &mut DecisionSink, out: &mut dyn Write) -> Result<()> {
    load("validate", file, sink)?;
    writeln!(out, "OK validate")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

pub fn import(
    input: &Path,
    project: &str,
    dest: Option<&Path>,
    out: &mut dyn Write,
) -> Result<()> {
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read foreign policy file: {}", input.display()))?;
    let records = parse_foreign_document(&json)
        .with_context(|| format!("invalid foreign policy file: {}", input.display()))?;
    let set = normalize(&records, project)
        .with_context(|| format!("failed to normalize {}", input.display()))?;
    let yaml = to_yaml(&set)?;

    match dest {
        Some(path) => {
            write_file(path, &yaml)?;
            info!(
                input = %input.display(),
                out = %path.display(),
                policies = set.len(),
                "foreign policies imported"
            );
            writeln!(out, "wrote {}", path.display())?;
        }
        None => out.write_all(yaml.as_bytes())?,
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

pub fn generate(
    policies: &Path,
    target: TargetLanguage,
    out_dir: &Path,
    options: &CompileOptions,
    sink: &mut DecisionSink,
    out: &mut dyn Write,
) -> Result<Vec<PathBuf>> {
    let set = load("generate", policies, sink)?;
    let artifact = compile(&set, target, options)
        .with_context(|| format!("failed to compile {} for {target}", policies.display()))?;

    let mut written = Vec::new();
    for file in artifact.files() {
        let path = out_dir.join(&file.path);
        write_file(&path, &file.contents)?;
        writeln!(out, "wrote {}", path.display())?;
        written.push(path);
    }
    info!(
        target = %target,
        out_dir = %out_dir.display(),
        files = written.len(),
        "test suite generated"
    );
    Ok(written)
}

// ---------------------------------------------------------------------------
// evaluate / probe
// ---------------------------------------------------------------------------

pub fn evaluate_request(
    policies: &Path,
    request: Option<&Path>,
    sink: &mut DecisionSink,
    stdin: &mut dyn Read,
    out: &mut dyn Write,
) -> Result<Verdict> {
    let engine = PolicyEngine::new(load("evaluate", policies, sink)?);

    let json = match request {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request file: {}", path.display()))?,
        None => read_all(stdin)?,
    };
    let request: ActionRequest =
        serde_json::from_str(&json).context("invalid action request JSON")?;

    let trace = engine.evaluate_traced(&request);
    info!(
        tool = %request.tool,
        allowed = trace.verdict.allowed,
        reason = %trace.verdict.reason,
        "verdict issued"
    );
    sink.record(
        DecisionEntry::new(
            DecisionEventType::VerdictIssued,
            source("evaluate", policies),
            serde_json::json!({ "consulted": trace.consulted }),
        )
        .with_verdict(verdict_record(&request, &trace.verdict)),
    )?;

    serde_json::to_writer_pretty(&mut *out, &trace.verdict)?;
    writeln!(out)?;
    Ok(trace.verdict)
}

#[derive(Debug, Deserialize)]
struct ProbeInput {
    policy: Policy,
    input: ActionRequest,
}

/// Single-policy evaluation used by generated Jest and pytest suites.
pub fn probe(stdin: &mut dyn Read, out: &mut dyn Write) -> Result<Verdict> {
    let json = read_all(stdin)?;
    let probe: ProbeInput = serde_json::from_str(&json).context("invalid probe input JSON")?;
    // Validate through the same constructor as a loaded document.
    PolicySet::new(None, vec![probe.policy.clone()]).context("invalid probe policy")?;

    let verdict = evaluate(&probe.policy, &probe.input);
    debug!(policy_id = %probe.policy.id, tool = %probe.input.tool, ?verdict, "probe");

    serde_json::to_writer(&mut *out, &verdict)?;
    writeln!(out)?;
    Ok(verdict)
}

// ---------------------------------------------------------------------------
// conformance (`test` subcommand)
// ---------------------------------------------------------------------------

pub fn conformance(policies: &Path, sink: &mut DecisionSink, out: &mut dyn Write) -> Result<()> {
    let set = load("test", policies, sink)?;
    let report = run_conformance(&set);

    for case in &report.cases {
        match &case.outcome {
            CaseOutcome::Passed => writeln!(out, "PASS {} / {}", case.policy_id, case.test)?,
            CaseOutcome::Failed { mismatch } => {
                writeln!(out, "FAIL {} / {}: {mismatch}", case.policy_id, case.test)?
            }
            CaseOutcome::Skipped => writeln!(out, "SKIP {} / {}", case.policy_id, case.test)?,
        }
    }
    writeln!(
        out,
        "{} passed, {} failed, {} skipped",
        report.passed(),
        report.failed(),
        report.skipped()
    )?;

    info!(
        passed = report.passed(),
        failed = report.failed(),
        skipped = report.skipped(),
        "conformance run finished"
    );
    sink.record(DecisionEntry::new(
        DecisionEventType::ConformanceRun,
        source("test", policies),
        serde_json::to_value(&report)?,
    ))?;

    if !report.is_success() {
        bail!(
            "{} conformance test(s) failed in {}",
            report.failed(),
            policies.display()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_all(stdin: &mut dyn Read) -> Result<String> {
    let mut buf = String::new();
    stdin
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
