// crates/ea_cli/src/main.rs
//
// Entry point: exit codes, error mapping, and the three modes
// (validate-only, audit, run). A run commits to a `JsonDirStore` rooted at
// --out and then renders the requested reports next to it.

mod args;

mod exitcodes {
    pub const OK: i32 = 0;
    /// Malformed, missing or empty inputs; bad flags.
    pub const VALIDATION: i32 = 2;
    /// Stored results fail re-verification.
    pub const SELF_VERIFY: i32 = 3;
    /// Read/write/path failures, including a failed commit.
    pub const IO: i32 = 4;
    /// Allocation invariant broken mid-run.
    pub const ENGINE: i32 = 5;
}

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use args::{parse_and_validate as parse_cli, Args};
use ea_io::loader::{self, InputPaths, LoadedContext};
use ea_pipeline::{
    audit_outputs, run_and_commit, validate_ctx, EngineMeta, JsonDirStore, PipelineCtx, PipelineError, RunOutputs,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// CLI-side error buckets; each maps to one exit code.
#[derive(Debug)]
enum MainError {
    Validation(String),
    SelfVerify(String),
    Io(String),
    Engine(String),
    Render(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainError::Validation(m) => write!(f, "validation: {m}"),
            MainError::SelfVerify(m) => write!(f, "audit: {m}"),
            MainError::Io(m) => write!(f, "io: {m}"),
            MainError::Engine(m) => write!(f, "engine: {m}"),
            MainError::Render(m) => write!(f, "render: {m}"),
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("ea: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION as u8);
        }
    };
    init_tracing(args.quiet);

    let res = if args.validate_only {
        validate_only(&args)
    } else if args.audit {
        audit_store(&args)
    } else {
        run_once(&args)
    };

    let rc = match res {
        Ok(()) => exitcodes::OK,
        Err(e) => {
            eprintln!("ea: error: {e}");
            map_error(&e)
        }
    };
    ExitCode::from(rc as u8)
}

/// `RUST_LOG` wins; otherwise `info`, or `warn` under --quiet. Logs go to stderr.
fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn map_error(e: &MainError) -> i32 {
    use exitcodes::*;
    match e {
        MainError::Validation(_) => VALIDATION,
        MainError::SelfVerify(_) => SELF_VERIFY,
        MainError::Io(_) | MainError::Render(_) => IO,
        MainError::Engine(_) => ENGINE,
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    use PipelineError::*;
    match e {
        InputEmpty => MainError::Validation(e.to_string()),
        MalformedRecord(m) | Manifest(m) => MainError::Validation(m),
        Audit(m) => MainError::SelfVerify(m),
        PersistenceFailure(m) | Io(m) => MainError::Io(m),
        Allocate(m) | Build(m) => MainError::Engine(m),
    }
}

fn load_inputs(args: &Args) -> Result<LoadedContext, MainError> {
    let loaded = match &args.manifest {
        Some(manifest) => loader::load_all_from_manifest(manifest),
        None => {
            let paths = match (&args.students, &args.courses, &args.selections) {
                (Some(students), Some(courses), Some(selections)) => InputPaths {
                    students: students.clone(),
                    courses: courses.clone(),
                    selections: selections.clone(),
                    params: args.params.clone(),
                },
                _ => return Err(MainError::Validation("input paths missing".into())),
            };
            loader::load_all(&paths)
        }
    };
    loaded.map_err(|e| map_pipeline_err(e.into()))
}

fn build_ctx(args: &Args) -> Result<PipelineCtx, MainError> {
    let mut inputs = load_inputs(args)?;
    if let Some(seed) = args.seed {
        inputs.params.tie_seed = Some(seed);
    }
    let executed_utc = match &args.timestamp {
        Some(ts) => ea_io::hasher::normalize_rfc3339_utc_seconds(ts)
            .map_err(|e| MainError::Validation(format!("--timestamp: {e}")))?,
        None => chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    };
    Ok(PipelineCtx {
        inputs,
        engine_meta: EngineMeta::from_build_env(),
        executed_utc,
    })
}

/// Load and validate; nothing is allocated or written.
fn validate_only(args: &Args) -> Result<(), MainError> {
    let ctx = build_ctx(args)?;
    let report = validate_ctx(&ctx);
    for w in report.warnings() {
        warn!(code = w.code, "{}", w.message);
    }
    for e in report.errors() {
        error!(code = e.code, "{}", e.message);
    }
    if !report.pass {
        let n = report.errors().count();
        return Err(MainError::Validation(format!("{n} error(s) in inputs")));
    }
    if !args.quiet {
        println!(
            "validate-only: inputs OK ({} students, {} courses, {} selections)",
            ctx.inputs.students.len(),
            ctx.inputs.courses.len(),
            ctx.inputs.selections.len()
        );
    }
    Ok(())
}

/// Re-verify the latest committed run under --out.
fn audit_store(args: &Args) -> Result<(), MainError> {
    let store = JsonDirStore::new(&args.out);
    let outputs = store
        .load_latest()
        .map_err(|e| map_pipeline_err(e.into()))?
        .ok_or_else(|| MainError::Io(format!("no committed run under {}", args.out.display())))?;
    let summary = audit_outputs(&outputs).map_err(map_pipeline_err)?;
    info!(run = %outputs.run_record.id, lotteries = summary.lotteries, "audit passed");
    if !args.quiet {
        println!(
            "audit: OK {} ({} lotteries, {} candidates, {} winners, {} losers)",
            outputs.run_record.id, summary.lotteries, summary.candidates, summary.winners, summary.losers
        );
    }
    Ok(())
}

fn run_once(args: &Args) -> Result<(), MainError> {
    let ctx = build_ctx(args)?;

    fs::create_dir_all(&args.out).map_err(|e| MainError::Io(format!("mkdir {}: {e}", args.out.display())))?;
    let mut store = JsonDirStore::new(&args.out);
    let outs = run_and_commit(&ctx, &mut store).map_err(map_pipeline_err)?;

    maybe_render_reports(args, &outs)?;

    if !args.quiet {
        let s = &outs.run_record.summary;
        println!("run: {} committed to {}", outs.run_record.id, args.out.display());
        println!(
            "run: {} assignments, {} lotteries; {} fully assigned, {} partially, {} unassigned",
            s.assignments, s.lotteries, s.fully_assigned, s.partially_assigned, s.unassigned
        );
    }
    Ok(())
}

fn maybe_render_reports(args: &Args, outs: &RunOutputs) -> Result<(), MainError> {
    if args.render.is_empty() {
        return Ok(());
    }
    let model = ea_report::build_model(outs, args.sample);
    for fmt in &args.render {
        match fmt.as_str() {
            "json" => render_json_report(&model, &args.out)?,
            "html" => render_html_report(&model, &args.out)?,
            other => return Err(MainError::Render(format!("unknown renderer: {other}"))),
        }
    }
    Ok(())
}

#[allow(unused_variables)]
fn render_json_report(model: &ea_report::ReportModel, out_dir: &Path) -> Result<(), MainError> {
    #[cfg(feature = "report-json")]
    {
        let text = ea_report::render_json(model).map_err(|e| MainError::Render(e.to_string()))?;
        write_report(&out_dir.join("report.json"), &text)
    }
    #[cfg(not(feature = "report-json"))]
    {
        Err(MainError::Render("json renderer not enabled (build with feature `report-json`)".into()))
    }
}

#[allow(unused_variables)]
fn render_html_report(model: &ea_report::ReportModel, out_dir: &Path) -> Result<(), MainError> {
    #[cfg(feature = "report-html")]
    {
        let text = ea_report::render_html(model).map_err(|e| MainError::Render(e.to_string()))?;
        write_report(&out_dir.join("report.html"), &text)
    }
    #[cfg(not(feature = "report-html"))]
    {
        Err(MainError::Render("html renderer not enabled (build with feature `report-html`)".into()))
    }
}

#[cfg(any(feature = "report-json", feature = "report-html"))]
fn write_report(path: &Path, text: &str) -> Result<(), MainError> {
    ea_io::canonical_json::write_atomic(path, text.as_bytes())
        .map_err(|e| MainError::Io(format!("write {}: {e}", path.display())))
}
