// crates/ea_cli/src/args.rs
//
// Offline CLI argument surface.
// - Inputs: --manifest  XOR  (--students + --courses + --selections [+ --params])
// - Modes: default run, --validate-only, --audit (re-checks what --out holds)
// - Paths carrying a URL scheme are rejected
// - Seed override: decimal u64 or 0x-hex (1..=16 nybbles)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

/// Parsed CLI arguments (raw).
#[derive(Debug, Parser, Clone)]
#[command(
    name = "ea",
    version,
    disable_help_subcommand = true,
    about = "Offline elective allocation engine: priority pass, preference waves with audited lotteries, fallback"
)]
pub struct Args {
    /// Manifest JSON naming the input files (exclusive with explicit input flags).
    #[arg(long, conflicts_with_all = ["students", "courses", "selections", "params"])]
    pub manifest: Option<PathBuf>,

    /// Students JSON (array of {id, level, protected?}).
    #[arg(long)]
    pub students: Option<PathBuf>,
    /// Courses JSON (array of {id, name?, track, capacity}).
    #[arg(long)]
    pub courses: Option<PathBuf>,
    /// Selections JSON (array of {student_id, course_id, rank}).
    #[arg(long)]
    pub selections: Option<PathBuf>,
    /// Engine params JSON (optional; defaults apply).
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Store directory: committed runs are written here and audited from here.
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
    /// Report format(s) to write next to the results.
    #[arg(long, value_parser = ["json", "html"], num_args = 0..=2)]
    pub render: Vec<String>,
    /// Students listed in the report's per-student sample.
    #[arg(long, default_value_t = 10)]
    pub sample: usize,

    /// Tie seed override. Decimal u64 or 0x-hex.
    #[arg(long, value_parser = parse_seed)]
    pub seed: Option<u64>,
    /// Run timestamp (RFC3339 UTC). Defaults to now.
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Load and validate inputs; do not allocate or write anything.
    #[arg(long, conflicts_with = "audit")]
    pub validate_only: bool,
    /// Re-verify the latest committed run in --out against its lottery log and ids.
    #[arg(long, conflicts_with_all = ["manifest", "students", "courses", "selections", "params", "seed", "render"])]
    pub audit: bool,

    /// Only warnings and errors on stderr.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug)]
pub enum CliError {
    Missing(&'static str),
    NonLocalPath(String),
    NotFound(String),
    BadTimestamp(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CliError::*;
        match self {
            Missing(s) => write!(f, "missing required flag: {s}"),
            NonLocalPath(p) => write!(f, "path must be local (no scheme): {p}"),
            NotFound(p) => write!(f, "file not found: {p}"),
            BadTimestamp(s) => write!(f, "invalid --timestamp: {s}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Decimal u64 or 0x-hex (1..=16 nybbles).
pub fn parse_seed(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty seed".into());
    }
    if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if rest.is_empty() || rest.len() > 16 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("hex seed must be 1..16 hex digits".into());
        }
        u64::from_str_radix(rest, 16).map_err(|_| "hex seed out of range".into())
    } else {
        s.parse::<u64>().map_err(|_| "decimal seed must be a valid u64".into())
    }
}

pub fn parse_and_validate() -> Result<Args, CliError> {
    validate(Args::parse())
}

/// Mode checks, existence checks and path normalization.
pub fn validate(mut args: Args) -> Result<Args, CliError> {
    for p in [
        args.manifest.as_deref(),
        args.students.as_deref(),
        args.courses.as_deref(),
        args.selections.as_deref(),
        args.params.as_deref(),
        Some(args.out.as_path()),
    ]
    .into_iter()
    .flatten()
    {
        ensure_local_path(p)?;
    }

    if let Some(ts) = &args.timestamp {
        ea_io::hasher::normalize_rfc3339_utc_seconds(ts).map_err(|_| CliError::BadTimestamp(ts.clone()))?;
    }

    if !args.audit {
        if let Some(m) = &args.manifest {
            ensure_local_exists(m, "--manifest")?;
            args.manifest = Some(normalize_path(m));
        } else {
            let students = args.students.as_ref().ok_or(CliError::Missing("--students (or --manifest)"))?;
            let courses = args.courses.as_ref().ok_or(CliError::Missing("--courses (or --manifest)"))?;
            let selections = args.selections.as_ref().ok_or(CliError::Missing("--selections (or --manifest)"))?;
            ensure_local_exists(students, "--students")?;
            ensure_local_exists(courses, "--courses")?;
            ensure_local_exists(selections, "--selections")?;
            if let Some(p) = &args.params {
                ensure_local_exists(p, "--params")?;
            }
            args.students = args.students.take().map(|p| normalize_path(&p));
            args.courses = args.courses.take().map(|p| normalize_path(&p));
            args.selections = args.selections.take().map(|p| normalize_path(&p));
            args.params = args.params.take().map(|p| normalize_path(&p));
        }
    }

    args.out = normalize_path(&args.out);
    Ok(args)
}

fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    match p.to_str() {
        Some(s) if ea_io::looks_like_url(s) || s.trim().to_ascii_lowercase().starts_with("file:") => {
            Err(CliError::NonLocalPath(s.to_string()))
        }
        _ => Ok(()),
    }
}

fn ensure_local_exists(p: &Path, label: &'static str) -> Result<(), CliError> {
    let meta = fs::metadata(p).map_err(|_| CliError::NotFound(format!("{label} {}", p.display())))?;
    if !meta.is_file() {
        return Err(CliError::NotFound(format!("{label} {}", p.display())));
    }
    Ok(())
}

/// Absolute path; falls back to CWD-relative when the path does not exist yet.
fn normalize_path(p: &Path) -> PathBuf {
    fs::canonicalize(p).unwrap_or_else(|_| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(p)
        }
    })
}
