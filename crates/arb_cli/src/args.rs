// crates/arb_cli/src/args.rs
//
// Deterministic, offline CLI argument parsing & validation for a scenario run.

use clap::Parser;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Parser)]
#[command(name = "arb", about = "Run a resource-arbitration scenario")]
pub struct Args {
    /// Path to the scenario JSON file.
    #[arg(long)]
    pub scenario: PathBuf,

    /// Output directory for the CSV history and JSON summary.
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Override the scenario's own round count.
    #[arg(long)]
    pub rounds: Option<u64>,

    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug)]
pub enum CliError {
    NotFound(String),
    NonLocalPath(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NotFound(p) => write!(f, "file not found: {p}"),
            CliError::NonLocalPath(p) => write!(f, "path must be a local file (no scheme): {p}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Parse and validate CLI arguments, rejecting non-local scenario paths and
/// missing files before any I/O is attempted.
pub fn parse_and_validate() -> Result<Args, CliError> {
    let args = Args::parse();
    ensure_local_exists(&args.scenario)?;
    Ok(args)
}

fn ensure_local_exists(p: &Path) -> Result<(), CliError> {
    let s = p.to_string_lossy().to_string();
    if s.contains("://") {
        return Err(CliError::NonLocalPath(s));
    }
    let meta = fs::metadata(p).map_err(|_| CliError::NotFound(s.clone()))?;
    if !meta.is_file() {
        return Err(CliError::NotFound(s));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_url_schemed_paths() {
        let err = ensure_local_exists(Path::new("https://example.com/scenario.json"));
        assert!(matches!(err, Err(CliError::NonLocalPath(_))));
    }

    #[test]
    fn rejects_missing_files() {
        let err = ensure_local_exists(Path::new("does/not/exist.json"));
        assert!(matches!(err, Err(CliError::NotFound(_))));
    }
}
