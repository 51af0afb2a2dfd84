//! Command-line arguments and the run configuration derived from them.

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::{Result, ShimError};
use crate::filter::PathFilter;
use crate::upload::DEFAULT_ENDPOINT;

/// Environment variable holding the CI job id.
pub const JOB_ID_VAR: &str = "TRAVIS_JOB_ID";

/// What to produce from the input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputType {
    /// Filtered Cobertura XML with project-relative filenames.
    Cobertura,
    /// The Coveralls JSON payload, printed instead of uploaded.
    #[value(name = "coveralls_json", alias = "coveralls-json")]
    CoverallsJson,
    /// Upload the Coveralls payload and print the service's response.
    Coveralls,
    /// One `name<TAB>line-rate` line per file.
    Summary,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Cobertura => "cobertura",
            OutputType::CoverallsJson => "coveralls_json",
            OutputType::Coveralls => "coveralls",
            OutputType::Summary => "summary",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// covshim — Cobertura coverage shim for Coveralls.
#[derive(Parser, Debug)]
#[command(name = "covshim", version, about)]
pub struct Args {
    /// Output type.
    #[arg(long = "type", value_enum)]
    pub output_type: OutputType,

    /// Cobertura XML coverage report.
    #[arg(value_name = "input.xml")]
    pub input: PathBuf,

    /// Root of interesting files (default: current directory).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Only keep files whose path below the root contains this text.
    #[arg(long)]
    pub filter: Option<String>,

    /// Output file (default: stdout).
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Coveralls repo token.
    #[arg(long, value_name = "token")]
    pub coveralls_repo_token: Option<String>,

    /// Git checkout to describe in the Coveralls payload.
    #[arg(long, value_name = "repo")]
    pub git: Option<PathBuf>,

    /// Coveralls jobs endpoint to upload to.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Log more (-v for progress, -vv for per-class decisions).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// How the upload identifies itself to Coveralls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    RepoToken(String),
    JobId(String),
}

impl Credential {
    /// A non-empty repo token wins over a non-empty job id.
    pub fn resolve(repo_token: Option<String>, job_id: Option<String>) -> Option<Self> {
        repo_token
            .filter(|token| !token.is_empty())
            .map(Credential::RepoToken)
            .or_else(|| {
                job_id
                    .filter(|id| !id.is_empty())
                    .map(Credential::JobId)
            })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output_type: OutputType,
    pub input: PathBuf,
    pub filter: PathFilter,
    pub output: Option<PathBuf>,
    pub credential: Option<Credential>,
    pub git_dir: Option<PathBuf>,
    pub endpoint: String,
}

impl Config {
    /// Validate `args` and resolve the root directory.
    ///
    /// `job_id` is the value of [`JOB_ID_VAR`], if set. Uploading without
    /// either a repo token or a job id is rejected here, before any file is
    /// touched.
    pub fn from_args(args: Args, job_id: Option<String>) -> Result<Self> {
        let credential = Credential::resolve(args.coveralls_repo_token, job_id);
        if args.output_type == OutputType::Coveralls && credential.is_none() {
            return Err(ShimError::Config(format!(
                "can't upload to coveralls without a coveralls-repo-token or {JOB_ID_VAR}"
            )));
        }

        let filter = PathFilter::for_root_dir(args.root.as_deref(), args.filter.unwrap_or_default())?;

        Ok(Self {
            output_type: args.output_type,
            input: args.input,
            filter,
            output: args.output,
            credential,
            git_dir: args.git,
            endpoint: args.endpoint,
        })
    }
}
