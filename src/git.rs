//! Commit metadata for the Coveralls payload, read by running `git`.

use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, ShimError};

/// A `git remote -v` line for the fetch side of a remote.
static FETCH_REMOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+(\S+)\s+\(fetch\)").unwrap());

const LOG_FORMAT: &str = "--pretty=format:%H%n%aN%n%ae%n%cN%n%ce%n%s";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Head {
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    pub committer_name: String,
    pub committer_email: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remote {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitInfo {
    pub head: Head,
    pub branch: String,
    pub remotes: Vec<Remote>,
}

/// Describe the checkout at `dir`: HEAD commit, current branch and remotes.
pub fn read_repo(dir: &Path) -> Result<GitInfo> {
    let log = git(dir, &["--no-pager", "log", "-1", LOG_FORMAT])?;
    let branch = git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let remotes = git(dir, &["remote", "-v"])?;

    let info = GitInfo {
        head: parse_head(&log)?,
        branch: branch.trim().to_string(),
        remotes: parse_remotes(&remotes),
    };
    debug!(commit = %info.head.id, branch = %info.branch, "read git metadata");
    Ok(info)
}

fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| ShimError::Git(format!("failed to run git in {}: {e}", dir.display())))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ShimError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    String::from_utf8(output.stdout)
        .map_err(|_| ShimError::Git(format!("git {} output not valid UTF-8", args.join(" "))))
}

/// Parse the output of `git log -1` with [`LOG_FORMAT`].
pub fn parse_head(log: &str) -> Result<Head> {
    let fields: Vec<&str> = log.lines().collect();
    // An empty subject leaves no sixth line.
    if fields.len() < 5 {
        return Err(ShimError::Git(format!(
            "unexpected git log output: {log:?}"
        )));
    }
    let field = |i: usize| fields.get(i).copied().unwrap_or_default().to_string();
    Ok(Head {
        id: field(0),
        author_name: field(1),
        author_email: field(2),
        committer_name: field(3),
        committer_email: field(4),
        message: field(5),
    })
}

/// Remotes from `git remote -v`, one per `(fetch)` line.
pub fn parse_remotes(output: &str) -> Vec<Remote> {
    output
        .lines()
        .filter_map(|line| FETCH_REMOTE_RE.captures(line))
        .map(|caps| Remote {
            name: caps[1].to_string(),
            url: caps[2].to_string(),
        })
        .collect()
}
