//! Output bodies built from parsed coverage.

use std::path::Path;

use serde::Serialize;

use crate::config::Credential;
use crate::error::{Result, ShimError};
use crate::git::GitInfo;
use crate::model::CoverageFile;

/// `service_name` used when uploading with a repo token.
pub const TOKEN_SERVICE_NAME: &str = "cobertura2coveralls";
/// `service_name` used when uploading from a CI job.
pub const CI_SERVICE_NAME: &str = "travis-ci";

/// One entry of the Coveralls `source_files` array.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub name: String,
    /// Hits per line, `null` for lines without coverage data.
    pub coverage: Vec<Option<u64>>,
    pub source: String,
}

/// The Coveralls jobs API payload.
#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    pub source_files: Vec<SourceFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitInfo>,
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_job_id: Option<String>,
}

impl Payload {
    pub fn new(
        source_files: Vec<SourceFile>,
        git: Option<GitInfo>,
        credential: Option<&Credential>,
    ) -> Self {
        let (service_name, repo_token, service_job_id) = match credential {
            Some(Credential::RepoToken(token)) => (TOKEN_SERVICE_NAME, Some(token.clone()), None),
            Some(Credential::JobId(id)) => (CI_SERVICE_NAME, None, Some(id.clone())),
            None => (CI_SERVICE_NAME, None, None),
        };
        Self {
            source_files,
            git,
            service_name: service_name.to_string(),
            repo_token,
            service_job_id,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Pair every coverage record with its source text, fetched through `load`.
///
/// The first source that cannot be loaded aborts the whole conversion.
pub fn source_files(
    files: &[CoverageFile],
    load: &mut dyn FnMut(&str) -> Result<String>,
) -> Result<Vec<SourceFile>> {
    files
        .iter()
        .map(|file| {
            Ok(SourceFile {
                name: file.name().to_string(),
                coverage: file.dense(),
                source: load(file.name())?,
            })
        })
        .collect()
}

/// Read `name` relative to the project `root`.
pub fn read_source(root: &str, name: &str) -> Result<String> {
    let path = Path::new(root).join(name);
    std::fs::read_to_string(&path).map_err(|source| ShimError::SourceFile { path, source })
}

/// `name<TAB>line-rate`, one file per line, in report order.
#[must_use]
pub fn summary(files: &[CoverageFile]) -> String {
    files
        .iter()
        .map(|file| format!("{}\t{}", file.name(), file.line_rate()))
        .collect::<Vec<_>>()
        .join("\n")
}
