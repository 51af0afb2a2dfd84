//! Output-mode handlers for the covshim CLI.
//!
//! Each `cmd_*` function reads the input report itself and returns the full
//! output body as a `String`; nothing is written until [`write_output`].

use std::io::Write;
use std::path::Path;

use crate::config::{Config, OutputType};
use crate::error::Result;
use crate::format::{self, Payload};
use crate::rewrite::{self, Document};
use crate::{git, parser, upload};

/// Produce the body for the configured output type.
pub fn render(config: &Config) -> Result<String> {
    match config.output_type {
        OutputType::Cobertura => cmd_cobertura(config),
        OutputType::CoverallsJson => cmd_coveralls_json(config),
        OutputType::Coveralls => cmd_coveralls(config),
        OutputType::Summary => cmd_summary(config),
    }
}

pub fn cmd_cobertura(config: &Config) -> Result<String> {
    let doc = Document::read(&config.input)?;
    rewrite::rewrite(&doc, &config.filter)?.to_xml()
}

pub fn cmd_coveralls_json(config: &Config) -> Result<String> {
    build_payload(config)?.to_json()
}

pub fn cmd_coveralls(config: &Config) -> Result<String> {
    let payload = build_payload(config)?.to_json()?;
    upload::upload(&config.endpoint, &payload)
}

pub fn cmd_summary(config: &Config) -> Result<String> {
    let files = parser::parse_file(&config.input, &config.filter)?;
    Ok(format::summary(&files))
}

/// Parse the report and attach source text and git metadata.
pub fn build_payload(config: &Config) -> Result<Payload> {
    let files = parser::parse_file(&config.input, &config.filter)?;
    let root = config.filter.root();
    let source_files =
        format::source_files(&files, &mut |name: &str| format::read_source(root, name))?;
    let git = config.git_dir.as_deref().map(git::read_repo).transpose()?;
    Ok(Payload::new(source_files, git, config.credential.as_ref()))
}

/// Write `body` and a trailing newline to `dest`, or to stdout.
pub fn write_output(dest: Option<&Path>, body: &str) -> Result<()> {
    let mut text = String::with_capacity(body.len() + 1);
    text.push_str(body);
    text.push('\n');

    match dest {
        Some(path) => std::fs::write(path, text)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
