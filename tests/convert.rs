mod common;

use covshim::cli;
use covshim::error::ShimError;
use serde_json::{json, Value};

#[test]
fn summary_lists_matching_files() {
    let project = common::setup_project();
    let config = project.config(&["--type", "summary"], None).unwrap();

    let out = cli::render(&config).unwrap();
    assert_eq!(out, "src/test_foo.cc\t0.5");
}

#[test]
fn coveralls_json_payload() {
    let project = common::setup_project();
    let config = project
        .config(
            &["--type", "coveralls_json", "--coveralls-repo-token", "abc"],
            None,
        )
        .unwrap();

    let out = cli::render(&config).unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(
        value,
        json!({
            "source_files": [{
                "name": "src/test_foo.cc",
                "coverage": [5, null, 0],
                "source": common::FOO_SOURCE,
            }],
            "service_name": "cobertura2coveralls",
            "repo_token": "abc",
        })
    );
}

#[test]
fn coveralls_json_with_job_id() {
    let project = common::setup_project();
    let config = project
        .config(&["--type", "coveralls_json"], Some("9876"))
        .unwrap();

    let value: Value = serde_json::from_str(&cli::render(&config).unwrap()).unwrap();
    assert_eq!(value["service_name"], "travis-ci");
    assert_eq!(value["service_job_id"], "9876");
}

#[test]
fn cobertura_output_drops_foreign_packages() {
    let project = common::setup_project();
    let config = project.config(&["--type", "cobertura"], None).unwrap();

    let out = cli::render(&config).unwrap();
    assert!(out.starts_with("<?xml"));
    assert!(out.contains(r#"filename="src/test_foo.cc""#));
    assert!(out.contains(r#"<package name="src">"#));
    assert!(!out.contains("bar.cc"));
    assert!(!out.contains("test_stdio.h"));
    assert!(!out.contains(&project.path().display().to_string()));
}

#[test]
fn cobertura_output_is_valid_input_again() {
    let project = common::setup_project();
    let config = project.config(&["--type", "cobertura"], None).unwrap();
    let out = cli::render(&config).unwrap();

    let doc = covshim::rewrite::Document::parse(out.as_bytes()).unwrap();
    assert_eq!(doc.descendants("class").len(), 1);
}

#[test]
fn missing_source_file_fails_the_run() {
    let project = common::setup_project();
    std::fs::remove_file(project.path().join("src/test_foo.cc")).unwrap();
    let config = project.config(&["--type", "coveralls_json"], None).unwrap();

    let err = cli::render(&config).unwrap_err();
    assert!(matches!(err, ShimError::SourceFile { .. }), "unexpected error: {err}");
}

#[test]
fn missing_input_fails_the_run() {
    let project = common::setup_project();
    std::fs::remove_file(&project.report).unwrap();

    for mode in ["summary", "cobertura", "coveralls_json"] {
        let config = project.config(&["--type", mode], None).unwrap();
        assert!(matches!(cli::render(&config), Err(ShimError::Io(_))));
    }
}

#[test]
fn upload_without_credential_is_rejected_before_reading() {
    let project = common::setup_project();
    std::fs::remove_file(&project.report).unwrap();

    let err = project.config(&["--type", "coveralls"], None).unwrap_err();
    assert!(matches!(err, ShimError::Config(_)));
}

#[test]
fn unreadable_git_dir_fails_the_run() {
    let project = common::setup_project();
    let missing = project.path().join("no-such-checkout");
    let config = project
        .config(
            &["--type", "coveralls_json", "--git", missing.to_str().unwrap()],
            None,
        )
        .unwrap();

    assert!(matches!(cli::render(&config), Err(ShimError::Git(_))));
}

#[test]
fn write_output_to_file() {
    let project = common::setup_project();
    let config = project.config(&["--type", "summary"], None).unwrap();
    let dest = project.path().join("summary.txt");

    let body = cli::render(&config).unwrap();
    cli::write_output(Some(&dest), &body).unwrap();

    let written = std::fs::read_to_string(&dest).unwrap();
    assert_eq!(written, "src/test_foo.cc\t0.5\n");
}
