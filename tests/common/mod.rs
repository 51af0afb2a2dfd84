#![allow(dead_code)]

use std::path::{Path, PathBuf};

use clap::Parser;
use covshim::config::{Args, Config};
use tempfile::TempDir;

/// A scratch project with two sources under `src/` and a Cobertura report
/// that refers to them, and to one system header, by absolute path.
pub struct Project {
    pub dir: TempDir,
    pub report: PathBuf,
}

impl Project {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Config for `covshim --root <project> --filter test <extra..> <report>`.
    pub fn config(&self, extra: &[&str], job_id: Option<&str>) -> covshim::error::Result<Config> {
        let mut argv = vec![
            "covshim".to_string(),
            "--root".to_string(),
            self.path().display().to_string(),
            "--filter".to_string(),
            "test".to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        argv.push(self.report.display().to_string());
        Config::from_args(Args::try_parse_from(argv).unwrap(), job_id.map(String::from))
    }
}

pub const FOO_SOURCE: &str = "int a = 1;\n\nint b = 2;\n";

pub fn setup_project() -> Project {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src/test_foo.cc"), FOO_SOURCE).unwrap();
    std::fs::write(root.join("src/bar.cc"), "int c;\n").unwrap();

    let report = root.join("coverage.xml");
    std::fs::write(&report, report_xml(root)).unwrap();
    Project { dir, report }
}

fn report_xml(root: &Path) -> String {
    let root = root.display();
    format!(
        r#"<?xml version="1.0" ?>
<coverage line-rate="0.5" version="gcovr 3.2">
  <packages>
    <package name="src">
      <classes>
        <class filename="{root}/src/test_foo.cc" line-rate="0.5" name="test_foo_cc">
          <lines>
            <line hits="5" number="1"/>
            <line hits="0" number="3"/>
          </lines>
        </class>
      </classes>
    </package>
    <package name="lib">
      <classes>
        <class filename="{root}/src/bar.cc" line-rate="1.0" name="bar_cc">
          <lines>
            <line hits="1" number="1"/>
          </lines>
        </class>
      </classes>
    </package>
    <package name="sys">
      <classes>
        <class filename="/usr/include/test_stdio.h" line-rate="0.0" name="test_stdio_h">
          <lines>
            <line hits="0" number="12"/>
          </lines>
        </class>
      </classes>
    </package>
  </packages>
</coverage>
"#
    )
}
