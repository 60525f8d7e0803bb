//! Aggregation of per-test outcomes into one statistics file.
//!
//! The harness leaves `<test>.result` (containing `PASS` when the test's output was
//! accepted) and `<test>.rsc` (see [`crate::report`]) next to each other. Failing tests
//! are appended to the statistics file; passing tests add nothing to it.

use std::{
    ffi::OsString,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{report::SectionVerdicts, Error};

/// Extension of the harness' per-test result file
pub const RESULT_EXTENSION: &str = "result";

/// What the statistics file learned about one test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    /// The test, as given
    pub test: String,
    /// Whether the result file says `PASS`
    pub run_passed: bool,
    /// Resource kinds whose report section does not pass
    pub leaking: Vec<String>,
}

impl TestOutcome {
    /// Build the outcome from the contents of the result and resource report files
    pub fn from_reports(test: &str, result: &str, rsc: &str) -> Result<Self, Error> {
        let sections = SectionVerdicts::parse(rsc)?;
        Ok(Self {
            test: test.to_string(),
            run_passed: result.contains("PASS"),
            leaking: sections.leaking().map(str::to_string).collect(),
        })
    }

    /// The test ran correctly and leaked nothing
    #[must_use]
    pub fn passed(&self) -> bool {
        self.run_passed && self.leaking.is_empty()
    }

    /// The lines this outcome contributes to the statistics file
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.run_passed {
            out.push_str(&format!("Running {} failed.\n", self.test));
        }
        for kind in &self.leaking {
            out.push_str(&format!("Memory leaks: struct {kind}\n"));
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

fn sibling(test: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(test.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Read `<test>.result` and `<test>.rsc` and append any failure to `stat`
pub fn record_test<P, Q>(test: P, stat: Q) -> Result<TestOutcome, Error>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let test = test.as_ref();
    let result = fs::read_to_string(sibling(test, RESULT_EXTENSION))?;
    let rsc = fs::read_to_string(sibling(test, crate::report::RSC_EXTENSION))?;
    let outcome = TestOutcome::from_reports(&test.to_string_lossy(), &result, &rsc)?;

    if outcome.passed() {
        log::debug!("{} passed", outcome.test);
    } else {
        log::info!("{} failed, recording in {}", outcome.test, stat.as_ref().display());
    }
    let mut file = OpenOptions::new().create(true).append(true).open(stat)?;
    file.write_all(outcome.render().as_bytes())?;
    Ok(outcome)
}
