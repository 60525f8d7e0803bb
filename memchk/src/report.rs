//! Per-file leak reports and their text formats.
//!
//! A resource report (`.rsc`) has one section per resource kind, separated by an empty
//! line:
//!
//! ```text
//! FAIL
//! struct frame
//!     malloc: total=2
//!     free  : total=1
//!     remain: total=1
//! 0xc0104000
//! ```

use std::{
    ffi::OsString,
    fmt,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    checker::{LeakCheck, LeakChecker, Verdict},
    Error,
};

/// Extension of a resource report, replacing the log's own extension
pub const RSC_EXTENSION: &str = "rsc";
/// Suffix appended to a log's name for the legacy report
pub const MEMCHK_SUFFIX: &str = "-memchk";

/// The result of checking one resource kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReport {
    /// Name of the resource kind
    pub kind: String,
    /// Tokens and leak set
    pub check: LeakCheck,
}

impl ResourceReport {
    /// Verdict of this kind alone
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        self.check.verdict()
    }

    fn fmt_legacy(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let check = &self.check;
        let prefix = self.kind.chars().next().unwrap_or('?');
        writeln!(f, "{prefix}: malloc: total={}", check.alloc_total())?;
        writeln!(f, "{prefix}: free  : total={}", check.free_total())?;
        writeln!(f, "{prefix}: remain: total={}", check.remain_total())?;
        for token in &check.leaked {
            writeln!(f, "{token}")?;
        }
        Ok(())
    }
}

/// One `.rsc` section
impl fmt::Display for ResourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let check = &self.check;
        writeln!(f, "{}", self.verdict())?;
        writeln!(f, "struct {}", self.kind)?;
        writeln!(f, "    malloc: total={}", check.alloc_total())?;
        writeln!(f, "    free  : total={}", check.free_total())?;
        writeln!(f, "    remain: total={}", check.remain_total())?;
        for token in &check.leaked {
            writeln!(f, "{token}")?;
        }
        Ok(())
    }
}

/// The leak report of one log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// One report per resource kind, in configuration order
    pub resources: Vec<ResourceReport>,
}

/// Check every resource kind of `checker` against `lines`
#[must_use]
pub fn run_resource_check<S>(lines: &[S], checker: &LeakChecker) -> FileReport
where
    S: AsRef<str>,
{
    let resources = checker
        .kinds()
        .iter()
        .zip(checker.scan(lines))
        .map(|(kind, check)| {
            log::info!(
                "struct {}: {} (malloc={}, free={}, remain={})",
                kind.name(),
                check.verdict(),
                check.alloc_total(),
                check.free_total(),
                check.remain_total()
            );
            ResourceReport {
                kind: kind.name().to_string(),
                check,
            }
        })
        .collect();
    FileReport { resources }
}

impl FileReport {
    /// Read the log at `path` and check it.
    ///
    /// Bytes that are not valid UTF-8 are replaced; they cannot be part of a matching line.
    pub fn from_log<P>(path: P, checker: &LeakChecker) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        log::debug!("Checking {}", path.display());
        let bytes = fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = text.lines().collect();
        Ok(run_resource_check(&lines, checker))
    }

    /// PASS iff every resource kind passes
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        Verdict::all(self.resources.iter().map(ResourceReport::verdict))
    }

    /// The legacy `-memchk` format: counts prefixed with the kind's initial
    #[must_use]
    pub fn legacy(&self) -> LegacyReport<'_> {
        LegacyReport(self)
    }

    /// One line such as `struct frame:pass, struct page:fail`
    #[must_use]
    pub fn summary(&self) -> String {
        self.resources
            .iter()
            .map(|r| format!("struct {}:{}", r.kind, r.verdict().as_lower()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Write the `.rsc` report to `path`, replacing any previous content
    pub fn write<P>(&self, path: P) -> Result<(), Error>
    where
        P: AsRef<Path>,
    {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    /// Append the legacy report to `path`, creating it if needed
    pub fn append_legacy<P>(&self, path: P) -> Result<(), Error>
    where
        P: AsRef<Path>,
    {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        write!(file, "{}", self.legacy())?;
        Ok(())
    }
}

/// The `.rsc` format, sections separated by an empty line
impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, resource) in self.resources.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{resource}")?;
        }
        Ok(())
    }
}

/// Displays a [`FileReport`] in the legacy `-memchk` format
#[derive(Debug, Clone, Copy)]
pub struct LegacyReport<'a>(&'a FileReport);

impl fmt::Display for LegacyReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for resource in &self.0.resources {
            resource.fmt_legacy(f)?;
        }
        Ok(())
    }
}

/// `tests/vm/page-linear.output` becomes `tests/vm/page-linear.rsc`
#[must_use]
pub fn rsc_path(log: &Path) -> PathBuf {
    log.with_extension(RSC_EXTENSION)
}

/// `page-linear.output` becomes `page-linear.output-memchk`
#[must_use]
pub fn legacy_path(log: &Path) -> PathBuf {
    let mut name = OsString::from(log.as_os_str());
    name.push(MEMCHK_SUFFIX);
    PathBuf::from(name)
}

/// The per-kind verdicts read back from an `.rsc` report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionVerdicts {
    /// Kind name and whether its section says `PASS`
    pub sections: Vec<(String, bool)>,
}

impl SectionVerdicts {
    /// Split `text` on empty lines and look for `PASS` in each section
    pub fn parse(text: &str) -> Result<Self, Error> {
        let sections = text
            .split("\n\n")
            .filter(|section| !section.trim().is_empty())
            .map(|section| {
                let kind = section
                    .lines()
                    .find_map(|line| line.strip_prefix("struct "))
                    .ok_or_else(|| {
                        Error::illegal_argument(format!(
                            "Resource report section without a `struct` line: {section:?}"
                        ))
                    })?;
                Ok((kind.trim().to_string(), section.contains("PASS")))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        if sections.is_empty() {
            return Err(Error::illegal_argument("Empty resource report"));
        }
        Ok(Self { sections })
    }

    /// Names of the kinds whose section does not pass
    pub fn leaking(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .filter(|(_, passed)| !passed)
            .map(|(kind, _)| kind.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs, path::Path};

    use super::{legacy_path, rsc_path, run_resource_check, FileReport, SectionVerdicts};
    use crate::{checker::Verdict, config::Config};

    const LOG: &[&str] = &[
        "(page-linear) begin",
        "##### [1] (frame_alloc) f=0xc0104000 is malloced. f->kpage=0xc0271000",
        "##### [2] (frame_alloc) f=0xc0104020 is malloced. f->kpage=0xc0272000",
        "##### [3] (page_make_entry) p=0xc0105000 is malloced to load upage=0x8048000. spt size is 1",
        "##### [4] (frame_free) f=0xc0104020 is freed.",
        "##### [5] (page_hash_free) p=0xc0105000 is freed.",
        "(page-linear) end",
    ];

    fn sample_report() -> FileReport {
        run_resource_check(LOG, &Config::default().compile().unwrap())
    }

    #[test]
    fn reports_each_kind() {
        let report = sample_report();
        assert_eq!(report.resources.len(), 2);
        assert_eq!(report.resources[0].kind, "frame");
        assert_eq!(report.resources[0].verdict(), Verdict::Fail);
        assert_eq!(report.resources[1].kind, "page");
        assert_eq!(report.resources[1].verdict(), Verdict::Pass);
        assert_eq!(report.verdict(), Verdict::Fail);
    }

    #[test]
    fn renders_rsc() {
        assert_eq!(
            sample_report().to_string(),
            "FAIL\n\
             struct frame\n    malloc: total=2\n    free  : total=1\n    remain: total=1\n\
             0xc0104000\n\
             \n\
             PASS\n\
             struct page\n    malloc: total=1\n    free  : total=1\n    remain: total=0\n"
        );
    }

    #[test]
    fn page_section_lists_page_leaks() {
        let lines = [
            "##### [1] (frame_alloc) f=0xf1 is malloced. f->kpage=0x1",
            "##### [2] (page_make_entry) p=0xp1 is malloced to load upage=0x2. spt size is 1",
        ];
        let rendered = run_resource_check(&lines, &Config::default().compile().unwrap()).to_string();
        let (frame, page) = rendered.split_once("\n\n").unwrap();
        assert!(frame.ends_with("\n0xf1") && !frame.contains("0xp1"));
        assert!(page.ends_with("\n0xp1\n") && !page.contains("0xf1"));
        assert_eq!(
            rendered,
            "FAIL\n\
             struct frame\n    malloc: total=1\n    free  : total=0\n    remain: total=1\n\
             0xf1\n\
             \n\
             FAIL\n\
             struct page\n    malloc: total=1\n    free  : total=0\n    remain: total=1\n\
             0xp1\n"
        );
    }

    #[test]
    fn renders_legacy_and_summary() {
        let report = sample_report();
        assert_eq!(
            report.legacy().to_string(),
            "f: malloc: total=2\nf: free  : total=1\nf: remain: total=1\n0xc0104000\n\
             p: malloc: total=1\np: free  : total=1\np: remain: total=0\n"
        );
        assert_eq!(report.summary(), "struct frame:fail, struct page:pass");
    }

    #[test]
    fn rendered_report_reads_back() {
        let verdicts = SectionVerdicts::parse(&sample_report().to_string()).unwrap();
        assert_eq!(
            verdicts.sections,
            vec![("frame".to_string(), false), ("page".to_string(), true)]
        );
        assert_eq!(verdicts.leaking().collect::<Vec<_>>(), ["frame"]);
    }

    #[test]
    fn malformed_report_is_rejected() {
        assert!(SectionVerdicts::parse("").is_err());
        assert!(SectionVerdicts::parse("PASS\nno struct line\n").is_err());
    }

    #[test]
    fn report_paths() {
        assert_eq!(
            rsc_path(Path::new("build/tests/vm/page-linear.output")),
            Path::new("build/tests/vm/page-linear.rsc")
        );
        assert_eq!(
            legacy_path(Path::new("outputs/a")),
            Path::new("outputs/a-memchk")
        );
    }

    #[test]
    fn missing_log_is_an_error() {
        let path = env::temp_dir().join(format!("memchk_missing_{}.output", std::process::id()));
        assert!(FileReport::from_log(&path, &Config::default().compile().unwrap()).is_err());
    }

    #[test]
    fn writes_and_appends_reports() {
        let dir = env::temp_dir().join(format!("memchk_report_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let log = dir.join("page-linear.output");
        fs::write(&log, LOG.join("\n")).unwrap();

        let report = FileReport::from_log(&log, &Config::default().compile().unwrap()).unwrap();
        assert_eq!(report, sample_report());

        report.write(rsc_path(&log)).unwrap();
        report.append_legacy(legacy_path(&log)).unwrap();
        report.append_legacy(legacy_path(&log)).unwrap();

        let rsc = fs::read_to_string(rsc_path(&log)).unwrap();
        let legacy = fs::read_to_string(legacy_path(&log)).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(rsc, report.to_string());
        assert_eq!(legacy, report.legacy().to_string().repeat(2));
    }
}
