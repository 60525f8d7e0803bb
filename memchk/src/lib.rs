/*!
 * # `memchk`
 *
 * Leak accounting for the debug output of an instrumented kernel test harness.
 *
 * The kernel prints one line per frame or supplemental page entry it allocates
 * and frees. This crate matches those lines against fixed templates, collects the
 * addresses per resource kind and reports every address that was allocated but never
 * freed. It also strips the instrumentation lines from a log, and aggregates the
 * per-test results into a statistics file.
 */
#![warn(clippy::cargo)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

pub mod checker;
pub mod config;
pub mod pattern;
pub mod report;
pub mod stat;
pub mod strip;

use std::{fmt, io};

pub use checker::{extract, leak_check, verdict, LeakCheck, LeakChecker, ResourceKind, Verdict};
pub use config::Config;
pub use pattern::LinePattern;
pub use report::{run_resource_check, FileReport, ResourceReport};

#[cfg(feature = "errors_backtrace")]
/// Error Backtrace type when `errors_backtrace` feature is enabled (== [`backtrace::Backtrace`])
pub type ErrorBacktrace = backtrace::Backtrace;

#[cfg(not(feature = "errors_backtrace"))]
#[derive(Debug, Default)]
/// Empty struct to use when `errors_backtrace` is disabled
pub struct ErrorBacktrace {}
#[cfg(not(feature = "errors_backtrace"))]
impl ErrorBacktrace {
    /// Nop
    #[must_use]
    pub fn new() -> Self {
        Self {}
    }
}

#[cfg(feature = "errors_backtrace")]
fn display_error_backtrace(f: &mut fmt::Formatter, err: &ErrorBacktrace) -> fmt::Result {
    write!(f, "\nBacktrace: {err:?}")
}
#[cfg(not(feature = "errors_backtrace"))]
#[allow(clippy::unnecessary_wraps)]
fn display_error_backtrace(_f: &mut fmt::Formatter, _err: &ErrorBacktrace) -> fmt::Result {
    fmt::Result::Ok(())
}

/// Main error struct for `memchk`
#[derive(Debug)]
pub enum Error {
    /// File related error, e.g. a log or result file that does not exist
    File(io::Error, ErrorBacktrace),
    /// A template, config or report was malformed
    IllegalArgument(String, ErrorBacktrace),
    /// Deserialization of a config file failed
    Serialize(String, ErrorBacktrace),
    /// Something else happened
    Unknown(String, ErrorBacktrace),
}

impl Error {
    /// File related error
    #[must_use]
    pub fn file(arg: io::Error) -> Self {
        Error::File(arg, ErrorBacktrace::new())
    }
    /// The argument passed to this method or function is not valid
    #[must_use]
    pub fn illegal_argument<S>(arg: S) -> Self
    where
        S: Into<String>,
    {
        Error::IllegalArgument(arg.into(), ErrorBacktrace::new())
    }
    /// Serialization error
    #[must_use]
    pub fn serialize<S>(arg: S) -> Self
    where
        S: Into<String>,
    {
        Error::Serialize(arg.into(), ErrorBacktrace::new())
    }
    /// Something else happened
    #[must_use]
    pub fn unknown<S>(arg: S) -> Self
    where
        S: Into<String>,
    {
        Error::Unknown(arg.into(), ErrorBacktrace::new())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::File(err, b) => {
                write!(f, "File IO failed: {err}")?;
                display_error_backtrace(f, b)
            }
            Self::IllegalArgument(s, b) => {
                write!(f, "Illegal argument: {s}")?;
                display_error_backtrace(f, b)
            }
            Self::Serialize(s, b) => {
                write!(f, "Error in Deserialization: `{s}`")?;
                display_error_backtrace(f, b)
            }
            Self::Unknown(s, b) => {
                write!(f, "Unknown error: {s}")?;
                display_error_backtrace(f, b)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::File(err, _) => Some(err),
            _ => None,
        }
    }
}

/// Create a `memchk` Error from io Error
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::file(err)
    }
}

/// A template that does not compile to a regex is an illegal argument
impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Self::illegal_argument(format!("Invalid line pattern: {err}"))
    }
}

/// Stringify the toml deserializer error
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::serialize(format!("{err}"))
    }
}

/// The result type used throughout this crate
pub type Result<T> = core::result::Result<T, Error>;
