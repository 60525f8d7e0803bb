//! Allocation and free accounting over the lines of one log.

use std::{collections::HashSet, fmt};

use crate::pattern::LinePattern;

/// Whether a resource kind, or a whole log, is free of leaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Every allocated token was freed at least once
    Pass,
    /// At least one allocated token was never freed
    Fail,
}

impl Verdict {
    /// `true` for [`Verdict::Pass`]
    #[must_use]
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }

    /// Lowercase form, used in the one-line console summary
    #[must_use]
    pub fn as_lower(self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
        }
    }

    /// [`Verdict::Pass`] iff every verdict in `verdicts` passes
    #[must_use]
    pub fn all<I>(verdicts: I) -> Self
    where
        I: IntoIterator<Item = Verdict>,
    {
        if verdicts.into_iter().all(Verdict::is_pass) {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail => f.write_str("FAIL"),
        }
    }
}

/// A tracked resource: its name and the templates of its allocate and free lines
#[derive(Debug, Clone)]
pub struct ResourceKind {
    name: String,
    alloc: LinePattern,
    free: LinePattern,
}

impl ResourceKind {
    /// Create a new [`ResourceKind`]
    #[must_use]
    pub fn new<S>(name: S, alloc: LinePattern, free: LinePattern) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            alloc,
            free,
        }
    }

    /// The kind's name, e.g. `frame`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The allocate pattern
    #[must_use]
    pub fn alloc(&self) -> &LinePattern {
        &self.alloc
    }

    /// The free pattern
    #[must_use]
    pub fn free(&self) -> &LinePattern {
        &self.free
    }
}

/// The outcome of checking one resource kind.
///
/// `alloc_tokens` and `free_tokens` keep file order and duplicates. `leaked` holds every
/// token that was allocated and never freed, once, in order of first allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeakCheck {
    /// Tokens of all allocate lines
    pub alloc_tokens: Vec<String>,
    /// Tokens of all free lines
    pub free_tokens: Vec<String>,
    /// Allocated tokens without any free line
    pub leaked: Vec<String>,
}

impl LeakCheck {
    /// Compute the leak set for the given records
    #[must_use]
    pub fn from_records(alloc_tokens: Vec<String>, free_tokens: Vec<String>) -> Self {
        let leaked = {
            let freed: HashSet<&str> = free_tokens.iter().map(String::as_str).collect();
            let mut seen = HashSet::new();
            alloc_tokens
                .iter()
                .filter(|token| !freed.contains(token.as_str()) && seen.insert(token.as_str()))
                .cloned()
                .collect()
        };
        Self {
            alloc_tokens,
            free_tokens,
            leaked,
        }
    }

    /// Number of allocate lines
    #[must_use]
    pub fn alloc_total(&self) -> usize {
        self.alloc_tokens.len()
    }

    /// Number of free lines
    #[must_use]
    pub fn free_total(&self) -> usize {
        self.free_tokens.len()
    }

    /// Number of distinct leaked tokens
    #[must_use]
    pub fn remain_total(&self) -> usize {
        self.leaked.len()
    }

    /// See [`verdict`]
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        verdict(&self.leaked)
    }
}

/// The `addr` tokens of every line that matches `pattern`, in order, duplicates kept
#[must_use]
pub fn extract<I, S>(lines: I, pattern: &LinePattern) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| pattern.capture(line.as_ref()).map(str::to_string))
        .collect()
}

/// Extract allocate and free tokens for one resource kind and compute its leak set
#[must_use]
pub fn leak_check<S>(lines: &[S], alloc: &LinePattern, free: &LinePattern) -> LeakCheck
where
    S: AsRef<str>,
{
    LeakCheck::from_records(extract(lines, alloc), extract(lines, free))
}

/// [`Verdict::Pass`] iff nothing leaked
#[must_use]
pub fn verdict<S>(leaked: &[S]) -> Verdict {
    if leaked.is_empty() {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}

/// Checks several resource kinds in a single pass over a log
#[derive(Debug, Clone)]
pub struct LeakChecker {
    kinds: Vec<ResourceKind>,
}

impl LeakChecker {
    /// Create a new [`LeakChecker`] for the given kinds
    #[must_use]
    pub fn new(kinds: Vec<ResourceKind>) -> Self {
        Self { kinds }
    }

    /// The kinds this checker tracks, in report order
    #[must_use]
    pub fn kinds(&self) -> &[ResourceKind] {
        &self.kinds
    }

    /// Classify every line against every kind's patterns, reading the lines once.
    ///
    /// The result has one [`LeakCheck`] per kind, in the order of [`LeakChecker::kinds`].
    #[must_use]
    pub fn scan<I, S>(&self, lines: I) -> Vec<LeakCheck>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut records: Vec<(Vec<String>, Vec<String>)> =
            self.kinds.iter().map(|_| (Vec::new(), Vec::new())).collect();

        for line in lines {
            let line = line.as_ref();
            for (kind, (alloc, free)) in self.kinds.iter().zip(records.iter_mut()) {
                if let Some(token) = kind.alloc.capture(line) {
                    alloc.push(token.to_string());
                }
                if let Some(token) = kind.free.capture(line) {
                    free.push(token.to_string());
                }
            }
        }

        records
            .into_iter()
            .map(|(alloc, free)| LeakCheck::from_records(alloc, free))
            .collect()
    }
}
