//! Which resource kinds to track, and the templates of their log lines.
//!
//! The defaults match the lines printed by the instrumented VM code. Other harness
//! versions can be described in a TOML file:
//!
//! ```toml
//! [[kind]]
//! name = "frame"
//! alloc = "##### [{_}] (frame_alloc) f={addr} is malloced and locked. f->kpage={_}"
//! free = "##### [{_}] (frame_free) f={addr} is freed."
//! ```

use std::{collections::HashSet, fs, path::Path};

use serde::Deserialize;

use crate::{
    checker::{LeakChecker, ResourceKind},
    pattern::LinePattern,
    Error,
};

/// Allocate line of a frame table entry
pub const FRAME_ALLOC: &str = "##### [{_}] (frame_alloc) f={addr} is malloced. f->kpage={_}";
/// Free line of a frame table entry
pub const FRAME_FREE: &str = "##### [{_}] (frame_free) f={addr} is freed.";
/// Allocate line of a supplemental page table entry
pub const PAGE_ALLOC: &str =
    "##### [{_}] (page_make_entry) p={addr} is malloced to load upage={_}. spt size is {_}";
/// Free line of a supplemental page table entry
pub const PAGE_FREE: &str = "##### [{_}] (page_hash_free) p={addr} is freed.";

/// One resource kind, with uncompiled templates
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KindConfig {
    /// Name used in reports, e.g. `frame`
    pub name: String,
    /// Template of the allocate line
    pub alloc: String,
    /// Template of the free line
    pub free: String,
}

impl KindConfig {
    /// Create a new [`KindConfig`]
    #[must_use]
    pub fn new(name: &str, alloc: &str, free: &str) -> Self {
        Self {
            name: name.to_string(),
            alloc: alloc.to_string(),
            free: free.to_string(),
        }
    }
}

/// The set of tracked resource kinds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// The kinds, in report order
    #[serde(rename = "kind")]
    pub kinds: Vec<KindConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kinds: vec![
                KindConfig::new("frame", FRAME_ALLOC, FRAME_FREE),
                KindConfig::new("page", PAGE_ALLOC, PAGE_FREE),
            ],
        }
    }
}

impl Config {
    /// Parse a config from TOML text
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config from a TOML file
    pub fn from_file<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        log::debug!("Loading resource kinds from {}", path.display());
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    /// Replace the allocate template of the kind called `name`
    pub fn set_alloc(&mut self, name: &str, template: &str) -> Result<(), Error> {
        let kind = self
            .kinds
            .iter_mut()
            .find(|kind| kind.name == name)
            .ok_or_else(|| Error::illegal_argument(format!("No resource kind `{name}`")))?;
        kind.alloc = template.to_string();
        Ok(())
    }

    /// Check the kind list without compiling the templates
    pub fn validate(&self) -> Result<(), Error> {
        if self.kinds.is_empty() {
            return Err(Error::illegal_argument("No resource kinds configured"));
        }
        let mut names = HashSet::new();
        for kind in &self.kinds {
            if kind.name.is_empty() {
                return Err(Error::illegal_argument("Resource kind with empty name"));
            }
            if !names.insert(kind.name.as_str()) {
                return Err(Error::illegal_argument(format!(
                    "Resource kind `{}` configured twice",
                    kind.name
                )));
            }
        }
        Ok(())
    }

    /// Compile every template and build a [`LeakChecker`]
    pub fn compile(&self) -> Result<LeakChecker, Error> {
        self.validate()?;
        let kinds = self
            .kinds
            .iter()
            .map(|kind| {
                Ok(ResourceKind::new(
                    kind.name.as_str(),
                    LinePattern::new(&kind.alloc)?,
                    LinePattern::new(&kind.free)?,
                ))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(LeakChecker::new(kinds))
    }
}
