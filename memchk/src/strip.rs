//! Removes the kernel's instrumentation lines from a test output, so the remainder can be
//! diffed against the expected output.

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use crate::Error;

/// Lines starting with this marker are instrumentation
pub const COMMENT_MARKER: &[u8] = b"#####";
/// Suffix of the stripped sibling file
pub const STRIPPED_SUFFIX: &str = "-without-comments";

/// Drop every line starting with [`COMMENT_MARKER`]; keep all other lines byte for byte
#[must_use]
pub fn strip_comments(input: &[u8]) -> Vec<u8> {
    input
        .split_inclusive(|&b| b == b'\n')
        .filter(|line| !line.starts_with(COMMENT_MARKER))
        .flatten()
        .copied()
        .collect()
}

/// `outputs/a` becomes `outputs/a-without-comments`
#[must_use]
pub fn stripped_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(STRIPPED_SUFFIX);
    PathBuf::from(name)
}

/// Strip the file at `path` into its `-without-comments` sibling, returning the sibling's path
pub fn strip_file<P>(path: P) -> Result<PathBuf, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let out = stripped_path(path);
    log::debug!("Stripping {} into {}", path.display(), out.display());
    fs::write(&out, strip_comments(&fs::read(path)?))?;
    Ok(out)
}

/// Strip every regular file directly inside `dir`.
///
/// Files that are already stripped outputs are skipped. Returns the written paths, sorted.
pub fn strip_dir<P>(dir: P) -> Result<Vec<PathBuf>, Error>
where
    P: AsRef<Path>,
{
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry
            .file_name()
            .to_string_lossy()
            .ends_with(STRIPPED_SUFFIX)
        {
            continue;
        }
        inputs.push(entry.path());
    }
    inputs.sort();
    inputs.iter().map(strip_file).collect()
}
