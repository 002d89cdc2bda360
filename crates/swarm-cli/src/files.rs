//! File discovery and I/O with path context on every error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;

/// The single file in `dir` whose name satisfies `matches`.
///
/// # Errors
///
/// Fails if `dir` cannot be listed or holds zero or several matching files.
pub fn find_unique(dir: &Path, what: &str, matches: impl Fn(&str) -> bool) -> Result<PathBuf> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let is_match = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(&matches);
        if is_match {
            found.push(path);
        }
    }
    found.sort();
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => bail!("no {what} file in {}", dir.display()),
        n => bail!("found {n} {what} files in {}: {found:?}", dir.display()),
    }
}

/// Subdirectories of `dir`, sorted by path.
///
/// # Errors
///
/// Fails if `dir` cannot be listed.
pub fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Last component of `path` as UTF-8.
///
/// # Errors
///
/// Fails for paths without a UTF-8 final component (such as `..`).
pub fn base_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("{} has no usable file name", path.display()))
}

/// Read a whole file as UTF-8.
///
/// # Errors
///
/// Fails if the file cannot be read.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Read and deserialize a JSON file.
///
/// # Errors
///
/// Fails if the file cannot be read or does not hold a `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_text(path)?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Write `text`, creating parent directories as needed. Replaces any existing file.
///
/// # Errors
///
/// Fails if the directory or file cannot be written.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}
