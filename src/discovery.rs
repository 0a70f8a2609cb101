//! Finding the exports of a run and checking that they belong together.
//!
//! Export names carry a group id, e.g. `F.B0001.LOAN.CSV` belongs to group
//! `0001`. Every group is expected to deliver the same kinds of file; a group
//! missing one (or carrying an extra one) means the delivery is incomplete and
//! the run must not start.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Marker in file names of observation exports, which are never folded.
pub const OBS_MARKER: &str = "OBS";

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Lists the regular files of `dir` whose names match `pattern`, sorted by
/// file name. With `exclude_obs`, names containing `OBS` in any case are left
/// out.
pub fn discover(dir: &Path, pattern: &Regex, exclude_obs: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if !path.is_file() {
            continue;
        }

        let name = match file_name(&path) {
            Some(name) => name,
            None => continue,
        };

        if !pattern.is_match(name) {
            continue;
        }

        if exclude_obs && name.to_uppercase().contains(OBS_MARKER) {
            debug!(?path, "skipping observation export");
            continue;
        }

        files.push(path);
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if files.is_empty() {
        return Err(Error::NoInput {
            dir: dir.to_path_buf(),
            pattern: pattern.as_str().to_string(),
        });
    }

    Ok(files)
}

/// Splits `name` into its group id and its kind, the name with the id masked
/// by `#`. The id is the first capture group of `group`, or the whole match
/// if it has none.
fn classify(name: &str, group: &Regex) -> Option<(String, String)> {
    let captures = group.captures(name)?;
    let id = captures.get(1).or_else(|| captures.get(0))?;

    let kind = format!(
        "{}{}{}",
        &name[..id.start()],
        "#".repeat(id.as_str().chars().count()),
        &name[id.end()..]
    );

    Some((id.as_str().to_string(), kind))
}

/// Checks that every group among `files` has the same kinds of file as the
/// first group, in id order. Files without a group id take no part.
pub fn check_file_sets(files: &[PathBuf], group: &Regex) -> Result<()> {
    let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for name in files.iter().filter_map(|path| file_name(path)) {
        if let Some((id, kind)) = classify(name, group) {
            groups.entry(id).or_default().insert(kind);
        }
    }

    let mut iter = groups.iter();

    let (reference, expected) = match iter.next() {
        Some(first) => first,
        None => return Ok(()),
    };

    for (id, kinds) in iter {
        if kinds != expected {
            return Err(Error::InconsistentFileSet {
                group: id.clone(),
                reference: reference.clone(),
                missing: expected.difference(kinds).cloned().collect(),
                unexpected: kinds.difference(expected).cloned().collect(),
            });
        }
    }

    info!(
        groups = groups.len(),
        kinds = expected.len(),
        %reference,
        "file sets are consistent"
    );

    Ok(())
}
