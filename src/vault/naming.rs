//! Collision-free output file naming.
//!
//! Files are named `<prefix>_<NNNNN>.<ext>`. The next index is one past the
//! highest index already present for the same prefix and extension, then
//! advanced while a file with that name exists.
//!
//! [`next_target`] alone is a check-then-write: two writers racing on the same
//! directory can compute the same name. [`claim`] closes that gap by opening
//! the file create-exclusive and moving on to a fresh index when it loses.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, ToolsError};

/// Zero-padding width of the numeric suffix.
pub const INDEX_WIDTH: usize = 5;

/// A resolved, collision-free place to write one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub directory: PathBuf,
    pub filename: String,
    pub index: u64,
}

impl OutputTarget {
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Reject prefixes that would place files outside the target directory.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    let has_separator = prefix.contains('/') || prefix.contains('\\');
    let escapes = Path::new(prefix)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if has_separator || (!prefix.is_empty() && escapes) {
        return Err(ToolsError::Config(format!(
            "Invalid filename prefix '{}': must be a plain file name",
            prefix
        )));
    }
    Ok(())
}

/// Filename for `index`, e.g. `render_00007.png`.
pub fn candidate_name(prefix: &str, index: u64, extension: &str) -> String {
    if prefix.is_empty() {
        format!("{:0width$}.{}", index, extension, width = INDEX_WIDTH)
    } else {
        format!("{}_{:0width$}.{}", prefix, index, extension, width = INDEX_WIDTH)
    }
}

/// Index encoded in `filename` if it follows the naming scheme.
pub fn parse_index(filename: &str, prefix: &str, extension: &str) -> Option<u64> {
    let stem = filename
        .strip_suffix(extension)?
        .strip_suffix('.')?;
    let digits = if prefix.is_empty() {
        stem
    } else {
        stem.strip_prefix(prefix)?.strip_prefix('_')?
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Compute the next free target in `directory` without touching the disk.
pub fn next_target(directory: &Path, prefix: &str, extension: &str) -> Result<OutputTarget> {
    let mut highest: Option<u64> = None;
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(index) = parse_index(name, prefix, extension) {
            highest = Some(highest.map_or(index, |h| h.max(index)));
        }
    }

    let exhausted = || {
        ToolsError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "index space exhausted for prefix '{}' in {}",
                prefix,
                directory.display()
            ),
        ))
    };

    let mut index = match highest {
        Some(h) => h.checked_add(1).ok_or_else(exhausted)?,
        None => 0,
    };
    while directory
        .join(candidate_name(prefix, index, extension))
        .exists()
    {
        index = index.checked_add(1).ok_or_else(exhausted)?;
    }

    Ok(OutputTarget {
        directory: directory.to_path_buf(),
        filename: candidate_name(prefix, index, extension),
        index,
    })
}

/// Open `target` create-exclusive, re-resolving the name each time another
/// writer got there first.
pub fn claim(
    mut target: OutputTarget,
    prefix: &str,
    extension: &str,
    max_attempts: u32,
) -> Result<(OutputTarget, File)> {
    for attempt in 1..=max_attempts.max(1) {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(target.path())
        {
            Ok(file) => return Ok((target, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!(
                    path = %target.path().display(),
                    attempt,
                    "output name taken concurrently, picking another"
                );
                target = next_target(&target.directory, prefix, extension)?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ToolsError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "no free name for prefix '{}' in {} after {} attempts",
            prefix,
            target.directory.display(),
            max_attempts
        ),
    )))
}

/// Resolve and claim the next free name in one step.
pub fn claim_next(
    directory: &Path,
    prefix: &str,
    extension: &str,
    max_attempts: u32,
) -> Result<(OutputTarget, File)> {
    let target = next_target(directory, prefix, extension)?;
    claim(target, prefix, extension, max_attempts)
}
