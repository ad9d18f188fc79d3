//! Pre-flight output planning.
//!
//! Every check here runs before the first write, sequentially and in item
//! order, so a batch either plans fully or fails without touching disk.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::naming::{output_path, with_numeric_suffix, NamingContext, OutputNaming};
use super::BatchItem;
use crate::pipeline::PipelineError;

/// What to do when an output path already exists on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Replace the existing file.
    Overwrite,
    /// Append `_1`, `_2`, ... to the stem until the path is free.
    #[default]
    RenameWithNumericSuffix,
    /// Fail the batch before writing anything.
    Abort,
}

/// Give up looking for a free numeric suffix after this many attempts.
const MAX_SUFFIX: u32 = 10_000;

/// Resolve the output path of every item.
///
/// # Errors
///
/// - [`PipelineError::NamingCollision`] if two items name the same output.
/// - [`PipelineError::WouldOverwriteSource`] if an output equals any input
///   and `allow_overwrite_source` is false.
/// - [`PipelineError::OutputExists`] if an output exists and `policy` is
///   [`ConflictPolicy::Abort`].
pub fn plan_outputs(
    items: &[BatchItem],
    naming: &OutputNaming,
    ctx: &NamingContext,
    policy: ConflictPolicy,
    allow_overwrite_source: bool,
) -> Result<Vec<PathBuf>, PipelineError> {
    let raw: Vec<PathBuf> = items
        .iter()
        .enumerate()
        .map(|(i, item)| output_path(&item.input_path, i, naming, ctx))
        .collect();

    let mut seen: HashMap<&Path, usize> = HashMap::with_capacity(raw.len());
    for (i, path) in raw.iter().enumerate() {
        if let Some(&first) = seen.get(path.as_path()) {
            return Err(PipelineError::NamingCollision {
                path: path.clone(),
                first,
                second: i,
            });
        }
        seen.insert(path.as_path(), i);
    }

    if !allow_overwrite_source {
        for path in &raw {
            if let Some(index) = items.iter().position(|item| same_file(path, &item.input_path)) {
                return Err(PipelineError::WouldOverwriteSource {
                    path: path.clone(),
                    index,
                });
            }
        }
    }

    match policy {
        ConflictPolicy::Overwrite => Ok(raw),
        ConflictPolicy::Abort => match raw.iter().find(|p| p.exists()) {
            Some(path) => Err(PipelineError::OutputExists { path: path.clone() }),
            None => Ok(raw),
        },
        ConflictPolicy::RenameWithNumericSuffix => {
            let mut taken: HashSet<PathBuf> = raw.iter().cloned().collect();
            let mut planned = Vec::with_capacity(raw.len());
            for path in raw {
                if !path.exists() {
                    planned.push(path);
                    continue;
                }
                let renamed = (1..=MAX_SUFFIX)
                    .map(|n| with_numeric_suffix(&path, n))
                    .find(|candidate| !candidate.exists() && !taken.contains(candidate))
                    .ok_or_else(|| PipelineError::OutputExists { path: path.clone() })?;
                tracing::warn!(
                    from = %path.display(),
                    to = %renamed.display(),
                    "output exists, renaming"
                );
                taken.insert(renamed.clone());
                planned.push(renamed);
            }
            Ok(planned)
        }
    }
}

/// True when both paths name the same file.
///
/// Falls back to comparing the paths as given when either cannot be
/// canonicalized (for example because it does not exist yet).
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
