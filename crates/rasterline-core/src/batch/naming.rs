//! Output path derivation.
//!
//! [`output_path`] is pure: the batch timestamp is captured once in a
//! [`NamingContext`], so planning and writing always agree on every path.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::encode::OutputFormat;
use crate::template::expand_tokens;

/// How the output file name is built from the input file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", content = "value", rename_all = "snake_case")]
pub enum NamingScheme {
    /// Input stem unchanged.
    KeepName,
    /// Input stem followed by a fixed suffix.
    Suffix(String),
    /// Token template: `{name}`, `{index}`, `{counter}`, `{date}`, `{time}`.
    Template(String),
}

impl Default for NamingScheme {
    fn default() -> Self {
        NamingScheme::Suffix("_edited".into())
    }
}

/// Where outputs go and what they are called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputNaming {
    pub output_dir: PathBuf,
    #[serde(default)]
    pub scheme: NamingScheme,
    #[serde(default)]
    pub format: OutputFormat,
}

impl OutputNaming {
    pub fn new(output_dir: impl Into<PathBuf>, scheme: NamingScheme, format: OutputFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            scheme,
            format,
        }
    }
}

/// Values fixed for the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingContext {
    pub timestamp: NaiveDateTime,
}

impl NamingContext {
    /// Capture the current local time.
    pub fn now() -> Self {
        Self {
            timestamp: Local::now().naive_local(),
        }
    }

    pub fn at(timestamp: NaiveDateTime) -> Self {
        Self { timestamp }
    }
}

/// File stem of `path`, or `"image"` if it has none.
pub fn input_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string())
}

/// Output path for the item at zero-based `index` read from `input`.
pub fn output_path(
    input: &Path,
    index: usize,
    naming: &OutputNaming,
    ctx: &NamingContext,
) -> PathBuf {
    let stem = input_stem(input);
    let base = match &naming.scheme {
        NamingScheme::KeepName => stem,
        NamingScheme::Suffix(suffix) => format!("{stem}{suffix}"),
        NamingScheme::Template(template) => {
            let expanded = expand_tokens(template, |token| {
                let value = match token {
                    "name" => stem.clone(),
                    "index" => (index + 1).to_string(),
                    "counter" => format!("{:03}", index + 1),
                    "date" => ctx.timestamp.format("%Y-%m-%d").to_string(),
                    "time" => ctx.timestamp.format("%H%M%S").to_string(),
                    _ => return None,
                };
                Some(value)
            });
            if expanded.trim().is_empty() {
                stem
            } else {
                expanded
            }
        }
    };
    naming
        .output_dir
        .join(format!("{base}.{}", naming.format.extension()))
}

/// `path` with `_n` appended to its stem.
pub fn with_numeric_suffix(path: &Path, n: u32) -> PathBuf {
    let stem = input_stem(path);
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{n}"),
    };
    path.with_file_name(name)
}
