//! Batch export: the single-item pipeline run over many independent items.
//!
//! ## Phases
//!
//! 1. **Pre-flight** ([`plan_outputs`]): resolve every output path and check
//!    naming collisions, source overwrites and existing files. Nothing is
//!    written unless this succeeds for the whole batch.
//! 2. **Execution** ([`process_batch`]): workers on a `rayon` pool pull items
//!    from a shared queue, run the pipeline, and write each output
//!    atomically.
//!
//! Settings and effect lists are captured in a [`BatchJob`] before the run
//! starts; edits made while it runs are never observed.

mod conflict;
mod executor;
mod naming;
mod writer;

pub use conflict::{plan_outputs, ConflictPolicy};
pub use executor::{process_batch, BatchJob};
pub use naming::{
    input_stem, output_path, with_numeric_suffix, NamingContext, NamingScheme, OutputNaming,
};
pub use writer::write_atomic;

use std::path::PathBuf;
use std::sync::Arc;

use crate::bitmap::Bitmap;
use crate::effects::ImageId;
use crate::pipeline::PipelineError;

/// One source image of a batch.
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Path the source was (or will be) read from; drives output naming.
    pub input_path: PathBuf,
    /// Key into the effect snapshot.
    pub image_id: ImageId,
    /// Already-decoded pixels. When `None` the file at `input_path` is decoded.
    pub source: Option<Arc<Bitmap>>,
}

impl BatchItem {
    /// An item decoded from disk when processed.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let input_path = path.into();
        Self {
            image_id: ImageId::from_path(&input_path),
            input_path,
            source: None,
        }
    }

    /// An item whose pixels are already in memory.
    pub fn with_bitmap(path: impl Into<PathBuf>, bitmap: Bitmap) -> Self {
        Self {
            source: Some(Arc::new(bitmap)),
            ..Self::from_path(path)
        }
    }
}

/// Execution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOptions {
    /// Worker threads; `None` uses the number of available cores.
    pub threads: Option<usize>,
    /// Stop pulling new items after the first failure.
    pub fail_fast: bool,
}

/// Progress snapshot handed to the progress sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Items finished, successfully or not.
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// How a batch run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every item was attempted.
    Completed,
    /// Stopped by the cancellation token; finished outputs are kept.
    Cancelled,
    /// Stopped after a failure because `fail_fast` was set.
    Aborted,
}

/// A per-item failure.
#[derive(Debug)]
pub struct ItemFailure {
    pub index: usize,
    pub input_path: PathBuf,
    pub error: PipelineError,
}

/// Result of a batch run that passed pre-flight.
#[derive(Debug)]
pub struct BatchReport {
    pub outcome: BatchOutcome,
    /// Written outputs, in item order.
    pub written: Vec<PathBuf>,
    /// Failed items, in item order.
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn completed_count(&self) -> usize {
        self.written.len()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == BatchOutcome::Completed && self.failures.is_empty()
    }
}
