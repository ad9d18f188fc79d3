//! Parallel batch execution over an explicit run state.
//!
//! Workers share one [`RunState`] (`pending` queue, `in_flight` set,
//! `completed` and `failures`) behind a mutex and check the cancellation
//! token before taking each item. The pipeline itself checks it again
//! between stages.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use super::conflict::{plan_outputs, ConflictPolicy};
use super::naming::{input_stem, NamingContext, OutputNaming};
use super::writer::write_atomic;
use super::{BatchItem, BatchOptions, BatchOutcome, BatchProgress, BatchReport, ItemFailure};
use crate::decode::decode_file;
use crate::effects::EffectSnapshot;
use crate::encode::{EncodeSettings, DEFAULT_QUALITY};
use crate::overlay::TextContext;
use crate::pipeline::{process_to_bytes, CancellationToken, PipelineError, ProcessingSettings};

/// Everything a batch run needs, captured before it starts.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub settings: ProcessingSettings,
    pub effects: EffectSnapshot,
    pub naming: OutputNaming,
    pub conflict: ConflictPolicy,
    pub allow_overwrite_source: bool,
    /// JPEG quality, 1-100.
    pub quality: u8,
    pub options: BatchOptions,
}

impl BatchJob {
    pub fn new(settings: ProcessingSettings, naming: OutputNaming) -> Self {
        Self {
            settings,
            effects: EffectSnapshot::default(),
            naming,
            conflict: ConflictPolicy::default(),
            allow_overwrite_source: false,
            quality: DEFAULT_QUALITY,
            options: BatchOptions::default(),
        }
    }

    fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings::new(self.naming.format, self.quality)
    }
}

/// Run `job` over `items`.
///
/// # Arguments
///
/// * `items` - Inputs in batch order; output names use their 1-based index
/// * `job` - Settings, effect snapshot, naming and conflict policy
/// * `progress` - Called with a monotonically increasing completed count
/// * `cancel` - Checked before each item and between pipeline stages
///
/// # Returns
///
/// A [`BatchReport`] listing written paths and per-item failures in input
/// order. Cancellation is reported as [`BatchOutcome::Cancelled`], not as
/// an error; outputs already written stay on disk.
///
/// # Errors
///
/// Pre-flight errors (`NamingCollision`, `WouldOverwriteSource`,
/// `OutputExists`) are returned before anything is written, as are
/// failures to create the output directory or the worker pool.
#[tracing::instrument(skip_all, fields(items = items.len()))]
pub fn process_batch(
    items: &[BatchItem],
    job: &BatchJob,
    progress: &(dyn Fn(BatchProgress) + Sync),
    cancel: &CancellationToken,
) -> Result<BatchReport, PipelineError> {
    let naming_ctx = NamingContext::now();
    let outputs = plan_outputs(
        items,
        &job.naming,
        &naming_ctx,
        job.conflict,
        job.allow_overwrite_source,
    )?;

    if items.is_empty() {
        return Ok(BatchReport {
            outcome: BatchOutcome::Completed,
            written: Vec::new(),
            failures: Vec::new(),
        });
    }

    fs::create_dir_all(&job.naming.output_dir).map_err(|e| PipelineError::WriteFailure {
        path: job.naming.output_dir.clone(),
        message: e.to_string(),
    })?;

    let pool = build_thread_pool(job.options.threads)?;
    let workers = pool.current_num_threads().clamp(1, items.len());
    tracing::info!(total = items.len(), workers, "batch started");

    let run = Run {
        items,
        outputs: &outputs,
        job,
        encode: job.encode_settings(),
        naming_ctx,
        cancel,
        state: Mutex::new(RunState::new(items.len())),
        progress: ProgressReporter::new(items.len(), progress),
    };
    pool.scope(|s| {
        for _ in 0..workers {
            s.spawn(|_| run.worker());
        }
    });

    let report = run.finish();
    tracing::info!(
        outcome = ?report.outcome,
        written = report.written.len(),
        failed = report.failures.len(),
        "batch finished"
    );
    Ok(report)
}

fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool, PipelineError> {
    if threads == Some(0) {
        return Err(PipelineError::WorkerPool(
            "'threads' must be >= 1 when set".into(),
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| PipelineError::WorkerPool(format!("failed to build rayon thread pool: {e}")))
}

struct RunState {
    pending: VecDeque<usize>,
    in_flight: HashSet<usize>,
    completed: Vec<(usize, PathBuf)>,
    failures: Vec<ItemFailure>,
    /// Set when cancellation left work undone.
    cancelled: bool,
    /// Set when `fail_fast` stopped the run.
    aborted: bool,
}

impl RunState {
    fn new(total: usize) -> Self {
        Self {
            pending: (0..total).collect(),
            in_flight: HashSet::new(),
            completed: Vec::new(),
            failures: Vec::new(),
            cancelled: false,
            aborted: false,
        }
    }

    fn finished(&self) -> usize {
        self.completed.len() + self.failures.len()
    }
}

/// Delivers progress without ever going backwards.
struct ProgressReporter<'a> {
    total: usize,
    last: Mutex<usize>,
    sink: &'a (dyn Fn(BatchProgress) + Sync),
}

impl<'a> ProgressReporter<'a> {
    fn new(total: usize, sink: &'a (dyn Fn(BatchProgress) + Sync)) -> Self {
        Self {
            total,
            last: Mutex::new(0),
            sink,
        }
    }

    fn report(&self, completed: usize) {
        let Ok(mut last) = self.last.lock() else {
            return;
        };
        if completed > *last {
            *last = completed;
            (self.sink)(BatchProgress {
                completed,
                total: self.total,
            });
        }
    }
}

struct Run<'a> {
    items: &'a [BatchItem],
    outputs: &'a [PathBuf],
    job: &'a BatchJob,
    encode: EncodeSettings,
    naming_ctx: NamingContext,
    cancel: &'a CancellationToken,
    state: Mutex<RunState>,
    progress: ProgressReporter<'a>,
}

impl Run<'_> {
    fn worker(&self) {
        while let Some(index) = self.next_item() {
            let result = self.process_item(index);
            let finished = {
                let Ok(mut state) = self.state.lock() else {
                    return;
                };
                state.in_flight.remove(&index);
                match result {
                    Ok(path) => state.completed.push((index, path)),
                    Err(PipelineError::Cancelled) => state.cancelled = true,
                    Err(error) => {
                        let input_path = self.items[index].input_path.clone();
                        tracing::warn!(index, input = %input_path.display(), %error, "item failed");
                        if self.job.options.fail_fast {
                            state.aborted = true;
                        }
                        state.failures.push(ItemFailure {
                            index,
                            input_path,
                            error,
                        });
                    }
                }
                state.finished()
            };
            self.progress.report(finished);
        }
    }

    /// Take the next pending item, or `None` when the worker should stop.
    fn next_item(&self) -> Option<usize> {
        let mut state = self.state.lock().ok()?;
        if state.aborted {
            return None;
        }
        if self.cancel.is_cancelled() {
            if !state.pending.is_empty() {
                state.cancelled = true;
            }
            return None;
        }
        let index = state.pending.pop_front()?;
        state.in_flight.insert(index);
        Some(index)
    }

    fn process_item(&self, index: usize) -> Result<PathBuf, PipelineError> {
        let item = &self.items[index];
        let decoded;
        let source = match &item.source {
            Some(bitmap) => bitmap.as_ref(),
            None => {
                decoded = decode_file(&item.input_path)?;
                &decoded
            }
        };

        let ctx = TextContext::with_timestamp(
            input_stem(&item.input_path),
            index + 1,
            self.items.len(),
            self.naming_ctx.timestamp,
        );
        let effects = self.job.effects.effects_for(&item.image_id);
        let bytes = process_to_bytes(
            source,
            &self.job.settings,
            effects,
            &ctx,
            &self.encode,
            self.cancel,
        )?;

        self.cancel.check()?;
        let target = &self.outputs[index];
        write_atomic(target, &bytes)?;
        tracing::debug!(index, output = %target.display(), bytes = bytes.len(), "item written");
        Ok(target.clone())
    }

    fn finish(self) -> BatchReport {
        let state = match self.state.into_inner() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut completed = state.completed;
        completed.sort_by_key(|(i, _)| *i);
        let mut failures = state.failures;
        failures.sort_by_key(|f| f.index);

        let outcome = if state.aborted {
            BatchOutcome::Aborted
        } else if state.cancelled {
            BatchOutcome::Cancelled
        } else {
            BatchOutcome::Completed
        };
        BatchReport {
            outcome,
            written: completed.into_iter().map(|(_, p)| p).collect(),
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::naming::NamingScheme;
    use crate::bitmap::{Bitmap, Rgba};
    use crate::effects::{EffectKind, EffectStore, ImageId};
    use crate::encode::OutputFormat;
    use crate::geometry::NormalizedRect;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn memory_items(n: usize) -> Vec<BatchItem> {
        (0..n)
            .map(|i| {
                BatchItem::with_bitmap(
                    format!("/virtual/img{i}.png"),
                    Bitmap::filled(16, 12, Rgba::rgb(i as u8 * 20, 0, 0)),
                )
            })
            .collect()
    }

    fn job(out: &Path, scheme: NamingScheme) -> BatchJob {
        let mut job = BatchJob::new(
            ProcessingSettings::default(),
            OutputNaming::new(out, scheme, OutputFormat::Png),
        );
        job.options.threads = Some(2);
        job
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .map(|rd| {
                rd.filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[test]
    fn test_all_items_written() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let items = memory_items(5);
        let report = process_batch(
            &items,
            &job(&out, NamingScheme::Suffix("_web".into())),
            &|_| {},
            &CancellationToken::new(),
        )
        .unwrap();

        assert!(report.is_success());
        assert_eq!(report.written.len(), 5);
        assert_eq!(report.written[0], out.join("img0_web.png"));
        assert_eq!(files_in(&out).len(), 5);
    }

    #[test]
    fn test_naming_collision_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let items = memory_items(3);
        let err = process_batch(
            &items,
            &job(&out, NamingScheme::Template("export".into())),
            &|_| {},
            &CancellationToken::new(),
        )
        .unwrap_err();

        assert!(matches!(err, PipelineError::NamingCollision { first: 0, second: 1, .. }));
        assert!(!out.exists(), "no directory or file may be created");
    }

    #[test]
    fn test_cancel_after_three_leaves_three_outputs() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let items = memory_items(10);
        let mut job = job(&out, NamingScheme::KeepName);
        job.options.threads = Some(1);
        let token = CancellationToken::new();
        let seen = Mutex::new(Vec::new());

        let report = process_batch(
            &items,
            &job,
            &|p: BatchProgress| {
                if let Ok(mut seen) = seen.lock() {
                    seen.push(p.completed);
                }
                if p.completed == 3 {
                    token.cancel();
                }
            },
            &token,
        )
        .unwrap();

        assert_eq!(report.outcome, BatchOutcome::Cancelled);
        assert_eq!(report.completed_count(), 3);
        assert!(report.failures.is_empty());
        assert_eq!(files_in(&out), vec!["img0.png", "img1.png", "img2.png"]);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_progress_is_monotonic_across_workers() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let items = memory_items(12);
        let mut job = job(&out, NamingScheme::KeepName);
        job.options.threads = Some(4);
        let last = AtomicUsize::new(0);
        let decreased = AtomicUsize::new(0);

        let report = process_batch(
            &items,
            &job,
            &|p: BatchProgress| {
                let prev = last.swap(p.completed, Ordering::SeqCst);
                if p.completed <= prev {
                    decreased.fetch_add(1, Ordering::SeqCst);
                }
            },
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(report.written.len(), 12);
        assert_eq!(decreased.load(Ordering::SeqCst), 0);
        assert_eq!(last.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn test_failures_do_not_stop_siblings() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let mut items = memory_items(3);
        items.insert(1, BatchItem::from_path(tmp.path().join("missing.jpg")));

        let report = process_batch(
            &items,
            &job(&out, NamingScheme::KeepName),
            &|_| {},
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(report.outcome, BatchOutcome::Completed);
        assert_eq!(report.written.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert!(matches!(report.failures[0].error, PipelineError::DecodeFailure(_)));
    }

    #[test]
    fn test_fail_fast_aborts() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let mut items = vec![BatchItem::from_path(tmp.path().join("missing.jpg"))];
        items.extend(memory_items(4));
        let mut job = job(&out, NamingScheme::KeepName);
        job.options.threads = Some(1);
        job.options.fail_fast = true;

        let report = process_batch(&items, &job, &|_| {}, &CancellationToken::new()).unwrap();
        assert_eq!(report.outcome, BatchOutcome::Aborted);
        assert_eq!(report.failures.len(), 1);
        assert!(report.written.is_empty());
    }

    #[test]
    fn test_effects_taken_from_snapshot() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let items = memory_items(2);

        let mut store = EffectStore::new();
        let target = ImageId::from_path(&items[1].input_path);
        store.add(&target, NormalizedRect::FULL, EffectKind::solid_fill(Rgba::rgb(0, 255, 0)));
        let mut job = job(&out, NamingScheme::KeepName);
        job.effects = store.snapshot();
        // Later edits must not reach the running job
        store.clear(&target);

        let report = process_batch(&items, &job, &|_| {}, &CancellationToken::new()).unwrap();
        let first = crate::decode::decode_file(&report.written[0]).unwrap();
        let second = crate::decode::decode_file(&report.written[1]).unwrap();
        assert_eq!(first.pixel(0, 0), Rgba::rgb(0, 0, 0));
        assert_eq!(second.pixel(0, 0), Rgba::rgb(0, 255, 0));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut job = job(tmp.path(), NamingScheme::KeepName);
        job.options.threads = Some(0);
        let err = process_batch(&memory_items(1), &job, &|_| {}, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::WorkerPool(_)));
    }
}
