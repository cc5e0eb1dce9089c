//! Explicit engine-construction configuration, per spec.md §9's design note:
//! no env-driven globals, no process-wide singletons — a caller builds one of
//! these and hands it to [`crate::index`].

use std::sync::Arc;

/// Progress callback invoked after each file completes, `(processed, total)`.
/// The host is responsible for its own thread-safety (spec.md §5) — it may be
/// called concurrently from any worker thread.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

#[derive(Clone)]
pub struct IndexerConfig {
    /// Size of the bounded worker pool. Spec.md §4.1 default is 4.
    pub worker_count: usize,
    pub progress: Option<ProgressCallback>,
    /// Whether to record a per-file [`crate::stats::FileTiming`] for every
    /// processed file.
    pub capture_timings: bool,
    /// Fraction of successfully thumbnailed photos to sample for
    /// [`olsen_thumbnail::ThumbnailDiagnostics`] (spec.md §4.3).
    pub thumbnail_sample_rate: f32,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            progress: None,
            capture_timings: true,
            thumbnail_sample_rate: 0.05,
        }
    }
}

impl std::fmt::Debug for IndexerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexerConfig")
            .field("worker_count", &self.worker_count)
            .field("progress", &self.progress.is_some())
            .field("capture_timings", &self.capture_timings)
            .field("thumbnail_sample_rate", &self.thumbnail_sample_rate)
            .finish()
    }
}
