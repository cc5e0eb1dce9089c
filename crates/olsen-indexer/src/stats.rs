//! Aggregate run statistics and per-file timing records, per spec.md §4.1.
//! Both are monotonic accumulators guarded by a mutex while workers run
//! (spec.md §5's shared-resource policy).

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Newly indexed (or re-indexed after a content-hash change).
    Processed,
    /// Already in the catalog with an unchanged content hash.
    Skipped,
    /// Content hash changed since the last index; record replaced.
    Updated,
    /// A RAW file indexed as metadata-only because `raw_supported()` is
    /// false for this build — distinct from a genuine failure (spec.md §4.2).
    SkippedUnsupported,
    Failed,
}

#[derive(Debug, Clone)]
pub struct FileTiming {
    pub path: String,
    pub outcome: FileOutcome,
    pub hash_ms: u64,
    pub metadata_ms: u64,
    pub decode_ms: u64,
    pub thumbnail_ms: u64,
    pub color_ms: u64,
    pub phash_ms: u64,
    pub inference_ms: u64,
    pub commit_ms: u64,
    pub total_ms: u64,
    pub error: Option<String>,
}

/// Result of running the per-file pipeline: who the stats accumulator should
/// credit, and (if timings are enabled) the stage-by-stage breakdown.
#[derive(Debug, Clone)]
pub struct FileResult {
    pub outcome: FileOutcome,
    pub thumbnails_generated: usize,
    pub timing: Option<FileTiming>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub found: usize,
    pub processed: usize,
    pub skipped: usize,
    pub updated: usize,
    pub failed: usize,
    pub skipped_unsupported: usize,
    pub thumbnails_generated: usize,
    pub duration: Duration,
    pub rate: f64,
}

impl IndexStats {
    pub(crate) fn record(&mut self, result: &FileResult) {
        match result.outcome {
            FileOutcome::Processed => self.processed += 1,
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Updated => self.updated += 1,
            FileOutcome::SkippedUnsupported => self.skipped_unsupported += 1,
            FileOutcome::Failed => self.failed += 1,
        }
        self.thumbnails_generated += result.thumbnails_generated;
    }

    pub(crate) fn finish(&mut self, found: usize, duration: Duration) {
        self.found = found;
        self.duration = duration;
        self.rate = if duration.as_secs_f64() > 0.0 {
            self.processed as f64 / duration.as_secs_f64()
        } else {
            0.0
        };
    }
}
