//! The indexing engine: a bounded worker pool that walks a root directory,
//! runs the per-file pipeline (`pipeline.rs`) on every candidate image, and
//! accumulates run statistics, per spec.md §4.1 and §5.
//!
//! The worker pool is a scoped `rayon::ThreadPoolBuilder`, sized to
//! `IndexerConfig::worker_count` — the same bounded-fan-out idiom the
//! teacher's `thumbnail-cache::generate_batch` uses for parallel batch work,
//! rather than a hand-rolled channel + `thread::spawn` loop. `olsen-catalog`
//! serializes writers internally, so concurrent `insert_photo` calls from
//! different workers are safe.

mod config;
mod pipeline;
mod stats;

pub use config::{IndexerConfig, ProgressCallback};
pub use stats::{FileOutcome, FileResult, FileTiming, IndexStats};

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use olsen_catalog::CatalogDb;
use rayon::prelude::*;
use walkdir::WalkDir;

/// Extensions that always have a decoder available (`image` handles these
/// directly, including the DNG container for its embedded-preview path).
const ALWAYS_SUPPORTED_EXTENSIONS: &[&str] = &["dng", "jpg", "jpeg", "bmp"];

/// Camera-specific RAW extensions, indexed only when `raw_supported()` is
/// true for this build (spec.md §6).
const RAW_ONLY_EXTENSIONS: &[&str] = &["cr2", "nef", "raf", "arw"];

/// Enumerate every candidate file under `root` matching the supported
/// extension set, recursing through subdirectories. This is the one piece of
/// filesystem-walking semantics spec.md §1 keeps in scope ("enumerate files
/// with the supported extensions under a root path"); anything beyond that
/// (symlink policy, ignore files, …) is the external host's concern.
fn enumerate_candidates(root: &Path) -> Vec<std::path::PathBuf> {
    let raw_supported = olsen_codec::raw_supported();
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let ext = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .unwrap_or_default();
            ALWAYS_SUPPORTED_EXTENSIONS.contains(&ext.as_str())
                || (raw_supported && RAW_ONLY_EXTENSIONS.contains(&ext.as_str()))
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Index every supported file under `root` into `db`. Returns only after
/// every file has completed or failed (spec.md §4.1); a per-file failure
/// never aborts the run.
pub fn index(root: &Path, db: &CatalogDb, config: &IndexerConfig) -> anyhow::Result<IndexStats> {
    let started = Instant::now();
    let candidates = enumerate_candidates(root);
    let found = candidates.len();
    log::info!("found {found} candidate files under {}", root.display());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count.max(1))
        .build()?;

    let stats = Mutex::new(IndexStats::default());
    let timings = Mutex::new(Vec::<FileTiming>::new());
    let processed_count = Mutex::new(0usize);

    pool.install(|| {
        candidates.par_iter().for_each(|path| {
            let sample_diagnostics = should_sample(path, config.thumbnail_sample_rate);
            let result = pipeline::process_file(db, path, config.capture_timings, sample_diagnostics);

            stats.lock().unwrap_or_else(|p| p.into_inner()).record(&result);
            if let Some(timing) = result.timing.clone() {
                timings.lock().unwrap_or_else(|p| p.into_inner()).push(timing);
            }

            let mut count = processed_count.lock().unwrap_or_else(|p| p.into_inner());
            *count += 1;
            if let Some(cb) = &config.progress {
                cb(*count, found);
            }
        });
    });

    let mut stats = stats.into_inner().unwrap_or_else(|p| p.into_inner());
    stats.finish(found, started.elapsed());
    log::info!(
        "index run complete: {} processed, {} updated, {} skipped, {} failed in {:.2}s",
        stats.processed,
        stats.updated,
        stats.skipped,
        stats.failed,
        stats.duration.as_secs_f64()
    );

    Ok(stats)
}

/// Same as [`index`] but also returns the per-file timing records
/// (`config.capture_timings` must be set for this to be non-empty).
pub fn index_with_timings(
    root: &Path,
    db: &CatalogDb,
    config: &IndexerConfig,
) -> anyhow::Result<(IndexStats, Vec<FileTiming>)> {
    let started = Instant::now();
    let candidates = enumerate_candidates(root);
    let found = candidates.len();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count.max(1))
        .build()?;

    let stats = Mutex::new(IndexStats::default());
    let timings = Mutex::new(Vec::<FileTiming>::new());
    let processed_count = Mutex::new(0usize);

    pool.install(|| {
        candidates.par_iter().for_each(|path| {
            let sample_diagnostics = should_sample(path, config.thumbnail_sample_rate);
            let result = pipeline::process_file(db, path, true, sample_diagnostics);

            stats.lock().unwrap_or_else(|p| p.into_inner()).record(&result);
            if let Some(timing) = result.timing.clone() {
                timings.lock().unwrap_or_else(|p| p.into_inner()).push(timing);
            }

            let mut count = processed_count.lock().unwrap_or_else(|p| p.into_inner());
            *count += 1;
            if let Some(cb) = &config.progress {
                cb(*count, found);
            }
        });
    });

    let mut stats = stats.into_inner().unwrap_or_else(|p| p.into_inner());
    stats.finish(found, started.elapsed());
    let timings = timings.into_inner().unwrap_or_else(|p| p.into_inner());
    Ok((stats, timings))
}

/// Deterministic-enough sampling decision for thumbnail diagnostics: hash the
/// path's byte length against the configured rate. Not cryptographic — just
/// needs to pick a stable fraction of files without a process-wide RNG.
fn should_sample(path: &Path, rate: f32) -> bool {
    if rate <= 0.0 {
        return false;
    }
    if rate >= 1.0 {
        return true;
    }
    let bucket = path.display().to_string().bytes().fold(0u32, |acc, b| acc.wrapping_add(b as u32));
    (bucket % 100) < (rate * 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn write_jpeg(path: &Path, w: u32, h: u32) {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }));
        img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
    }

    #[test]
    fn enumerate_candidates_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_jpeg(&dir.path().join("a.jpg"), 32, 24);
        std::fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write_jpeg(&dir.path().join("sub/b.jpeg"), 32, 24);

        let found = enumerate_candidates(dir.path());
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn index_processes_new_files_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_jpeg(&dir.path().join("a.jpg"), 300, 200);
        write_jpeg(&dir.path().join("b.jpg"), 300, 200);

        let db = CatalogDb::open_in_memory().unwrap();
        let config = IndexerConfig { worker_count: 2, ..Default::default() };

        let stats = index(dir.path(), &db, &config).unwrap();
        assert_eq!(stats.found, 2);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.failed, 0);
        assert!(stats.thumbnails_generated > 0);
        assert_eq!(db.photo_count().unwrap(), 2);

        // Second run: unchanged content hashes, everything skipped, no new thumbnails.
        let stats2 = index(dir.path(), &db, &config).unwrap();
        assert_eq!(stats2.processed, 0);
        assert_eq!(stats2.skipped, 2);
        assert_eq!(stats2.thumbnails_generated, 0);
        assert_eq!(db.photo_count().unwrap(), 2);
    }

    #[test]
    fn index_detects_content_hash_change_as_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        write_jpeg(&path, 300, 200);

        let db = CatalogDb::open_in_memory().unwrap();
        let config = IndexerConfig::default();
        index(dir.path(), &db, &config).unwrap();

        write_jpeg(&path, 400, 250);
        let stats = index(dir.path(), &db, &config).unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.skipped, 0);
        assert_eq!(db.photo_count().unwrap(), 1);
    }

    #[test]
    fn progress_callback_invoked_once_per_file() {
        let dir = tempfile::tempdir().unwrap();
        write_jpeg(&dir.path().join("a.jpg"), 100, 100);
        write_jpeg(&dir.path().join("b.jpg"), 100, 100);

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let db = CatalogDb::open_in_memory().unwrap();
        let config = IndexerConfig {
            progress: Some(Arc::new(move |_processed, _total| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        };

        index(dir.path(), &db, &config).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsupported_file_is_not_enumerated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), b"hello").unwrap();
        let db = CatalogDb::open_in_memory().unwrap();
        let stats = index(dir.path(), &db, &IndexerConfig::default()).unwrap();
        assert_eq!(stats.found, 0);
    }
}
