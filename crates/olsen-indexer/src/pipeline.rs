//! The per-file pipeline, stage order fixed by spec.md §4.1: hash ->
//! idempotency check -> metadata -> decode -> thumbnail ladder -> color
//! palette -> perceptual hash -> inference -> atomic commit.

use std::path::Path;
use std::time::{Instant, SystemTime};

use chrono::{DateTime, Utc};
use image::{DynamicImage, GenericImageView};

use olsen_catalog::{CatalogDb, NewColorSample, NewPhoto, NewThumbnail, ThumbnailSize};
use olsen_codec::decode::{self, DecodeError, DecodeOutcome};
use olsen_codec::{exif, hash};

use crate::stats::{FileOutcome, FileResult, FileTiming};

pub(crate) fn process_file(
    db: &CatalogDb,
    path: &Path,
    capture_timings: bool,
    capture_thumbnail_diagnostics: bool,
) -> FileResult {
    let started = Instant::now();
    let path_str = path.display().to_string();
    let mut t = Timings::default();

    macro_rules! fail {
        ($err:expr) => {{
            let err_string = $err.to_string();
            log::warn!("indexing failed for {path_str}: {err_string}");
            return FileResult {
                outcome: FileOutcome::Failed,
                thumbnails_generated: 0,
                timing: capture_timings.then(|| t.finish(&path_str, FileOutcome::Failed, started, Some(err_string.clone()))),
                error: Some(err_string),
            };
        }};
    }

    // 1. Hash.
    let stage = Instant::now();
    let file_hash = match hash::hash_file(path) {
        Ok(h) => h,
        Err(e) => fail!(e),
    };
    t.hash_ms = elapsed_ms(stage);

    // 2. Idempotency check.
    let existing = match db.lookup_by_path(&path_str) {
        Ok(v) => v,
        Err(e) => fail!(e),
    };
    let (is_update, existing_id) = match &existing {
        Some((_id, existing_hash)) if *existing_hash == file_hash => {
            // Unchanged: no further work, counted as skipped.
            return FileResult {
                outcome: FileOutcome::Skipped,
                thumbnails_generated: 0,
                timing: capture_timings.then(|| {
                    t.finish(&path_str, FileOutcome::Skipped, started, None)
                }),
                error: None,
            };
        }
        Some((id, _)) => (true, Some(*id)),
        None => (false, None),
    };

    // 3. Metadata.
    let stage = Instant::now();
    let exif_data = exif::read_exif(path);
    let fs_meta = std::fs::metadata(path);
    let file_size = fs_meta.as_ref().map(|m| m.len() as i64).unwrap_or(0);
    let last_modified = fs_meta
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(system_time_to_utc);
    t.metadata_ms = elapsed_ms(stage);

    // 4. Decode.
    let stage = Instant::now();
    let decoded = decode::decode_image(path);
    t.decode_ms = elapsed_ms(stage);

    let img: Option<DynamicImage> = match decoded {
        Ok(DecodeOutcome::Decoded(img)) => Some(img),
        Ok(DecodeOutcome::Unsupported) => None,
        Err(DecodeError::Unsupported(_)) => {
            // RAW file, but this build has no RAW support: metadata-only,
            // not a failure (spec.md §4.1/§4.2's unsupported-vs-failed rule).
            let outcome = commit_metadata_only(
                db,
                &path_str,
                file_size,
                file_hash,
                last_modified,
                &exif_data,
                is_update,
                existing_id,
            );
            return finish_metadata_only(
                outcome,
                FileOutcome::SkippedUnsupported,
                &path_str,
                capture_timings,
                started,
                t,
            );
        }
        Err(DecodeError::Decode { .. }) if decode::is_raw_extension(path) => {
            // The one stage allowed to degrade: RAW decode (including the
            // embedded-JPEG fallback) failed entirely, but the file is still
            // committed with EXIF-derived metadata and no thumbnails.
            log::warn!("RAW decode degraded to metadata-only for {path_str}");
            let outcome = commit_metadata_only(
                db,
                &path_str,
                file_size,
                file_hash,
                last_modified,
                &exif_data,
                is_update,
                existing_id,
            );
            let final_outcome = if is_update { FileOutcome::Updated } else { FileOutcome::Processed };
            return finish_metadata_only(outcome, final_outcome, &path_str, capture_timings, started, t);
        }
        Err(e) => fail!(e),
    };

    let Some(img) = img else { fail!("decoder returned no image and no fallback applies") };

    if is_update {
        if let Some(id) = existing_id {
            if let Err(e) = db.delete_photo(id) {
                fail!(e);
            }
        }
    }

    // 5. Thumbnail ladder.
    let stage = Instant::now();
    let ladder = olsen_thumbnail::build_ladder(&img, &path_str, capture_thumbnail_diagnostics);
    t.thumbnail_ms = elapsed_ms(stage);
    let (built_thumbnails, diagnostics) = match ladder {
        Ok(v) => v,
        Err(e) => fail!(e),
    };
    if let Some(diag) = diagnostics {
        if !diag.warnings.is_empty() {
            log::warn!("thumbnail diagnostics for {path_str}: {:?}", diag.warnings);
        } else {
            log::debug!(
                "thumbnail diagnostics for {path_str}: {}x{} -> {:?}",
                diag.width,
                diag.height,
                diag.sizes_built
            );
        }
    }

    let thumbnails: Vec<NewThumbnail> = built_thumbnails
        .iter()
        .map(|th| NewThumbnail { size: map_size(th.size), data: th.data.clone() })
        .collect();

    // 6. Color palette + 7. Perceptual hash, both from the smallest available
    // thumbnail (spec.md §4.1 stage 6/7's efficiency note) or the original.
    let stage = Instant::now();
    let sample_image = smallest_decoded_thumbnail(&built_thumbnails).unwrap_or_else(|| img.clone());
    let palette = olsen_color::extract_palette(&sample_image);
    t.color_ms = elapsed_ms(stage);

    let stage = Instant::now();
    let phash = olsen_phash::compute_hash(&sample_image);
    t.phash_ms = elapsed_ms(stage);

    // 8. Inference.
    let stage = Instant::now();
    let (width, height) = img.dimensions();
    let time_of_day = olsen_inference::time_of_day(exif_data.date_taken);
    let season = olsen_inference::season(exif_data.date_taken);
    let focal_category = olsen_inference::focal_category(exif_data.focal_length_35mm);
    let shooting_condition = olsen_inference::shooting_condition(exif_data.flash_fired, exif_data.iso);
    t.inference_ms = elapsed_ms(stage);

    let colors: Vec<NewColorSample> = palette
        .iter()
        .map(|c| NewColorSample {
            r: c.rgb.0,
            g: c.rgb.1,
            b: c.rgb.2,
            hue: c.hsl.0 as f64,
            saturation: c.hsl.1 as f64,
            lightness: c.hsl.2 as f64,
            weight: c.weight as f64,
        })
        .collect();

    let new_photo = NewPhoto {
        file_path: path_str.clone(),
        file_size,
        file_hash,
        last_modified,
        perceptual_hash: Some(olsen_phash::hash_to_hex(phash)),
        camera_make: exif_data.camera_make,
        camera_model: exif_data.camera_model,
        lens_make: exif_data.lens_make,
        lens_model: exif_data.lens_model,
        iso: exif_data.iso,
        aperture: exif_data.aperture,
        shutter_speed: exif_data.shutter_speed,
        exposure_compensation: exif_data.exposure_compensation,
        focal_length: exif_data.focal_length,
        focal_length_35mm: exif_data.focal_length_35mm,
        date_taken: exif_data.date_taken,
        date_digitized: exif_data.date_digitized,
        orientation: exif_data.orientation,
        color_space: exif_data.color_space,
        white_balance: exif_data.white_balance,
        flash_fired: exif_data.flash_fired,
        latitude: exif_data.latitude,
        longitude: exif_data.longitude,
        altitude: exif_data.altitude,
        width: Some(width),
        height: Some(height),
        time_of_day,
        season,
        focal_category,
        shooting_condition,
    };

    // 9. Commit.
    let stage = Instant::now();
    let commit = db.insert_photo(&new_photo, &thumbnails, &colors);
    t.commit_ms = elapsed_ms(stage);
    if let Err(e) = commit {
        fail!(e);
    }

    let outcome = if is_update { FileOutcome::Updated } else { FileOutcome::Processed };
    FileResult {
        outcome,
        thumbnails_generated: thumbnails.len(),
        timing: capture_timings.then(|| t.finish(&path_str, outcome, started, None)),
        error: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn commit_metadata_only(
    db: &CatalogDb,
    path_str: &str,
    file_size: i64,
    file_hash: String,
    last_modified: Option<DateTime<Utc>>,
    exif_data: &exif::ExifData,
    is_update: bool,
    existing_id: Option<i64>,
) -> anyhow::Result<()> {
    if is_update {
        if let Some(id) = existing_id {
            db.delete_photo(id)?;
        }
    }

    let new_photo = NewPhoto {
        file_path: path_str.to_string(),
        file_size,
        file_hash,
        last_modified,
        perceptual_hash: None,
        camera_make: exif_data.camera_make.clone(),
        camera_model: exif_data.camera_model.clone(),
        lens_make: exif_data.lens_make.clone(),
        lens_model: exif_data.lens_model.clone(),
        iso: exif_data.iso,
        aperture: exif_data.aperture,
        shutter_speed: exif_data.shutter_speed.clone(),
        exposure_compensation: exif_data.exposure_compensation,
        focal_length: exif_data.focal_length,
        focal_length_35mm: exif_data.focal_length_35mm,
        date_taken: exif_data.date_taken,
        date_digitized: exif_data.date_digitized,
        orientation: exif_data.orientation,
        color_space: exif_data.color_space.clone(),
        white_balance: exif_data.white_balance.clone(),
        flash_fired: exif_data.flash_fired,
        latitude: exif_data.latitude,
        longitude: exif_data.longitude,
        altitude: exif_data.altitude,
        width: exif_data.width,
        height: exif_data.height,
        time_of_day: olsen_inference::time_of_day(exif_data.date_taken),
        season: olsen_inference::season(exif_data.date_taken),
        focal_category: olsen_inference::focal_category(exif_data.focal_length_35mm),
        shooting_condition: olsen_inference::shooting_condition(exif_data.flash_fired, exif_data.iso),
    };

    db.insert_photo(&new_photo, &[], &[]).map(|_| ())
}

fn finish_metadata_only(
    commit: anyhow::Result<()>,
    outcome_on_success: FileOutcome,
    path_str: &str,
    capture_timings: bool,
    started: Instant,
    t: Timings,
) -> FileResult {
    match commit {
        Ok(()) => FileResult {
            outcome: outcome_on_success,
            thumbnails_generated: 0,
            timing: capture_timings.then(|| t.finish(path_str, outcome_on_success, started, None)),
            error: None,
        },
        Err(e) => {
            let msg = e.to_string();
            log::warn!("metadata-only commit failed for {path_str}: {msg}");
            FileResult {
                outcome: FileOutcome::Failed,
                thumbnails_generated: 0,
                timing: capture_timings.then(|| {
                    t.finish(path_str, FileOutcome::Failed, started, Some(msg.clone()))
                }),
                error: Some(msg),
            }
        }
    }
}

fn map_size(tag: olsen_thumbnail::SizeTag) -> ThumbnailSize {
    match tag {
        olsen_thumbnail::SizeTag::Tiny => ThumbnailSize::Tiny,
        olsen_thumbnail::SizeTag::Small => ThumbnailSize::Small,
        olsen_thumbnail::SizeTag::Medium => ThumbnailSize::Medium,
        olsen_thumbnail::SizeTag::Large => ThumbnailSize::Large,
    }
}

/// The ladder is built smallest-first; decode the first (smallest) built
/// thumbnail back into an image for color/phash extraction rather than
/// re-reading the full-resolution source (spec.md §4.1 stage 6's efficiency
/// note).
fn smallest_decoded_thumbnail(built: &[olsen_thumbnail::BuiltThumbnail]) -> Option<DynamicImage> {
    let smallest = built.iter().min_by_key(|t| t.size.target_edge())?;
    image::load_from_memory(&smallest.data).ok()
}

fn system_time_to_utc(t: SystemTime) -> Option<DateTime<Utc>> {
    t.duration_since(std::time::UNIX_EPOCH)
        .ok()
        .and_then(|d| DateTime::from_timestamp(d.as_secs() as i64, d.subsec_nanos()))
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

#[derive(Default, Clone, Copy)]
struct Timings {
    hash_ms: u64,
    metadata_ms: u64,
    decode_ms: u64,
    thumbnail_ms: u64,
    color_ms: u64,
    phash_ms: u64,
    inference_ms: u64,
    commit_ms: u64,
}

impl Timings {
    fn finish(self, path: &str, outcome: FileOutcome, started: Instant, error: Option<String>) -> FileTiming {
        FileTiming {
            path: path.to_string(),
            outcome,
            hash_ms: self.hash_ms,
            metadata_ms: self.metadata_ms,
            decode_ms: self.decode_ms,
            thumbnail_ms: self.thumbnail_ms,
            color_ms: self.color_ms,
            phash_ms: self.phash_ms,
            inference_ms: self.inference_ms,
            commit_ms: self.commit_ms,
            total_ms: elapsed_ms(started),
            error,
        }
    }
}
