//! Burst-group clustering, per spec.md §4.7.
//!
//! The catalog-facing entry point, [`BurstDetector::scan`], always runs the
//! canonical temporal/camera/focal-length heuristic against
//! `photos.date_taken` ordering. [`BurstDetector::detect_native`] is a
//! supplementary strategy for inputs that carry a camera-native burst-group
//! id in EXIF, kept for callers that have that data available.

use anyhow::Result;
use chrono::{DateTime, Utc};
use olsen_catalog::{BurstAssignment, BurstGroupRecord, BurstScanRow, CatalogDb};
use std::collections::HashMap;

const MAX_GAP_SECONDS: i64 = 2;
const MAX_FOCAL_DELTA_MM: f64 = 5.0;
const MIN_BURST_SIZE: usize = 3;

pub struct BurstDetector;

impl BurstDetector {
    /// Run the canonical scan against the catalog and persist the result.
    /// Idempotent: re-running recomputes bursts from scratch.
    pub fn scan(db: &CatalogDb) -> Result<(Vec<BurstGroupRecord>, Vec<BurstAssignment>)> {
        let rows = db.scan_for_burst()?;
        let (groups, assignments) = scan_rows(&rows);
        db.write_burst_groups(&groups, &assignments)?;
        Ok((groups, assignments))
    }

    /// A single photo carrying a camera-native burst-group id, for callers
    /// whose EXIF extraction surfaces that field (most cameras don't).
    pub fn detect_native(images: Vec<NativeBurstImage>) -> Vec<NativeBurstGroup> {
        let mut groups: HashMap<u64, Vec<NativeBurstImage>> = HashMap::new();
        for image in images {
            if let Some(id) = image.native_burst_group_id {
                groups.entry(id).or_default().push(image);
            }
        }

        let mut result: Vec<NativeBurstGroup> = groups
            .into_iter()
            .filter(|(_, members)| members.len() >= 2)
            .map(|(native_id, mut members)| {
                members.sort_by_key(|m| m.capture_time);
                NativeBurstGroup { native_id, photo_ids: members.iter().map(|m| m.photo_id).collect() }
            })
            .collect();

        result.sort_by_key(|g| g.native_id);
        result
    }
}

#[derive(Debug, Clone)]
pub struct NativeBurstImage {
    pub photo_id: i64,
    pub capture_time: DateTime<Utc>,
    pub native_burst_group_id: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct NativeBurstGroup {
    pub native_id: u64,
    pub photo_ids: Vec<i64>,
}

/// The canonical greedy, non-overlapping scan: walk the date-ordered
/// sequence, extend a candidate burst while consecutive photos satisfy the
/// temporal/camera/focal-length predicates, accept candidates of size >= 3.
pub fn scan_rows(rows: &[BurstScanRow]) -> (Vec<BurstGroupRecord>, Vec<BurstAssignment>) {
    let mut groups = Vec::new();
    let mut assignments = Vec::new();

    let mut i = 0;
    while i < rows.len() {
        let mut j = i;
        while j + 1 < rows.len() && extends(&rows[j], &rows[j + 1]) {
            j += 1;
        }

        let size = j - i + 1;
        if size >= MIN_BURST_SIZE {
            let members = &rows[i..=j];
            let first = &members[0];
            let last = &members[members.len() - 1];
            let group_id = format!("burst-{}", first.photo_id);
            let time_span = (last.date_taken - first.date_taken).num_milliseconds() as f64 / 1000.0;

            groups.push(BurstGroupRecord {
                id: group_id.clone(),
                photo_count: size as i32,
                date_taken: Some(first.date_taken),
                camera_make: first.camera_make.clone(),
                camera_model: first.camera_model.clone(),
                representative_photo_id: first.photo_id,
                time_span_seconds: time_span,
                created_at: Utc::now(),
            });

            for (seq, member) in members.iter().enumerate() {
                assignments.push(BurstAssignment {
                    photo_id: member.photo_id,
                    group_id: group_id.clone(),
                    sequence: seq as i32,
                    count: size as i32,
                    is_representative: seq == 0,
                });
            }

            i = j + 1;
        } else {
            i += 1;
        }
    }

    (groups, assignments)
}

fn extends(last: &BurstScanRow, next: &BurstScanRow) -> bool {
    let delta_seconds = (next.date_taken - last.date_taken).num_milliseconds() as f64 / 1000.0;
    if delta_seconds <= 0.0 || delta_seconds > MAX_GAP_SECONDS as f64 {
        return false;
    }
    if last.camera_make != next.camera_make || last.camera_model != next.camera_model {
        return false;
    }
    match (last.focal_length, next.focal_length) {
        (Some(a), Some(b)) => (a - b).abs() <= MAX_FOCAL_DELTA_MM,
        (None, None) => true,
        _ => false,
    }
}
