//! Catalog database handle.
//!
//! A single SQLite file holds the whole library: photos, their thumbnails, their
//! color samples, and burst groups. WAL mode lets readers (the query/facet engine)
//! and the writer (the indexer) avoid blocking each other at the OS level; in-process
//! access to the one `Connection` is still serialized behind a `Mutex`, following
//! `session-db`'s single-connection-per-handle design.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::records::{
    BurstGroupRecord, BurstScanRow, ColorSampleRecord, NewColorSample, NewPhoto, NewThumbnail,
    PhotoRecord, ThumbnailSize,
};
use crate::schema::{CREATE_TABLES_SQL, SCHEMA_VERSION};

/// Catalog database handle. Cheap to clone behind an `Arc` — the underlying
/// connection is guarded by a mutex so the handle itself is `Send + Sync`.
pub struct CatalogDb {
    conn: Mutex<Connection>,
    path: PathBuf,
}

/// One photo's burst linkage, as written by the burst detector's batch pass.
#[derive(Debug, Clone)]
pub struct BurstAssignment {
    pub photo_id: i64,
    pub group_id: String,
    pub sequence: i32,
    pub count: i32,
    pub is_representative: bool,
}

impl CatalogDb {
    /// Open (creating if necessary) a catalog database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create catalog directory {}", parent.display()))?;
            }
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("failed to open catalog database {}", path.display()))?;
        Self::init(conn, path)
    }

    /// Open an in-memory catalog, used by tests and by one-shot tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory catalog")?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    /// Default catalog location: `~/.olsen/catalog.db`, following `session-db`'s
    /// `~/.projectloupe/cache/...` convention.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".olsen")
            .join("catalog.db")
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(CREATE_TABLES_SQL)?;

        let db = Self {
            conn: Mutex::new(conn),
            path,
        };
        db.check_schema_version()?;
        Ok(db)
    }

    fn check_schema_version(&self) -> Result<()> {
        let conn = self.lock();
        let existing: Option<String> = conn
            .query_row(
                "SELECT value FROM catalog_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            None => {
                conn.execute(
                    "INSERT INTO catalog_meta (key, value) VALUES ('schema_version', ?1)",
                    params![SCHEMA_VERSION.to_string()],
                )?;
                Ok(())
            }
            Some(v) => {
                let found: i64 = v.parse().unwrap_or(0);
                if found != SCHEMA_VERSION {
                    anyhow::bail!(
                        "catalog at {} has schema version {found}, expected {SCHEMA_VERSION}",
                        self.path.display()
                    );
                }
                Ok(())
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Expose the guarded connection for read-only query building (the query/
    /// facet engine lives in a different crate and needs arbitrary parameterized
    /// `SELECT`s over `photos`/`photo_colors`).
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock();
        f(&conn)
    }

    // -- Idempotency / lookup --------------------------------------------------

    /// Look up an existing photo by file path, returning (id, file_hash) if present.
    pub fn lookup_by_path(&self, file_path: &str) -> Result<Option<(i64, String)>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, file_hash FROM photos WHERE file_path = ?1",
            params![file_path],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .context("failed to look up photo by path")
    }

    /// Delete a photo and its dependent rows (thumbnails, colors cascade via FK).
    pub fn delete_photo(&self, id: i64) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM photos WHERE id = ?1", params![id])
            .with_context(|| format!("failed to delete photo {id}"))?;
        Ok(())
    }

    // -- Insert -----------------------------------------------------------------

    /// Insert a photo together with its thumbnails and color samples in a single
    /// transaction (spec.md §3's lifecycle invariant). Returns the assigned id.
    pub fn insert_photo(
        &self,
        photo: &NewPhoto,
        thumbnails: &[NewThumbnail],
        colors: &[NewColorSample],
    ) -> Result<i64> {
        let mut conn = self.lock();
        let tx = conn.transaction().context("failed to begin insert transaction")?;
        let now = Utc::now();

        tx.execute(
            "INSERT INTO photos (
                file_path, file_hash, file_size, date_taken, date_digitized,
                last_modified, indexed_at, camera_make, camera_model, lens_make,
                lens_model, iso, aperture, shutter_speed, exposure_compensation,
                focal_length, focal_length_35mm, width, height, orientation,
                color_space, white_balance, flash_fired, latitude, longitude,
                altitude, perceptual_hash, time_of_day, season, focal_category,
                shooting_condition
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31
            )",
            params![
                photo.file_path,
                photo.file_hash,
                photo.file_size,
                photo.date_taken.map(|d| d.to_rfc3339()),
                photo.date_digitized.map(|d| d.to_rfc3339()),
                photo.last_modified.map(|d| d.to_rfc3339()),
                now.to_rfc3339(),
                photo.camera_make,
                photo.camera_model,
                photo.lens_make,
                photo.lens_model,
                photo.iso,
                photo.aperture,
                photo.shutter_speed,
                photo.exposure_compensation,
                photo.focal_length,
                photo.focal_length_35mm,
                photo.width,
                photo.height,
                photo.orientation,
                photo.color_space,
                photo.white_balance,
                photo.flash_fired.map(|b| b as i32),
                photo.latitude,
                photo.longitude,
                photo.altitude,
                photo.perceptual_hash,
                photo.time_of_day,
                photo.season,
                photo.focal_category,
                photo.shooting_condition,
            ],
        )?;

        let photo_id = tx.last_insert_rowid();

        for thumb in thumbnails {
            tx.execute(
                "INSERT INTO thumbnails (photo_id, size, data) VALUES (?1, ?2, ?3)",
                params![photo_id, thumb.size.tag(), thumb.data],
            )?;
        }

        for color in colors {
            tx.execute(
                "INSERT INTO photo_colors (photo_id, r, g, b, hue, saturation, lightness, weight)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    photo_id, color.r, color.g, color.b, color.hue, color.saturation,
                    color.lightness, color.weight
                ],
            )?;
        }

        tx.commit().context("failed to commit photo insert transaction")?;
        Ok(photo_id)
    }

    // -- Read ---------------------------------------------------------------

    pub fn get_photo(&self, id: i64) -> Result<Option<PhotoRecord>> {
        let conn = self.lock();
        conn.query_row(&format!("{SELECT_PHOTO_COLUMNS} WHERE id = ?1"), params![id], row_to_photo)
            .optional()
            .context("failed to load photo")
    }

    pub fn get_thumbnail(&self, photo_id: i64, size: ThumbnailSize) -> Result<Option<Vec<u8>>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT data FROM thumbnails WHERE photo_id = ?1 AND size = ?2",
            params![photo_id, size.tag()],
            |row| row.get(0),
        )
        .optional()
        .context("failed to load thumbnail")
    }

    pub fn get_colors(&self, photo_id: i64) -> Result<Vec<ColorSampleRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT photo_id, r, g, b, hue, saturation, lightness, weight
             FROM photo_colors WHERE photo_id = ?1",
        )?;
        let rows = stmt.query_map(params![photo_id], |row| {
            Ok(ColorSampleRecord {
                photo_id: row.get(0)?,
                r: row.get(1)?,
                g: row.get(2)?,
                b: row.get(3)?,
                hue: row.get(4)?,
                saturation: row.get(5)?,
                lightness: row.get(6)?,
                weight: row.get(7)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn photo_count(&self) -> Result<i64> {
        let conn = self.lock();
        conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))
            .context("failed to count photos")
    }

    // -- Burst detection support ----------------------------------------------

    /// Every photo with a non-null capture date, ordered ascending — the scan
    /// order spec.md §4.7 requires.
    pub fn scan_for_burst(&self) -> Result<Vec<BurstScanRow>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, date_taken, camera_make, camera_model, focal_length
             FROM photos WHERE date_taken IS NOT NULL ORDER BY date_taken ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let date_str: String = row.get(1)?;
            Ok((
                row.get::<_, i64>(0)?,
                date_str,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<f64>>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (photo_id, date_str, camera_make, camera_model, focal_length) = row?;
            let Some(date_taken) = parse_rfc3339(&date_str) else {
                continue;
            };
            out.push(BurstScanRow {
                photo_id,
                date_taken,
                camera_make,
                camera_model,
                focal_length,
            });
        }
        Ok(out)
    }

    /// Replace all burst linkage and burst_groups rows in one transaction —
    /// idempotent: re-running burst detection always starts from a clean slate.
    pub fn write_burst_groups(
        &self,
        groups: &[BurstGroupRecord],
        assignments: &[BurstAssignment],
    ) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction().context("failed to begin burst-write transaction")?;

        tx.execute(
            "UPDATE photos SET burst_group_id = NULL, burst_sequence = NULL,
                burst_count = NULL, is_burst_representative = 0",
            [],
        )?;
        tx.execute("DELETE FROM burst_groups", [])?;

        for group in groups {
            tx.execute(
                "INSERT INTO burst_groups (
                    id, photo_count, date_taken, camera_make, camera_model,
                    representative_photo_id, time_span_seconds, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    group.id,
                    group.photo_count,
                    group.date_taken.map(|d| d.to_rfc3339()),
                    group.camera_make,
                    group.camera_model,
                    group.representative_photo_id,
                    group.time_span_seconds,
                    group.created_at.to_rfc3339(),
                ],
            )?;
        }

        for a in assignments {
            tx.execute(
                "UPDATE photos SET burst_group_id = ?1, burst_sequence = ?2,
                    burst_count = ?3, is_burst_representative = ?4 WHERE id = ?5",
                params![a.group_id, a.sequence, a.count, a.is_representative as i32, a.photo_id],
            )?;
        }

        tx.commit().context("failed to commit burst-write transaction")
    }
}

const SELECT_PHOTO_COLUMNS: &str = "SELECT
    id, file_path, file_hash, file_size, date_taken, date_digitized, last_modified,
    indexed_at, camera_make, camera_model, lens_make, lens_model, iso, aperture,
    shutter_speed, exposure_compensation, focal_length, focal_length_35mm, width,
    height, orientation, color_space, white_balance, flash_fired, latitude,
    longitude, altitude, perceptual_hash, time_of_day, season, focal_category,
    shooting_condition, burst_group_id, burst_sequence, burst_count,
    is_burst_representative
    FROM photos";

pub(crate) fn row_to_photo(row: &rusqlite::Row) -> rusqlite::Result<PhotoRecord> {
    Ok(PhotoRecord {
        id: row.get(0)?,
        file_path: row.get(1)?,
        file_hash: row.get(2)?,
        file_size: row.get(3)?,
        date_taken: row.get::<_, Option<String>>(4)?.and_then(|s| parse_rfc3339(&s)),
        date_digitized: row.get::<_, Option<String>>(5)?.and_then(|s| parse_rfc3339(&s)),
        last_modified: row.get::<_, Option<String>>(6)?.and_then(|s| parse_rfc3339(&s)),
        indexed_at: parse_rfc3339(&row.get::<_, String>(7)?).unwrap_or_else(Utc::now),
        camera_make: row.get(8)?,
        camera_model: row.get(9)?,
        lens_make: row.get(10)?,
        lens_model: row.get(11)?,
        iso: row.get(12)?,
        aperture: row.get(13)?,
        shutter_speed: row.get(14)?,
        exposure_compensation: row.get(15)?,
        focal_length: row.get(16)?,
        focal_length_35mm: row.get(17)?,
        width: row.get(18)?,
        height: row.get(19)?,
        orientation: row.get(20)?,
        color_space: row.get(21)?,
        white_balance: row.get(22)?,
        flash_fired: row.get::<_, Option<i32>>(23)?.map(|v| v != 0),
        latitude: row.get(24)?,
        longitude: row.get(25)?,
        altitude: row.get(26)?,
        perceptual_hash: row.get(27)?,
        time_of_day: row.get(28)?,
        season: row.get(29)?,
        focal_category: row.get(30)?,
        shooting_condition: row.get(31)?,
        burst_group_id: row.get(32)?,
        burst_sequence: row.get(33)?,
        burst_count: row.get(34)?,
        is_burst_representative: row.get::<_, i32>(35)? != 0,
    })
}

pub(crate) fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
        .or_else(|| Utc.datetime_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ThumbnailSize;

    fn sample_photo(path: &str) -> NewPhoto {
        NewPhoto {
            file_path: path.to_string(),
            file_size: 1024,
            file_hash: format!("hash-{path}"),
            date_taken: Some(Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()),
            camera_make: Some("Canon".to_string()),
            camera_model: Some("EOS R5".to_string()),
            iso: Some(400),
            width: Some(6000),
            height: Some(4000),
            time_of_day: "morning".to_string(),
            season: "summer".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn insert_and_fetch_roundtrip() {
        let db = CatalogDb::open_in_memory().unwrap();
        let photo = sample_photo("/photos/a.jpg");
        let thumbs = vec![NewThumbnail {
            size: ThumbnailSize::Tiny,
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
        }];
        let colors = vec![NewColorSample {
            r: 200,
            g: 100,
            b: 50,
            hue: 20.0,
            saturation: 60.0,
            lightness: 50.0,
            weight: 1.0,
        }];

        let id = db.insert_photo(&photo, &thumbs, &colors).unwrap();
        let loaded = db.get_photo(id).unwrap().unwrap();
        assert_eq!(loaded.file_path, "/photos/a.jpg");
        assert_eq!(loaded.camera_make.as_deref(), Some("Canon"));

        let thumb = db.get_thumbnail(id, ThumbnailSize::Tiny).unwrap().unwrap();
        assert_eq!(thumb, vec![0xFF, 0xD8, 0xFF, 0xD9]);

        let colors = db.get_colors(id).unwrap();
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].weight, 1.0);
    }

    #[test]
    fn lookup_by_path_idempotency() {
        let db = CatalogDb::open_in_memory().unwrap();
        let photo = sample_photo("/photos/b.jpg");
        let id = db.insert_photo(&photo, &[], &[]).unwrap();

        let (found_id, found_hash) = db.lookup_by_path("/photos/b.jpg").unwrap().unwrap();
        assert_eq!(found_id, id);
        assert_eq!(found_hash, photo.file_hash);

        assert!(db.lookup_by_path("/photos/missing.jpg").unwrap().is_none());
    }

    #[test]
    fn delete_cascades_to_thumbnails_and_colors() {
        let db = CatalogDb::open_in_memory().unwrap();
        let photo = sample_photo("/photos/c.jpg");
        let thumbs = vec![NewThumbnail {
            size: ThumbnailSize::Tiny,
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
        }];
        let id = db.insert_photo(&photo, &thumbs, &[]).unwrap();

        db.delete_photo(id).unwrap();
        assert!(db.get_photo(id).unwrap().is_none());
        assert!(db.get_thumbnail(id, ThumbnailSize::Tiny).unwrap().is_none());
    }

    #[test]
    fn scan_for_burst_orders_by_date() {
        let db = CatalogDb::open_in_memory().unwrap();
        let mut p1 = sample_photo("/p1.jpg");
        p1.date_taken = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 10).unwrap());
        let mut p2 = sample_photo("/p2.jpg");
        p2.date_taken = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        db.insert_photo(&p1, &[], &[]).unwrap();
        db.insert_photo(&p2, &[], &[]).unwrap();

        let rows = db.scan_for_burst().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].date_taken < rows[1].date_taken);
    }

    #[test]
    fn write_burst_groups_is_idempotent() {
        let db = CatalogDb::open_in_memory().unwrap();
        let photo = sample_photo("/p1.jpg");
        let id = db.insert_photo(&photo, &[], &[]).unwrap();

        let group = BurstGroupRecord {
            id: "burst_0".to_string(),
            photo_count: 1,
            date_taken: photo.date_taken,
            camera_make: photo.camera_make.clone(),
            camera_model: photo.camera_model.clone(),
            representative_photo_id: id,
            time_span_seconds: 0.0,
            created_at: Utc::now(),
        };
        let assignment = BurstAssignment {
            photo_id: id,
            group_id: "burst_0".to_string(),
            sequence: 0,
            count: 1,
            is_representative: true,
        };

        db.write_burst_groups(&[group.clone()], &[assignment.clone()]).unwrap();
        let loaded = db.get_photo(id).unwrap().unwrap();
        assert_eq!(loaded.burst_group_id.as_deref(), Some("burst_0"));
        assert!(loaded.is_burst_representative);

        // Re-running with no groups clears linkage.
        db.write_burst_groups(&[], &[]).unwrap();
        let loaded = db.get_photo(id).unwrap().unwrap();
        assert_eq!(loaded.burst_group_id, None);
        assert!(!loaded.is_burst_representative);
    }
}
