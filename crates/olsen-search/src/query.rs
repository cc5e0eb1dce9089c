//! Executes a `Filter` against the catalog, producing a page of lightweight
//! photo summaries plus pagination metadata, per spec.md §4.8.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use olsen_catalog::CatalogDb;
use rusqlite::params_from_iter;
use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::predicates;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoSummary {
    pub id: i64,
    pub file_path: String,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub date_taken: Option<DateTime<Utc>>,
    pub time_of_day: String,
    pub season: String,
    pub focal_category: String,
    pub shooting_condition: String,
    pub burst_group_id: Option<String>,
    pub burst_sequence: Option<i32>,
    pub burst_count: Option<i32>,
    pub is_burst_representative: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Exposed so the UI can build cache-busted thumbnail URLs.
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub photos: Vec<PhotoSummary>,
    pub total: i64,
    pub has_more: bool,
}

const SUMMARY_COLUMNS: &str = "id, file_path, camera_make, camera_model, date_taken, time_of_day, \
    season, focal_category, shooting_condition, burst_group_id, burst_sequence, burst_count, \
    is_burst_representative, latitude, longitude, indexed_at";

pub fn execute(db: &CatalogDb, filter: &Filter) -> Result<PageResult> {
    let (where_clause, params) = predicates::build(filter, None);
    let where_sql = if where_clause.is_empty() {
        String::new()
    } else {
        format!("WHERE {where_clause}")
    };

    let total = count(db, &where_sql, &params)?;

    let limit = filter.effective_limit();
    let offset = filter.effective_offset();
    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM photos {where_sql} \
         ORDER BY {} {} LIMIT ? OFFSET ?",
        filter.sort_by.column(),
        filter.sort_order.sql(),
    );

    let photos = db.with_connection(|conn| {
        let mut stmt = conn.prepare(&sql).context("failed to prepare query")?;
        let mut all_params: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        all_params.push(&limit);
        all_params.push(&offset);

        let rows = stmt
            .query_map(params_from_iter(all_params), row_to_summary)
            .context("failed to execute query")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })?;

    let has_more = (offset as i64 + photos.len() as i64) < total;
    Ok(PageResult { photos, total, has_more })
}

fn count(db: &CatalogDb, where_sql: &str, params: &predicates::Params) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM photos {where_sql}");
    db.with_connection(|conn| {
        let mut stmt = conn.prepare(&sql).context("failed to prepare count query")?;
        let bound: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let total: i64 = stmt.query_row(params_from_iter(bound), |row| row.get(0))?;
        Ok(total)
    })
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<PhotoSummary> {
    let date_str: Option<String> = row.get(4)?;
    let indexed_str: String = row.get(15)?;
    Ok(PhotoSummary {
        id: row.get(0)?,
        file_path: row.get(1)?,
        camera_make: row.get(2)?,
        camera_model: row.get(3)?,
        date_taken: date_str.and_then(|s| parse_rfc3339(&s)),
        time_of_day: row.get(5)?,
        season: row.get(6)?,
        focal_category: row.get(7)?,
        shooting_condition: row.get(8)?,
        burst_group_id: row.get(9)?,
        burst_sequence: row.get(10)?,
        burst_count: row.get(11)?,
        is_burst_representative: row.get::<_, i64>(12)? != 0,
        latitude: row.get(13)?,
        longitude: row.get(14)?,
        indexed_at: parse_rfc3339(&indexed_str).unwrap_or_else(Utc::now),
    })
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use olsen_catalog::NewPhoto;

    fn seed(db: &CatalogDb, path: &str, make: &str, year: i32) -> i64 {
        let photo = NewPhoto {
            file_path: path.to_string(),
            file_size: 100,
            file_hash: format!("hash-{path}"),
            camera_make: Some(make.to_string()),
            date_taken: Some(chrono::Utc.with_ymd_and_hms(year, 6, 1, 12, 0, 0).unwrap()),
            ..Default::default()
        };
        db.insert_photo(&photo, &[], &[]).unwrap()
    }

    use chrono::TimeZone;

    #[test]
    fn default_filter_returns_everything() {
        let db = CatalogDb::open_in_memory().unwrap();
        seed(&db, "/a.jpg", "Canon", 2023);
        seed(&db, "/b.jpg", "Nikon", 2024);

        let result = execute(&db, &Filter::default()).unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.photos.len(), 2);
        assert!(!result.has_more);
    }

    #[test]
    fn camera_filter_narrows_results() {
        let db = CatalogDb::open_in_memory().unwrap();
        seed(&db, "/a.jpg", "Canon", 2023);
        seed(&db, "/b.jpg", "Nikon", 2024);

        let filter = Filter {
            camera_make: vec!["Canon".to_string()],
            ..Default::default()
        };
        let result = execute(&db, &filter).unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.photos[0].file_path, "/a.jpg");
    }

    #[test]
    fn pagination_reports_has_more() {
        let db = CatalogDb::open_in_memory().unwrap();
        for i in 0..5 {
            seed(&db, &format!("/p{i}.jpg"), "Canon", 2020 + i as i32);
        }

        let filter = Filter { limit: Some(2), offset: Some(0), ..Default::default() };
        let result = execute(&db, &filter).unwrap();
        assert_eq!(result.total, 5);
        assert_eq!(result.photos.len(), 2);
        assert!(result.has_more);

        let filter = Filter { limit: Some(2), offset: Some(4), ..Default::default() };
        let result = execute(&db, &filter).unwrap();
        assert_eq!(result.photos.len(), 1);
        assert!(!result.has_more);
    }

    #[test]
    fn year_sentinel_matches_dateless_photos() {
        let db = CatalogDb::open_in_memory().unwrap();
        let dateless = NewPhoto {
            file_path: "/nodate.jpg".to_string(),
            file_size: 1,
            file_hash: "h".to_string(),
            ..Default::default()
        };
        db.insert_photo(&dateless, &[], &[]).unwrap();
        seed(&db, "/dated.jpg", "Canon", 2024);

        let filter = Filter { year: Some(-1), ..Default::default() };
        let result = execute(&db, &filter).unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.photos[0].file_path, "/nodate.jpg");
    }
}
