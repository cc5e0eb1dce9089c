//! Per-dimension facet counting, per spec.md §4.9. The counting rule is the
//! load-bearing invariant: a dimension's counts are computed with that
//! dimension's own fields cleared but every other active filter preserved.

use anyhow::{Context, Result};
use olsen_catalog::CatalogDb;
use rusqlite::params_from_iter;
use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::predicates::{self, FacetDimension};
use crate::url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetValue {
    pub value: String,
    pub label: String,
    pub count: i64,
    pub selected: bool,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacetCollection {
    pub camera: Vec<FacetValue>,
    pub lens: Vec<FacetValue>,
    pub year: Vec<FacetValue>,
    pub month: Vec<FacetValue>,
    pub time_of_day: Vec<FacetValue>,
    pub season: Vec<FacetValue>,
    pub focal_category: Vec<FacetValue>,
    pub shooting_condition: Vec<FacetValue>,
    pub in_burst: Vec<FacetValue>,
    pub color: Vec<FacetValue>,
}

const TIME_OF_DAY_ORDER: [&str; 7] = [
    "golden_hour_morning", "morning", "midday", "afternoon", "golden_hour_evening", "blue_hour",
    "night",
];
const SEASON_ORDER: [&str; 4] = ["spring", "summer", "autumn", "winter"];
const FOCAL_CATEGORY_ORDER: [&str; 4] = ["wide", "normal", "telephoto", "super_telephoto"];
const SHOOTING_CONDITION_ORDER: [&str; 3] = ["bright", "moderate", "low_light"];
const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

pub fn compute(db: &CatalogDb, filter: &Filter) -> Result<FacetCollection> {
    Ok(FacetCollection {
        camera: camera_facet(db, filter)?,
        lens: lens_facet(db, filter)?,
        year: year_facet(db, filter)?,
        month: month_facet(db, filter)?,
        time_of_day: ordered_facet(
            db,
            filter,
            FacetDimension::TimeOfDay,
            "time_of_day",
            &TIME_OF_DAY_ORDER,
            |f, v| {
                let mut f = f.clone();
                f.time_of_day = vec![v.to_string()];
                f
            },
            |f| f.time_of_day.clone(),
        )?,
        season: ordered_facet(
            db,
            filter,
            FacetDimension::Season,
            "season",
            &SEASON_ORDER,
            |f, v| {
                let mut f = f.clone();
                f.season = vec![v.to_string()];
                f
            },
            |f| f.season.clone(),
        )?,
        focal_category: ordered_facet(
            db,
            filter,
            FacetDimension::FocalCategory,
            "focal_category",
            &FOCAL_CATEGORY_ORDER,
            |f, v| {
                let mut f = f.clone();
                f.focal_category = vec![v.to_string()];
                f
            },
            |f| f.focal_category.clone(),
        )?,
        shooting_condition: ordered_facet(
            db,
            filter,
            FacetDimension::ShootingCondition,
            "shooting_condition",
            &SHOOTING_CONDITION_ORDER,
            |f, v| {
                let mut f = f.clone();
                f.shooting_condition = vec![v.to_string()];
                f
            },
            |f| f.shooting_condition.clone(),
        )?,
        in_burst: in_burst_facet(db, filter)?,
        color: color_facet(db, filter)?,
    })
}

fn count_with(db: &CatalogDb, filter: &Filter, omit: FacetDimension, group_expr: &str) -> Result<Vec<(Option<String>, i64)>> {
    let (where_clause, params) = predicates::build(filter, Some(omit));
    let where_sql = if where_clause.is_empty() { String::new() } else { format!("WHERE {where_clause}") };
    let sql = format!(
        "SELECT {group_expr} AS bucket, COUNT(*) FROM photos {where_sql} GROUP BY bucket ORDER BY COUNT(*) DESC"
    );
    db.with_connection(|conn| {
        let mut stmt = conn.prepare(&sql).context("failed to prepare facet query")?;
        let bound: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_from_iter(bound), |row| {
            Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
}

fn camera_facet(db: &CatalogDb, filter: &Filter) -> Result<Vec<FacetValue>> {
    let (where_clause, params) = predicates::build(filter, Some(FacetDimension::Camera));
    let where_sql = if where_clause.is_empty() {
        "WHERE camera_make IS NOT NULL AND camera_model IS NOT NULL".to_string()
    } else {
        format!("WHERE {where_clause} AND camera_make IS NOT NULL AND camera_model IS NOT NULL")
    };
    let sql = format!(
        "SELECT camera_make, camera_model, COUNT(*) FROM photos {where_sql} \
         GROUP BY camera_make, camera_model ORDER BY COUNT(*) DESC LIMIT 50"
    );
    let rows: Vec<(String, String, i64)> = db.with_connection(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let bound: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_from_iter(bound), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })?;

    Ok(rows
        .into_iter()
        .map(|(make, model, count)| {
            let selected =
                filter.camera_make == vec![make.clone()] && filter.camera_model == vec![model.clone()];
            let mut next = filter.clone();
            if selected {
                next.camera_make.clear();
                next.camera_model.clear();
            } else {
                next.camera_make = vec![make.clone()];
                next.camera_model = vec![model.clone()];
            }
            FacetValue {
                value: format!("{make}|{model}"),
                label: format!("{make} {model}"),
                count,
                selected,
                url: url::render(&next),
            }
        })
        .collect())
}

fn lens_facet(db: &CatalogDb, filter: &Filter) -> Result<Vec<FacetValue>> {
    let (where_clause, params) = predicates::build(filter, Some(FacetDimension::Lens));
    let where_sql = if where_clause.is_empty() {
        "WHERE lens_model IS NOT NULL".to_string()
    } else {
        format!("WHERE {where_clause} AND lens_model IS NOT NULL")
    };
    let sql = format!(
        "SELECT lens_model, COUNT(*) FROM photos {where_sql} GROUP BY lens_model ORDER BY COUNT(*) DESC LIMIT 30"
    );
    let rows: Vec<(String, i64)> = db.with_connection(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let bound: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_from_iter(bound), |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })?;

    Ok(rows
        .into_iter()
        .map(|(model, count)| {
            let selected = filter.lens_model == vec![model.clone()];
            let mut next = filter.clone();
            if selected {
                next.lens_model.clear();
            } else {
                next.lens_model = vec![model.clone()];
            }
            FacetValue { value: model.clone(), label: model, count, selected, url: url::render(&next) }
        })
        .collect())
}

fn year_facet(db: &CatalogDb, filter: &Filter) -> Result<Vec<FacetValue>> {
    let mut rows = count_with(db, filter, FacetDimension::Year, "strftime('%Y', date_taken)")?;
    rows.sort_by(|a, b| match (&a.0, &b.0) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (Some(_), None) => std::cmp::Ordering::Less,
        (Some(x), Some(y)) => y.cmp(x),
    });

    Ok(rows
        .into_iter()
        .map(|(year_str, count)| {
            let (value, label, year_value) = match &year_str {
                Some(y) => (y.clone(), y.clone(), y.parse::<i32>().ok()),
                None => ("unknown".to_string(), "Unknown".to_string(), Some(-1)),
            };
            let selected = filter.year == year_value;
            let mut next = filter.clone();
            next.year = if selected { None } else { year_value };
            FacetValue { value, label, count, selected, url: url::render(&next) }
        })
        .collect())
}

fn month_facet(db: &CatalogDb, filter: &Filter) -> Result<Vec<FacetValue>> {
    // Only populated when a specific year is currently selected.
    if !matches!(filter.year, Some(y) if y != -1) {
        return Ok(Vec::new());
    }

    let rows = count_with(db, filter, FacetDimension::Month, "strftime('%m', date_taken)")?;
    let mut by_month: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
    for (month_str, count) in rows.into_iter().flatten_pairs() {
        by_month.insert(month_str, count);
    }

    let mut out = Vec::new();
    for m in 1..=12u32 {
        let key = format!("{m:02}");
        let Some(&count) = by_month.get(&key) else { continue };
        let selected = filter.month == Some(m);
        let mut next = filter.clone();
        next.month = if selected { None } else { Some(m) };
        out.push(FacetValue {
            value: key,
            label: MONTH_NAMES[(m - 1) as usize].to_string(),
            count,
            selected,
            url: url::render(&next),
        });
    }
    Ok(out)
}

trait FlattenPairs {
    fn flatten_pairs(self) -> Vec<(String, i64)>;
}

impl FlattenPairs for Vec<(Option<String>, i64)> {
    fn flatten_pairs(self) -> Vec<(String, i64)> {
        self.into_iter().filter_map(|(k, v)| k.map(|k| (k, v))).collect()
    }
}

#[allow(clippy::too_many_arguments)]
fn ordered_facet(
    db: &CatalogDb,
    filter: &Filter,
    dimension: FacetDimension,
    column: &str,
    order: &[&str],
    with_value: impl Fn(&Filter, &str) -> Filter,
    current: impl Fn(&Filter) -> Vec<String>,
) -> Result<Vec<FacetValue>> {
    let rows = count_with(db, filter, dimension, column)?;
    let counts: std::collections::HashMap<String, i64> = rows.into_iter().flatten_pairs().collect();

    Ok(order
        .iter()
        .filter_map(|&value| {
            let count = *counts.get(value)?;
            let selected = current(filter) == vec![value.to_string()];
            let next = if selected {
                let mut f = filter.clone();
                // Clearing relies on `with_value` always producing a
                // single-element vec; clear by constructing from scratch.
                match dimension {
                    FacetDimension::TimeOfDay => f.time_of_day.clear(),
                    FacetDimension::Season => f.season.clear(),
                    FacetDimension::FocalCategory => f.focal_category.clear(),
                    FacetDimension::ShootingCondition => f.shooting_condition.clear(),
                    _ => {}
                }
                f
            } else {
                with_value(filter, value)
            };
            Some(FacetValue {
                value: value.to_string(),
                label: value.to_string(),
                count,
                selected,
                url: url::render(&next),
            })
        })
        .collect())
}

fn in_burst_facet(db: &CatalogDb, filter: &Filter) -> Result<Vec<FacetValue>> {
    let mut yes_filter = filter.clone();
    yes_filter.in_burst = Some(true);
    let (yes_where, yes_params) = predicates::build(&yes_filter, None);
    let yes_count = scalar_count(db, &yes_where, &yes_params)?;

    let mut no_filter = filter.clone();
    no_filter.in_burst = Some(false);
    let (no_where, no_params) = predicates::build(&no_filter, None);
    let no_count = scalar_count(db, &no_where, &no_params)?;

    let mut next_yes = filter.clone();
    next_yes.in_burst = if filter.in_burst == Some(true) { None } else { Some(true) };
    let mut next_no = filter.clone();
    next_no.in_burst = if filter.in_burst == Some(false) { None } else { Some(false) };

    Ok(vec![
        FacetValue {
            value: "yes".to_string(),
            label: "In a burst".to_string(),
            count: yes_count,
            selected: filter.in_burst == Some(true),
            url: url::render(&next_yes),
        },
        FacetValue {
            value: "no".to_string(),
            label: "Not in a burst".to_string(),
            count: no_count,
            selected: filter.in_burst == Some(false),
            url: url::render(&next_no),
        },
    ])
}

fn scalar_count(db: &CatalogDb, where_clause: &str, params: &predicates::Params) -> Result<i64> {
    let where_sql = if where_clause.is_empty() { String::new() } else { format!("WHERE {where_clause}") };
    let sql = format!("SELECT COUNT(*) FROM photos {where_sql}");
    db.with_connection(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let bound: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        Ok(stmt.query_row(params_from_iter(bound), |row| row.get(0))?)
    })
}

const COLOR_CASE_EXPR: &str = "
CASE
  WHEN photo_colors.saturation < 5 AND photo_colors.lightness < 20 THEN 'black'
  WHEN photo_colors.saturation < 5 AND photo_colors.lightness > 80 THEN 'white'
  WHEN photo_colors.saturation < 10 THEN 'gray'
  WHEN photo_colors.saturation < 15 THEN 'bw'
  WHEN photo_colors.hue BETWEEN 20 AND 40 AND photo_colors.lightness < 50 THEN 'brown'
  WHEN photo_colors.hue <= 15 OR photo_colors.hue >= 345 THEN 'red'
  WHEN photo_colors.hue BETWEEN 16 AND 45 THEN 'orange'
  WHEN photo_colors.hue BETWEEN 46 AND 75 THEN 'yellow'
  WHEN photo_colors.hue BETWEEN 76 AND 165 THEN 'green'
  WHEN photo_colors.hue BETWEEN 166 AND 255 THEN 'blue'
  WHEN photo_colors.hue BETWEEN 256 AND 290 THEN 'purple'
  WHEN photo_colors.hue BETWEEN 291 AND 344 THEN 'pink'
  ELSE 'other'
END";

fn color_facet(db: &CatalogDb, filter: &Filter) -> Result<Vec<FacetValue>> {
    let (where_clause, params) = predicates::build(filter, Some(FacetDimension::Color));
    let where_sql = if where_clause.is_empty() { String::new() } else { format!("AND {where_clause}") };
    let sql = format!(
        "SELECT {COLOR_CASE_EXPR} AS bucket, COUNT(DISTINCT photo_colors.photo_id) \
         FROM photo_colors JOIN photos ON photos.id = photo_colors.photo_id \
         WHERE 1=1 {where_sql} GROUP BY bucket ORDER BY COUNT(DISTINCT photo_colors.photo_id) DESC"
    );
    let rows: Vec<(String, i64)> = db.with_connection(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let bound: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_from_iter(bound), |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })?;

    Ok(rows
        .into_iter()
        .map(|(name, count)| {
            let selected = filter.color_name.contains(&name);
            let mut next = filter.clone();
            if selected {
                next.color_name.retain(|c| c != &name);
            } else {
                next.color_name.push(name.clone());
            }
            FacetValue { value: name.clone(), label: name, count, selected, url: url::render(&next) }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use olsen_catalog::NewPhoto;

    fn seed(db: &CatalogDb, path: &str, make: &str, model: &str, year: i32, month: u32) {
        let photo = NewPhoto {
            file_path: path.to_string(),
            file_size: 10,
            file_hash: format!("h-{path}"),
            camera_make: Some(make.to_string()),
            camera_model: Some(model.to_string()),
            date_taken: Some(chrono::Utc.with_ymd_and_hms(year, month, 1, 12, 0, 0).unwrap()),
            ..Default::default()
        };
        db.insert_photo(&photo, &[], &[]).unwrap();
    }

    #[test]
    fn facet_count_matches_post_click_query_count() {
        let db = CatalogDb::open_in_memory().unwrap();
        seed(&db, "/a.jpg", "Canon", "R5", 2023, 6);
        seed(&db, "/b.jpg", "Canon", "R5", 2024, 6);
        seed(&db, "/c.jpg", "Nikon", "Z9", 2024, 7);

        let filter = Filter { month: Some(6), ..Default::default() };
        let facets = compute(&db, &filter).unwrap();

        let year_facet = facets.year.iter().find(|f| f.value == "2024").unwrap();
        assert_eq!(year_facet.count, 1);

        // Toggling year=2024 on top of month=6 must match the facet's count.
        let post_click = Filter { month: Some(6), year: Some(2024), ..Default::default() };
        let result = crate::query::execute(&db, &post_click).unwrap();
        assert_eq!(result.total, year_facet.count);
    }

    #[test]
    fn year_facet_preserves_month_predicate() {
        let db = CatalogDb::open_in_memory().unwrap();
        seed(&db, "/a.jpg", "Canon", "R5", 2023, 11);
        seed(&db, "/b.jpg", "Canon", "R5", 2024, 6);

        let filter = Filter { month: Some(11), ..Default::default() };
        let facets = compute(&db, &filter).unwrap();
        // Only the 2023 photo matches month=11; 2024 shouldn't appear with
        // count > 0 even though it exists in the catalog.
        let year_2024 = facets.year.iter().find(|f| f.value == "2024");
        assert!(year_2024.is_none());
        let year_2023 = facets.year.iter().find(|f| f.value == "2023").unwrap();
        assert_eq!(year_2023.count, 1);
    }

    #[test]
    fn month_facet_empty_without_year_selected() {
        let db = CatalogDb::open_in_memory().unwrap();
        seed(&db, "/a.jpg", "Canon", "R5", 2024, 6);
        let facets = compute(&db, &Filter::default()).unwrap();
        assert!(facets.month.is_empty());
    }

    #[test]
    fn month_facet_populated_when_year_selected() {
        let db = CatalogDb::open_in_memory().unwrap();
        seed(&db, "/a.jpg", "Canon", "R5", 2024, 6);
        let filter = Filter { year: Some(2024), ..Default::default() };
        let facets = compute(&db, &filter).unwrap();
        assert_eq!(facets.month.len(), 1);
        assert_eq!(facets.month[0].label, "June");
    }
}
