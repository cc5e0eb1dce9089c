//! Translates a `Filter` into a conjunction of parameterized SQL predicates
//! against `photos` (and, for color filters, an `EXISTS` subquery over
//! `photo_colors`), per spec.md §4.8.

use crate::filter::Filter;
use rusqlite::types::ToSql;

/// Which dimension of the filter to omit, used by the facet engine's
/// counting rule: compute a facet's counts with its own dimension cleared
/// but every other active filter preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetDimension {
    Year,
    Month,
    Camera,
    Lens,
    TimeOfDay,
    Season,
    FocalCategory,
    ShootingCondition,
    InBurst,
    Color,
}

/// Owned SQL parameter values — boxed so heterogeneous types can share one
/// `Vec` and be handed to `rusqlite::params_from_iter`.
pub type Params = Vec<Box<dyn ToSql>>;

/// Build the `WHERE` clause body (without the leading `WHERE`) and its bound
/// parameters, optionally omitting one dimension's predicates.
pub fn build(filter: &Filter, omit: Option<FacetDimension>) -> (String, Params) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Params = Vec::new();

    let omit_year = omit == Some(FacetDimension::Year);
    let omit_month = omit == Some(FacetDimension::Month);
    let omit_camera = omit == Some(FacetDimension::Camera);
    let omit_lens = omit == Some(FacetDimension::Lens);
    let omit_time_of_day = omit == Some(FacetDimension::TimeOfDay);
    let omit_season = omit == Some(FacetDimension::Season);
    let omit_focal_category = omit == Some(FacetDimension::FocalCategory);
    let omit_shooting_condition = omit == Some(FacetDimension::ShootingCondition);
    let omit_in_burst = omit == Some(FacetDimension::InBurst);
    let omit_color = omit == Some(FacetDimension::Color);

    // Year is a state-machine dimension on its own: -1 means "date is null".
    // Month and day are independent of year and of each other — they apply
    // whenever set, regardless of whether year is also set (spec.md §4.8's
    // "state-machine independence" rule). Only `Year` omission clears the
    // year predicate; `Month` omission only clears month, day stays active.
    if !omit_year {
        if let Some(year) = filter.year {
            if year == -1 {
                clauses.push("date_taken IS NULL".to_string());
            } else {
                clauses.push("strftime('%Y', date_taken) = ?".to_string());
                params.push(Box::new(format!("{year:04}")));
            }
        }
    }
    if !omit_month {
        if let Some(month) = filter.month {
            clauses.push("strftime('%m', date_taken) = ?".to_string());
            params.push(Box::new(format!("{month:02}")));
        }
    }
    // Day has no dedicated facet dimension in §4.9, so it always applies
    // when set, independent of whether year or month are omitted.
    if let Some(day) = filter.day {
        clauses.push("strftime('%d', date_taken) = ?".to_string());
        params.push(Box::new(format!("{day:02}")));
    }

    if let Some(from) = filter.date_from {
        clauses.push("date_taken >= ?".to_string());
        params.push(Box::new(from.to_rfc3339()));
    }
    if let Some(to) = filter.date_to {
        clauses.push("date_taken <= ?".to_string());
        params.push(Box::new(to.to_rfc3339()));
    }

    if !omit_time_of_day {
        in_list(&mut clauses, &mut params, "time_of_day", &filter.time_of_day);
    }
    if !omit_season {
        in_list(&mut clauses, &mut params, "season", &filter.season);
    }
    if !omit_camera {
        in_list(&mut clauses, &mut params, "camera_make", &filter.camera_make);
        in_list(&mut clauses, &mut params, "camera_model", &filter.camera_model);
    }
    if !omit_lens {
        in_list(&mut clauses, &mut params, "lens_make", &filter.lens_make);
        in_list(&mut clauses, &mut params, "lens_model", &filter.lens_model);
    }

    if let Some(v) = filter.iso_min {
        clauses.push("iso >= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.iso_max {
        clauses.push("iso <= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.aperture_min {
        clauses.push("aperture >= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.aperture_max {
        clauses.push("aperture <= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.focal_length_min {
        clauses.push("focal_length >= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.focal_length_max {
        clauses.push("focal_length <= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.focal_length_35mm_min {
        clauses.push("focal_length_35mm >= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.focal_length_35mm_max {
        clauses.push("focal_length_35mm <= ?".to_string());
        params.push(Box::new(v));
    }
    if !omit_focal_category {
        in_list(&mut clauses, &mut params, "focal_category", &filter.focal_category);
    }
    if !omit_shooting_condition {
        in_list(&mut clauses, &mut params, "shooting_condition", &filter.shooting_condition);
    }

    if let Some(v) = filter.lat_min {
        clauses.push("latitude >= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.lat_max {
        clauses.push("latitude <= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.lon_min {
        clauses.push("longitude >= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.lon_max {
        clauses.push("longitude <= ?".to_string());
        params.push(Box::new(v));
    }
    if filter.has_gps == Some(true) {
        clauses.push("(latitude IS NOT NULL AND longitude IS NOT NULL)".to_string());
    } else if filter.has_gps == Some(false) {
        clauses.push("(latitude IS NULL OR longitude IS NULL)".to_string());
    }

    if !omit_color {
        let color_clauses: Vec<String> = filter
            .color_name
            .iter()
            .filter_map(|name| color_exists_clause(name))
            .collect();
        if !color_clauses.is_empty() {
            clauses.push(format!("({})", color_clauses.join(" OR ")));
        }

        if filter.hue_min.is_some() || filter.hue_max.is_some() {
            let mut inner = vec!["photo_colors.photo_id = photos.id".to_string()];
            if let Some(v) = filter.hue_min {
                inner.push("photo_colors.hue >= ?".to_string());
                params.push(Box::new(v));
            }
            if let Some(v) = filter.hue_max {
                inner.push("photo_colors.hue <= ?".to_string());
                params.push(Box::new(v));
            }
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM photo_colors WHERE {})",
                inner.join(" AND ")
            ));
        }
    }

    if let Some(v) = filter.in_burst {
        if !omit_in_burst {
            if v {
                clauses.push("burst_group_id IS NOT NULL".to_string());
            } else {
                clauses.push("burst_group_id IS NULL".to_string());
            }
        }
    }
    if let Some(id) = &filter.burst_group_id {
        clauses.push("burst_group_id = ?".to_string());
        params.push(Box::new(id.clone()));
    }
    if let Some(v) = filter.is_representative {
        clauses.push("is_burst_representative = ?".to_string());
        params.push(Box::new(v as i64));
    }

    if let Some(v) = filter.width_min {
        clauses.push("width >= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.width_max {
        clauses.push("width <= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.height_min {
        clauses.push("height >= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.height_max {
        clauses.push("height <= ?".to_string());
        params.push(Box::new(v));
    }
    if let Some(v) = filter.orientation {
        clauses.push("orientation = ?".to_string());
        params.push(Box::new(v));
    }
    if filter.is_landscape == Some(true) {
        clauses.push("width > height".to_string());
    }
    if filter.is_portrait == Some(true) {
        clauses.push("height > width".to_string());
    }

    if let Some(v) = filter.flash_fired {
        clauses.push("flash_fired = ?".to_string());
        params.push(Box::new(v as i64));
    }
    in_list(&mut clauses, &mut params, "white_balance", &filter.white_balance);
    in_list(&mut clauses, &mut params, "color_space", &filter.color_space);

    (clauses.join(" AND "), params)
}

fn in_list(clauses: &mut Vec<String>, params: &mut Params, column: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    let placeholders = vec!["?"; values.len()].join(", ");
    clauses.push(format!("{column} IN ({placeholders})"));
    for v in values {
        params.push(Box::new(v.clone()));
    }
}

/// Mirrors `olsen_color::color_name_matches`, expressed as a SQL boolean
/// expression over `photo_colors.hue/saturation/lightness`.
fn color_exists_clause(name: &str) -> Option<String> {
    let predicate = match name {
        "red" => "(photo_colors.hue <= 15 OR photo_colors.hue >= 345)".to_string(),
        "grey" | "gray" => {
            "(photo_colors.saturation < 20 AND photo_colors.lightness BETWEEN 20 AND 80)".to_string()
        }
        "black" => "photo_colors.lightness < 20".to_string(),
        "white" => "photo_colors.lightness > 80".to_string(),
        "brown" => "photo_colors.hue BETWEEN 20 AND 40".to_string(),
        "orange" => "photo_colors.hue BETWEEN 16 AND 45".to_string(),
        "yellow" => "photo_colors.hue BETWEEN 46 AND 75".to_string(),
        "green" => "photo_colors.hue BETWEEN 76 AND 165".to_string(),
        "blue" => "photo_colors.hue BETWEEN 166 AND 255".to_string(),
        "purple" => "photo_colors.hue BETWEEN 256 AND 290".to_string(),
        "pink" => "photo_colors.hue BETWEEN 291 AND 344".to_string(),
        _ => return None,
    };
    Some(format!(
        "EXISTS (SELECT 1 FROM photo_colors WHERE photo_colors.photo_id = photos.id AND {predicate})"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_produces_empty_clause() {
        let (clause, params) = build(&Filter::default(), None);
        assert!(clause.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn year_sentinel_translates_to_null_check() {
        let filter = Filter { year: Some(-1), ..Default::default() };
        let (clause, _) = build(&filter, None);
        assert_eq!(clause, "date_taken IS NULL");
    }

    #[test]
    fn month_and_day_apply_without_year() {
        let filter = Filter { month: Some(11), day: Some(4), ..Default::default() };
        let (clause, params) = build(&filter, None);
        assert!(clause.contains("strftime('%m', date_taken) = ?"));
        assert!(clause.contains("strftime('%d', date_taken) = ?"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn omitting_year_preserves_month_and_day() {
        let filter = Filter { year: Some(2024), month: Some(11), day: Some(4), ..Default::default() };
        let (clause, _) = build(&filter, Some(FacetDimension::Year));
        assert!(!clause.contains("strftime('%Y'"));
        assert!(clause.contains("strftime('%m'"));
        assert!(clause.contains("strftime('%d'"));
    }

    #[test]
    fn in_list_emits_placeholders() {
        let filter = Filter {
            camera_make: vec!["Canon".to_string(), "Nikon".to_string()],
            ..Default::default()
        };
        let (clause, params) = build(&filter, None);
        assert_eq!(clause, "camera_make IN (?, ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn has_gps_true_requires_both_coordinates() {
        let filter = Filter { has_gps: Some(true), ..Default::default() };
        let (clause, _) = build(&filter, None);
        assert_eq!(clause, "(latitude IS NOT NULL AND longitude IS NOT NULL)");
    }

    #[test]
    fn color_name_emits_exists_subquery() {
        let filter = Filter { color_name: vec!["red".to_string()], ..Default::default() };
        let (clause, _) = build(&filter, None);
        assert!(clause.contains("EXISTS (SELECT 1 FROM photo_colors"));
        assert!(clause.contains("photo_colors.hue <= 15"));
    }

    #[test]
    fn multiple_colors_combine_with_or() {
        let filter = Filter {
            color_name: vec!["red".to_string(), "blue".to_string()],
            ..Default::default()
        };
        let (clause, _) = build(&filter, None);
        assert_eq!(clause.matches("EXISTS").count(), 2);
        assert!(clause.contains(" OR "));
    }

    #[test]
    fn omitting_color_dimension_drops_color_predicate() {
        let filter = Filter { color_name: vec!["red".to_string()], ..Default::default() };
        let (clause, _) = build(&filter, Some(FacetDimension::Color));
        assert!(clause.is_empty());
    }
}
