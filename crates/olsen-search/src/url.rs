//! Bijective-ish conversion between a `Filter` and a URL, per spec.md §4.10.
//! Legacy short paths are accepted as input shortcuts; the canonical output
//! is always `/photos?…`, with parameters in alphabetical key order so the
//! same filter always renders the same string regardless of which field was
//! set first.

use chrono::{DateTime, Utc};

use crate::filter::{Filter, SortBy, SortOrder};

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// Parse a legacy short path into a `Filter`. Invalid segments stop parsing
/// at that point rather than erroring — the caller still gets a usable
/// (partially populated) filter.
pub fn parse_path(path: &str) -> Filter {
    let mut filter = Filter::default();
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return filter;
    }

    match segments[0] {
        "camera" => {
            if let Some(make) = segments.get(1) {
                filter.camera_make = vec![unslugify(make)];
                if let Some(model) = segments.get(2) {
                    filter.camera_model = vec![unslugify(model)];
                }
            }
            return filter;
        }
        "lens" => {
            if let Some(model) = segments.get(1) {
                filter.lens_model = vec![unslugify(model)];
            }
            return filter;
        }
        "color" => {
            if let Some(name) = segments.get(1) {
                filter.color_name = vec![name.to_string()];
            }
            return filter;
        }
        "bursts" => {
            filter.in_burst = Some(true);
            return filter;
        }
        "morning" | "afternoon" | "night" | "midday" | "blue_hour" | "golden_hour_morning"
        | "golden_hour_evening" => {
            filter.time_of_day = vec![segments[0].to_string()];
            return filter;
        }
        "evening" => {
            filter.time_of_day = vec!["golden_hour_evening".to_string()];
            return filter;
        }
        "spring" | "summer" | "winter" => {
            filter.season = vec![segments[0].to_string()];
            return filter;
        }
        "fall" => {
            filter.season = vec!["autumn".to_string()];
            return filter;
        }
        "wide" | "normal" | "telephoto" => {
            filter.focal_category = vec![segments[0].to_string()];
            return filter;
        }
        _ => {}
    }

    // `/YYYY[/MM[/DD]]`
    if let Ok(year) = segments[0].parse::<i32>() {
        if (1900..=2100).contains(&year) {
            filter.year = Some(year);
            if let Some(month_str) = segments.get(1) {
                if let Ok(month) = month_str.parse::<u32>() {
                    if (1..=12).contains(&month) {
                        filter.month = Some(month);
                        if let Some(day_str) = segments.get(2) {
                            if let Ok(day) = day_str.parse::<u32>() {
                                if (1..=31).contains(&day) {
                                    filter.day = Some(day);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    filter
}

/// Legacy path segments use dashes for spaces (`/camera/Canon/EOS-R5`); the
/// canonical query string instead percent-encodes, so these two helpers are
/// intentionally separate from [`encode_component`]/[`decode_component`].
fn unslugify(s: &str) -> String {
    s.replace('-', " ")
}

/// Parse `/photos?...` query-string parameters onto a `Filter` that may
/// already carry path-derived values (query parameters take precedence on
/// conflict, per spec.md §4.10).
pub fn apply_query_string(mut filter: Filter, query: &str) -> Filter {
    for pair in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next().unwrap_or_default();
        let value = decode_component(parts.next().unwrap_or_default());

        match key {
            "year" => filter.year = value.parse().ok(),
            "month" => filter.month = value.parse().ok(),
            "day" => filter.day = value.parse().ok(),
            "date_from" => filter.date_from = parse_datetime(&value),
            "date_to" => filter.date_to = parse_datetime(&value),

            "time_of_day" => filter.time_of_day.push(value),
            "season" => filter.season.push(value),

            "camera_make" => filter.camera_make.push(value),
            "camera_model" => filter.camera_model.push(value),
            "lens_make" => filter.lens_make.push(value),
            "lens_model" => filter.lens_model.push(value),

            "iso_min" => filter.iso_min = value.parse().ok(),
            "iso_max" => filter.iso_max = value.parse().ok(),
            "aperture_min" => filter.aperture_min = value.parse().ok(),
            "aperture_max" => filter.aperture_max = value.parse().ok(),
            "focal_length_min" => filter.focal_length_min = value.parse().ok(),
            "focal_length_max" => filter.focal_length_max = value.parse().ok(),
            "focal_length_35mm_min" => filter.focal_length_35mm_min = value.parse().ok(),
            "focal_length_35mm_max" => filter.focal_length_35mm_max = value.parse().ok(),
            "focal_category" => filter.focal_category.push(value),
            "shooting_condition" => filter.shooting_condition.push(value),

            "lat_min" => filter.lat_min = value.parse().ok(),
            "lat_max" => filter.lat_max = value.parse().ok(),
            "lon_min" => filter.lon_min = value.parse().ok(),
            "lon_max" => filter.lon_max = value.parse().ok(),
            "has_gps" => filter.has_gps = parse_bool(&value),

            "color" => filter.color_name.push(value),
            "hue_min" => filter.hue_min = value.parse().ok(),
            "hue_max" => filter.hue_max = value.parse().ok(),
            "saturation_min" => filter.saturation_min = value.parse().ok(),
            "saturation_max" => filter.saturation_max = value.parse().ok(),
            "lightness_min" => filter.lightness_min = value.parse().ok(),
            "lightness_max" => filter.lightness_max = value.parse().ok(),

            "in_burst" => filter.in_burst = parse_bool(&value),
            "burst_group_id" => filter.burst_group_id = Some(value),
            "is_representative" => filter.is_representative = parse_bool(&value),

            "width_min" => filter.width_min = value.parse().ok(),
            "width_max" => filter.width_max = value.parse().ok(),
            "height_min" => filter.height_min = value.parse().ok(),
            "height_max" => filter.height_max = value.parse().ok(),
            "orientation" => filter.orientation = value.parse().ok(),
            "is_landscape" => filter.is_landscape = parse_bool(&value),
            "is_portrait" => filter.is_portrait = parse_bool(&value),

            "flash_fired" => filter.flash_fired = parse_bool(&value),
            "white_balance" => filter.white_balance.push(value),
            "color_space" => filter.color_space.push(value),

            "limit" => filter.limit = value.parse().ok(),
            "offset" => filter.offset = value.parse().ok(),
            "sort_by" => {
                if let Some(sort_by) = SortBy::parse(&value) {
                    filter.sort_by = sort_by;
                }
            }
            "sort_order" => {
                if let Some(sort_order) = SortOrder::parse(&value) {
                    filter.sort_order = sort_order;
                }
            }
            _ => {}
        }
    }
    filter
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|d| d.with_timezone(&Utc))
}

/// `application/x-www-form-urlencoded`-style decode: `+` is a space, `%XX`
/// is a percent-escaped byte. Malformed escapes pass through unchanged.
fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(bytes[i]);
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Percent-encode a value for use in a query string. Unreserved characters
/// pass through unescaped; everything else (including spaces, which become
/// `%20` rather than `+`, to stay unambiguous with `+` in literal values)
/// is escaped.
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Render the canonical `/photos?…` form. Every active filter becomes a
/// named parameter, in alphabetical key order; multi-valued fields repeat
/// the parameter once per value.
pub fn render(filter: &Filter) -> String {
    let mut pairs: Vec<(&'static str, String)> = Vec::new();

    if let Some(year) = filter.year {
        pairs.push(("year", year.to_string()));
    }
    if let Some(month) = filter.month {
        pairs.push(("month", month.to_string()));
    }
    if let Some(day) = filter.day {
        pairs.push(("day", day.to_string()));
    }
    if let Some(v) = &filter.date_from {
        pairs.push(("date_from", v.to_rfc3339()));
    }
    if let Some(v) = &filter.date_to {
        pairs.push(("date_to", v.to_rfc3339()));
    }

    push_multi(&mut pairs, "time_of_day", &filter.time_of_day);
    push_multi(&mut pairs, "season", &filter.season);

    push_multi(&mut pairs, "camera_make", &filter.camera_make);
    push_multi(&mut pairs, "camera_model", &filter.camera_model);
    push_multi(&mut pairs, "lens_make", &filter.lens_make);
    push_multi(&mut pairs, "lens_model", &filter.lens_model);

    push_opt(&mut pairs, "iso_min", filter.iso_min);
    push_opt(&mut pairs, "iso_max", filter.iso_max);
    push_opt(&mut pairs, "aperture_min", filter.aperture_min);
    push_opt(&mut pairs, "aperture_max", filter.aperture_max);
    push_opt(&mut pairs, "focal_length_min", filter.focal_length_min);
    push_opt(&mut pairs, "focal_length_max", filter.focal_length_max);
    push_opt(&mut pairs, "focal_length_35mm_min", filter.focal_length_35mm_min);
    push_opt(&mut pairs, "focal_length_35mm_max", filter.focal_length_35mm_max);
    push_multi(&mut pairs, "focal_category", &filter.focal_category);
    push_multi(&mut pairs, "shooting_condition", &filter.shooting_condition);

    push_opt(&mut pairs, "lat_min", filter.lat_min);
    push_opt(&mut pairs, "lat_max", filter.lat_max);
    push_opt(&mut pairs, "lon_min", filter.lon_min);
    push_opt(&mut pairs, "lon_max", filter.lon_max);
    if let Some(v) = filter.has_gps {
        pairs.push(("has_gps", v.to_string()));
    }

    push_multi(&mut pairs, "color", &filter.color_name);
    push_opt(&mut pairs, "hue_min", filter.hue_min);
    push_opt(&mut pairs, "hue_max", filter.hue_max);
    push_opt(&mut pairs, "saturation_min", filter.saturation_min);
    push_opt(&mut pairs, "saturation_max", filter.saturation_max);
    push_opt(&mut pairs, "lightness_min", filter.lightness_min);
    push_opt(&mut pairs, "lightness_max", filter.lightness_max);

    if let Some(v) = filter.in_burst {
        pairs.push(("in_burst", v.to_string()));
    }
    if let Some(id) = &filter.burst_group_id {
        pairs.push(("burst_group_id", id.clone()));
    }
    if let Some(v) = filter.is_representative {
        pairs.push(("is_representative", v.to_string()));
    }

    push_opt(&mut pairs, "width_min", filter.width_min);
    push_opt(&mut pairs, "width_max", filter.width_max);
    push_opt(&mut pairs, "height_min", filter.height_min);
    push_opt(&mut pairs, "height_max", filter.height_max);
    push_opt(&mut pairs, "orientation", filter.orientation);
    if let Some(v) = filter.is_landscape {
        pairs.push(("is_landscape", v.to_string()));
    }
    if let Some(v) = filter.is_portrait {
        pairs.push(("is_portrait", v.to_string()));
    }

    if let Some(v) = filter.flash_fired {
        pairs.push(("flash_fired", v.to_string()));
    }
    push_multi(&mut pairs, "white_balance", &filter.white_balance);
    push_multi(&mut pairs, "color_space", &filter.color_space);

    if let Some(limit) = filter.limit {
        pairs.push(("limit", limit.to_string()));
    }
    if let Some(offset) = filter.offset {
        pairs.push(("offset", offset.to_string()));
    }
    if filter.sort_by != SortBy::default() {
        pairs.push(("sort_by", filter.sort_by.as_str().to_string()));
    }
    if filter.sort_order != SortOrder::default() {
        pairs.push(("sort_order", filter.sort_order.as_str().to_string()));
    }

    pairs.sort_by(|a, b| a.0.cmp(b.0));

    if pairs.is_empty() {
        "/photos".to_string()
    } else {
        let query = pairs
            .into_iter()
            .map(|(k, v)| format!("{k}={}", encode_component(&v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("/photos?{query}")
    }
}

fn push_multi(pairs: &mut Vec<(&'static str, String)>, key: &'static str, values: &[String]) {
    for v in values {
        pairs.push((key, v.clone()));
    }
}

fn push_opt<T: ToString>(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<T>) {
    if let Some(v) = value {
        pairs.push((key, v.to_string()));
    }
}

#[derive(Debug, Clone)]
pub struct Breadcrumb {
    pub label: String,
    pub url: String,
}

/// One crumb per active temporal dimension (year, month, day), each linking
/// to the bundle with that dimension and all earlier ones preserved but
/// later ones removed.
pub fn breadcrumbs(filter: &Filter) -> Vec<Breadcrumb> {
    let mut crumbs = Vec::new();

    if let Some(year) = filter.year {
        let f = Filter { year: Some(year), ..Filter::default() };
        crumbs.push(Breadcrumb { label: year.to_string(), url: render(&f) });

        if let Some(month) = filter.month {
            let f = Filter { year: Some(year), month: Some(month), ..Filter::default() };
            let label = MONTH_NAMES.get((month as usize).saturating_sub(1)).copied().unwrap_or("?");
            crumbs.push(Breadcrumb { label: label.to_string(), url: render(&f) });

            if let Some(day) = filter.day {
                let f = Filter { year: Some(year), month: Some(month), day: Some(day), ..Filter::default() };
                crumbs.push(Breadcrumb { label: day.to_string(), url: render(&f) });
            }
        }
    }

    crumbs
}
