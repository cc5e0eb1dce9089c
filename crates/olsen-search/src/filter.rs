//! The typed filter bundle, per spec.md §4.8. Every field is optional or
//! multi-valued so an empty `Filter::default()` matches every photo.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortBy {
    DateTaken,
    Camera,
    FocalLength,
    Iso,
    Aperture,
}

impl Default for SortBy {
    fn default() -> Self {
        SortBy::DateTaken
    }
}

impl SortBy {
    pub fn column(&self) -> &'static str {
        match self {
            SortBy::DateTaken => "date_taken",
            SortBy::Camera => "camera_make, camera_model",
            SortBy::FocalLength => "focal_length",
            SortBy::Iso => "iso",
            SortBy::Aperture => "aperture",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::DateTaken => "date_taken",
            SortBy::Camera => "camera",
            SortBy::FocalLength => "focal_length",
            SortBy::Iso => "iso",
            SortBy::Aperture => "aperture",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "date_taken" => Some(SortBy::DateTaken),
            "camera" => Some(SortBy::Camera),
            "focal_length" => Some(SortBy::FocalLength),
            "iso" => Some(SortBy::Iso),
            "aperture" => Some(SortBy::Aperture),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

pub const DEFAULT_LIMIT: u32 = 50;

/// The ~50-field filter bundle. Equality is value-based (`PartialEq`/`Clone`)
/// so the facet engine can cheaply derive a modified copy per dimension and
/// the URL mapper can round-trip filters through a canonical query string.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filter {
    /// -1 is the sentinel for "date is null"; any other value is a literal year.
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub date_from: Option<chrono::DateTime<chrono::Utc>>,
    pub date_to: Option<chrono::DateTime<chrono::Utc>>,

    pub time_of_day: Vec<String>,
    pub season: Vec<String>,

    pub camera_make: Vec<String>,
    pub camera_model: Vec<String>,
    pub lens_make: Vec<String>,
    pub lens_model: Vec<String>,

    pub iso_min: Option<u32>,
    pub iso_max: Option<u32>,
    pub aperture_min: Option<f64>,
    pub aperture_max: Option<f64>,
    pub focal_length_min: Option<f64>,
    pub focal_length_max: Option<f64>,
    pub focal_length_35mm_min: Option<f64>,
    pub focal_length_35mm_max: Option<f64>,
    pub focal_category: Vec<String>,
    pub shooting_condition: Vec<String>,

    pub lat_min: Option<f64>,
    pub lat_max: Option<f64>,
    pub lon_min: Option<f64>,
    pub lon_max: Option<f64>,
    pub has_gps: Option<bool>,

    pub color_name: Vec<String>,
    pub hue_min: Option<u16>,
    pub hue_max: Option<u16>,
    pub saturation_min: Option<u8>,
    pub saturation_max: Option<u8>,
    pub lightness_min: Option<u8>,
    pub lightness_max: Option<u8>,

    pub in_burst: Option<bool>,
    pub burst_group_id: Option<String>,
    pub is_representative: Option<bool>,

    pub width_min: Option<u32>,
    pub width_max: Option<u32>,
    pub height_min: Option<u32>,
    pub height_max: Option<u32>,
    pub orientation: Option<i32>,
    pub is_landscape: Option<bool>,
    pub is_portrait: Option<bool>,

    pub flash_fired: Option<bool>,
    pub white_balance: Vec<String>,
    pub color_space: Vec<String>,

    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl Filter {
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}
