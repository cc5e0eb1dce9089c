//! Record types stored in and returned from the catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thumbnail size ladder tags, named by their longest-edge target in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThumbnailSize {
    Tiny,
    Small,
    Medium,
    Large,
}

impl ThumbnailSize {
    pub const LADDER: [ThumbnailSize; 4] = [
        ThumbnailSize::Tiny,
        ThumbnailSize::Small,
        ThumbnailSize::Medium,
        ThumbnailSize::Large,
    ];

    pub fn target_edge(&self) -> u32 {
        match self {
            ThumbnailSize::Tiny => 64,
            ThumbnailSize::Small => 256,
            ThumbnailSize::Medium => 512,
            ThumbnailSize::Large => 1024,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ThumbnailSize::Tiny => "64",
            ThumbnailSize::Small => "256",
            ThumbnailSize::Medium => "512",
            ThumbnailSize::Large => "1024",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "64" => Some(ThumbnailSize::Tiny),
            "256" => Some(ThumbnailSize::Small),
            "512" => Some(ThumbnailSize::Medium),
            "1024" => Some(ThumbnailSize::Large),
            _ => None,
        }
    }
}

/// A photo record as it is inserted into the catalog. Identity (path) and
/// content hash are required; everything EXIF-derived is optional because
/// a file can be indexed with metadata-only fallback.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewPhoto {
    pub file_path: String,
    pub file_size: i64,
    pub file_hash: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub perceptual_hash: Option<String>,

    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens_make: Option<String>,
    pub lens_model: Option<String>,
    pub iso: Option<u32>,
    pub aperture: Option<f64>,
    pub shutter_speed: Option<String>,
    pub exposure_compensation: Option<f64>,
    pub focal_length: Option<f64>,
    pub focal_length_35mm: Option<f64>,
    pub date_taken: Option<DateTime<Utc>>,
    pub date_digitized: Option<DateTime<Utc>>,
    pub orientation: Option<i32>,
    pub color_space: Option<String>,
    pub white_balance: Option<String>,
    pub flash_fired: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,

    pub width: Option<u32>,
    pub height: Option<u32>,

    pub time_of_day: String,
    pub season: String,
    pub focal_category: String,
    pub shooting_condition: String,
}

/// A photo record as read back from the catalog, including its assigned id
/// and burst linkage (written later by the burst detector batch pass).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: i64,
    pub file_path: String,
    pub file_size: i64,
    pub file_hash: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub indexed_at: DateTime<Utc>,
    pub perceptual_hash: Option<String>,

    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens_make: Option<String>,
    pub lens_model: Option<String>,
    pub iso: Option<u32>,
    pub aperture: Option<f64>,
    pub shutter_speed: Option<String>,
    pub exposure_compensation: Option<f64>,
    pub focal_length: Option<f64>,
    pub focal_length_35mm: Option<f64>,
    pub date_taken: Option<DateTime<Utc>>,
    pub date_digitized: Option<DateTime<Utc>>,
    pub orientation: Option<i32>,
    pub color_space: Option<String>,
    pub white_balance: Option<String>,
    pub flash_fired: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,

    pub width: Option<u32>,
    pub height: Option<u32>,

    pub time_of_day: String,
    pub season: String,
    pub focal_category: String,
    pub shooting_condition: String,

    pub burst_group_id: Option<String>,
    pub burst_sequence: Option<i32>,
    pub burst_count: Option<i32>,
    pub is_burst_representative: bool,
}

/// A thumbnail payload to be inserted alongside a photo.
#[derive(Debug, Clone)]
pub struct NewThumbnail {
    pub size: ThumbnailSize,
    pub data: Vec<u8>,
}

/// A color sample to be inserted alongside a photo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
    pub weight: f64,
}

/// A color sample as read back from the catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ColorSampleRecord {
    pub photo_id: i64,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
    pub weight: f64,
}

/// A burst group row, computed by the batch burst-detection pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurstGroupRecord {
    pub id: String,
    pub photo_count: i32,
    pub date_taken: Option<DateTime<Utc>>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub representative_photo_id: i64,
    pub time_span_seconds: f64,
    pub created_at: DateTime<Utc>,
}

/// A minimal row used by the burst detector's date-ordered scan.
#[derive(Debug, Clone)]
pub struct BurstScanRow {
    pub photo_id: i64,
    pub date_taken: DateTime<Utc>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub focal_length: Option<f64>,
}
