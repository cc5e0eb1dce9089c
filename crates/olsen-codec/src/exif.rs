//! EXIF tag-stream parsing.
//!
//! Reads whatever `kamadak-exif` can find in a container and translates the
//! tags the catalog cares about. Never fails the caller: any parse error
//! yields an all-`None` [`ExifData`] rather than propagating, since a missing
//! or corrupt EXIF segment is not a reason to skip the file (spec.md §4.2).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Every EXIF-derived field the catalog stores, all optional: a file with no
/// (or partial) EXIF still produces an `ExifData` with the fields it found.
#[derive(Debug, Clone, Default)]
pub struct ExifData {
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
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub orientation: Option<i32>,
    pub color_space: Option<String>,
    pub white_balance: Option<String>,
    pub flash_fired: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
}

/// Parse EXIF out of any container `kamadak-exif` understands (JPEG, TIFF,
/// most RAW wrappers). Returns `ExifData::default()` on any failure.
pub fn read_exif(path: &Path) -> ExifData {
    match read_exif_inner(path) {
        Ok(data) => data,
        Err(e) => {
            log::debug!("no usable EXIF in {}: {e}", path.display());
            ExifData::default()
        }
    }
}

fn read_exif_inner(path: &Path) -> anyhow::Result<ExifData> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader)?;

    Ok(ExifData {
        camera_make: read_ascii(&exif, exif::Tag::Make),
        camera_model: read_ascii(&exif, exif::Tag::Model),
        lens_make: read_ascii(&exif, exif::Tag::LensMake),
        lens_model: read_ascii(&exif, exif::Tag::LensModel),
        iso: read_short(&exif, exif::Tag::PhotographicSensitivity).map(u32::from),
        aperture: read_rational(&exif, exif::Tag::FNumber).map(|(n, d)| ratio(n, d)),
        shutter_speed: read_rational(&exif, exif::Tag::ExposureTime)
            .map(|(n, d)| format_shutter_speed(n, d)),
        exposure_compensation: read_srational(&exif, exif::Tag::ExposureBiasValue)
            .map(|(n, d)| n as f64 / d as f64),
        focal_length: read_rational(&exif, exif::Tag::FocalLength).map(|(n, d)| ratio(n, d)),
        focal_length_35mm: read_short(&exif, exif::Tag::FocalLengthIn35mmFilm).map(f64::from),
        date_taken: read_ascii(&exif, exif::Tag::DateTimeOriginal)
            .as_deref()
            .and_then(parse_exif_datetime),
        date_digitized: read_ascii(&exif, exif::Tag::DateTimeDigitized)
            .as_deref()
            .and_then(parse_exif_datetime),
        width: read_long(&exif, exif::Tag::PixelXDimension),
        height: read_long(&exif, exif::Tag::PixelYDimension),
        orientation: read_short(&exif, exif::Tag::Orientation).map(i32::from),
        color_space: read_short(&exif, exif::Tag::ColorSpace).map(|v| match v {
            1 => "sRGB".to_string(),
            65535 => "uncalibrated".to_string(),
            other => other.to_string(),
        }),
        white_balance: read_short(&exif, exif::Tag::WhiteBalance).map(|v| match v {
            0 => "auto".to_string(),
            1 => "manual".to_string(),
            other => other.to_string(),
        }),
        flash_fired: read_short(&exif, exif::Tag::Flash).map(|v| v & 0x1 != 0),
        latitude: read_gps_coordinate(&exif, exif::Tag::GPSLatitude, exif::Tag::GPSLatitudeRef),
        longitude: read_gps_coordinate(&exif, exif::Tag::GPSLongitude, exif::Tag::GPSLongitudeRef),
        altitude: read_gps_altitude(&exif),
    })
}

fn ratio(num: u32, den: u32) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// §4.2 shutter-speed formatting: denominator 1 → bare numerator; numerator 1
/// → `1/den`; otherwise `num/den`.
fn format_shutter_speed(num: u32, den: u32) -> String {
    if den == 1 {
        format!("{num}")
    } else if num == 1 {
        format!("1/{den}")
    } else {
        format!("{num}/{den}")
    }
}

fn read_ascii(exif: &exif::Exif, tag: exif::Tag) -> Option<String> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Ascii(vecs) => {
            let raw = vecs.first()?;
            let s = std::str::from_utf8(raw).ok()?;
            // Tolerate null-padding and trailing whitespace.
            let trimmed = s.trim_end_matches('\0').trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

fn read_short(exif: &exif::Exif, tag: exif::Tag) -> Option<u16> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Short(v) => v.first().copied(),
        exif::Value::Long(v) => v.first().map(|&x| x as u16),
        _ => None,
    }
}

fn read_long(exif: &exif::Exif, tag: exif::Tag) -> Option<u32> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Long(v) => v.first().copied(),
        exif::Value::Short(v) => v.first().map(|&x| u32::from(x)),
        _ => None,
    }
}

fn read_rational(exif: &exif::Exif, tag: exif::Tag) -> Option<(u32, u32)> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Rational(v) => v.first().map(|r| (r.num, r.denom)),
        _ => None,
    }
}

fn read_srational(exif: &exif::Exif, tag: exif::Tag) -> Option<(i32, i32)> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::SRational(v) => v.first().map(|r| (r.num, r.denom)),
        _ => None,
    }
}

fn read_gps_coordinate(exif: &exif::Exif, value_tag: exif::Tag, ref_tag: exif::Tag) -> Option<f64> {
    let field = exif.get_field(value_tag, exif::In::PRIMARY)?;
    let dms = match &field.value {
        exif::Value::Rational(v) if v.len() == 3 => v,
        _ => return None,
    };

    let degrees = ratio(dms[0].num, dms[0].denom);
    let minutes = ratio(dms[1].num, dms[1].denom);
    let seconds = ratio(dms[2].num, dms[2].denom);
    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;

    let sign = match read_ascii(exif, ref_tag).as_deref() {
        Some("S") | Some("W") => -1.0,
        _ => 1.0,
    };
    Some(decimal * sign)
}

fn read_gps_altitude(exif: &exif::Exif) -> Option<f64> {
    let (num, den) = read_rational(exif, exif::Tag::GPSAltitude)?;
    let magnitude = ratio(num, den);
    let below_sea_level = exif
        .get_field(exif::Tag::GPSAltitudeRef, exif::In::PRIMARY)
        .and_then(|f| match &f.value {
            exif::Value::Byte(v) => v.first().copied(),
            _ => None,
        })
        == Some(1);
    Some(if below_sea_level { -magnitude } else { magnitude })
}

/// Accepts the canonical EXIF datetime (`YYYY:MM:DD HH:MM:SS`), ISO-8601
/// with `T` and optional `Z`/sub-seconds, and bare date-only strings.
pub fn parse_exif_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim_end_matches('\0').trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if s.len() >= 19 && &s[4..5] == ":" && &s[7..8] == ":" {
        let date = s[..10].replace(':', "-");
        let normalized = format!("{date} {}", &s[11..19]);
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S") {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y:%m:%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_empty_data() {
        let data = read_exif(Path::new("/nonexistent/photo.jpg"));
        assert!(data.camera_make.is_none());
        assert!(data.date_taken.is_none());
    }

    #[test]
    fn corrupt_file_does_not_fail_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.jpg");
        std::fs::write(&path, b"not actually a jpeg").unwrap();
        let data = read_exif(&path);
        assert!(data.camera_model.is_none());
    }

    #[test]
    fn shutter_speed_formatting_rules() {
        assert_eq!(format_shutter_speed(2, 1), "2");
        assert_eq!(format_shutter_speed(1, 250), "1/250");
        assert_eq!(format_shutter_speed(3, 200), "3/200");
    }

    #[test]
    fn parses_colon_delimited_datetime() {
        let dt = parse_exif_datetime("2024:03:15 12:30:45").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-15 12:30:45");
    }

    #[test]
    fn parses_iso8601_with_z() {
        let dt = parse_exif_datetime("2024-03-15T12:30:45Z").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-03-15");
    }

    #[test]
    fn parses_iso8601_without_timezone_with_subseconds() {
        let dt = parse_exif_datetime("2024-03-15T12:30:45.123").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-15 12:30:45");
    }

    #[test]
    fn parses_date_only() {
        let dt = parse_exif_datetime("2024:03:15").unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "00:00:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_exif_datetime("not a date").is_none());
    }

    #[test]
    fn tolerates_null_padding() {
        assert!(parse_exif_datetime("2024:03:15 12:30:45\0\0").is_some());
    }
}
