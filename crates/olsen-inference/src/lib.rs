//! Pure derivations of the four inferred photo fields from EXIF values,
//! per spec.md §4.6. Missing inputs yield empty strings rather than an error
//! — inference is a best-effort enrichment, never a blocking stage.

use chrono::{DateTime, Datelike, Timelike, Utc};

pub fn time_of_day(date_taken: Option<DateTime<Utc>>) -> String {
    let Some(dt) = date_taken else {
        return String::new();
    };
    let hour = dt.hour();
    let band = match hour {
        5..=6 => "golden_hour_morning",
        7..=10 => "morning",
        11..=14 => "midday",
        15..=17 => "afternoon",
        18..=19 => "golden_hour_evening",
        20..=21 => "blue_hour",
        _ => "night",
    };
    band.to_string()
}

pub fn season(date_taken: Option<DateTime<Utc>>) -> String {
    let Some(dt) = date_taken else {
        return String::new();
    };
    let band = match dt.month() {
        3..=5 => "spring",
        6..=8 => "summer",
        9..=11 => "autumn",
        _ => "winter",
    };
    band.to_string()
}

pub fn focal_category(focal_length_35mm_equiv: Option<f64>) -> String {
    let Some(mm) = focal_length_35mm_equiv else {
        return String::new();
    };
    if mm <= 0.0 {
        return String::new();
    }
    let band = if mm < 35.0 {
        "wide"
    } else if mm <= 70.0 {
        "normal"
    } else if mm <= 200.0 {
        "telephoto"
    } else {
        "super_telephoto"
    };
    band.to_string()
}

pub fn shooting_condition(flash_fired: Option<bool>, iso: Option<u32>) -> String {
    if flash_fired == Some(true) {
        return "flash".to_string();
    }
    let Some(iso) = iso else {
        return String::new();
    };
    if iso == 0 {
        return String::new();
    }
    let band = if iso <= 400 {
        "bright"
    } else if iso <= 1599 {
        "moderate"
    } else {
        "low_light"
    };
    band.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn time_of_day_bands() {
        assert_eq!(time_of_day(Some(dt(2024, 6, 1, 6))), "golden_hour_morning");
        assert_eq!(time_of_day(Some(dt(2024, 6, 1, 9))), "morning");
        assert_eq!(time_of_day(Some(dt(2024, 6, 1, 12))), "midday");
        assert_eq!(time_of_day(Some(dt(2024, 6, 1, 16))), "afternoon");
        assert_eq!(time_of_day(Some(dt(2024, 6, 1, 19))), "golden_hour_evening");
        assert_eq!(time_of_day(Some(dt(2024, 6, 1, 21))), "blue_hour");
        assert_eq!(time_of_day(Some(dt(2024, 6, 1, 2))), "night");
        assert_eq!(time_of_day(None), "");
    }

    #[test]
    fn season_bands_northern_hemisphere() {
        assert_eq!(season(Some(dt(2024, 3, 1, 12))), "spring");
        assert_eq!(season(Some(dt(2024, 7, 1, 12))), "summer");
        assert_eq!(season(Some(dt(2024, 10, 1, 12))), "autumn");
        assert_eq!(season(Some(dt(2024, 1, 1, 12))), "winter");
        assert_eq!(season(Some(dt(2024, 12, 1, 12))), "winter");
    }

    #[test]
    fn focal_category_bands() {
        assert_eq!(focal_category(Some(24.0)), "wide");
        assert_eq!(focal_category(Some(50.0)), "normal");
        assert_eq!(focal_category(Some(135.0)), "telephoto");
        assert_eq!(focal_category(Some(400.0)), "super_telephoto");
        assert_eq!(focal_category(Some(0.0)), "");
        assert_eq!(focal_category(None), "");
    }

    #[test]
    fn shooting_condition_flash_takes_priority() {
        assert_eq!(shooting_condition(Some(true), Some(100)), "flash");
        assert_eq!(shooting_condition(Some(false), Some(100)), "bright");
        assert_eq!(shooting_condition(Some(false), Some(800)), "moderate");
        assert_eq!(shooting_condition(Some(false), Some(3200)), "low_light");
        assert_eq!(shooting_condition(None, Some(100)), "bright");
        assert_eq!(shooting_condition(None, None), "");
        assert_eq!(shooting_condition(None, Some(0)), "");
    }
}
