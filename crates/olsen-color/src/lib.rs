//! Dominant-color palette extraction (k-means over RGB) and Berlin-Kay
//! color-name classification, per spec.md §4.4.

use image::{DynamicImage, GenericImageView};

const K: usize = 5;
const MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub rgb: (u8, u8, u8),
    /// H in [0, 360), S and L in [0, 100], all rounded to the nearest integer.
    pub hsl: (u16, u8, u8),
    /// Fraction of the sampled pixels belonging to this cluster; sums to
    /// ~1.0 across a photo's samples (tolerance ±0.02, see catalog invariants).
    pub weight: f32,
}

/// Extract a palette of up to `K` dominant colors from `img` via k-means
/// over RGB pixel values. Seeding is deterministic (evenly strided through
/// the raster-scan pixel buffer) so the same image always yields the same
/// palette.
pub fn extract_palette(img: &DynamicImage) -> Vec<ColorSample> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let rgb = img.to_rgb8();
    let pixels: Vec<(f64, f64, f64)> = rgb
        .pixels()
        .map(|p| (p[0] as f64, p[1] as f64, p[2] as f64))
        .collect();

    if pixels.is_empty() {
        return Vec::new();
    }

    let k = K.min(pixels.len());
    let mut centroids = seed_centroids(&pixels, k);
    let mut assignments = vec![0usize; pixels.len()];

    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (i, pixel) in pixels.iter().enumerate() {
            let nearest = nearest_centroid(*pixel, &centroids);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }

        let mut sums = vec![(0.0f64, 0.0f64, 0.0f64); k];
        let mut counts = vec![0usize; k];
        for (i, pixel) in pixels.iter().enumerate() {
            let c = assignments[i];
            sums[c].0 += pixel.0;
            sums[c].1 += pixel.1;
            sums[c].2 += pixel.2;
            counts[c] += 1;
        }

        for c in 0..k {
            if counts[c] > 0 {
                centroids[c] = (
                    sums[c].0 / counts[c] as f64,
                    sums[c].1 / counts[c] as f64,
                    sums[c].2 / counts[c] as f64,
                );
            }
        }

        if !changed {
            break;
        }
    }

    let mut counts = vec![0usize; k];
    for &a in &assignments {
        counts[a] += 1;
    }

    let total = pixels.len() as f32;
    (0..k)
        .filter(|&c| counts[c] > 0)
        .map(|c| {
            let (r, g, b) = centroids[c];
            let rgb = (r.round() as u8, g.round() as u8, b.round() as u8);
            ColorSample {
                rgb,
                hsl: rgb_to_hsl(rgb.0, rgb.1, rgb.2),
                weight: counts[c] as f32 / total,
            }
        })
        .collect()
}

fn seed_centroids(pixels: &[(f64, f64, f64)], k: usize) -> Vec<(f64, f64, f64)> {
    let stride = pixels.len() / k;
    (0..k).map(|i| pixels[i * stride]).collect()
}

fn nearest_centroid(pixel: (f64, f64, f64), centroids: &[(f64, f64, f64)]) -> usize {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let dr = pixel.0 - c.0;
            let dg = pixel.1 - c.1;
            let db = pixel.2 - c.2;
            (i, dr * dr + dg * dg + db * db)
        })
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Standard RGB -> HSL conversion. Achromatic inputs yield H=0, S=0.
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (u16, u8, u8) {
    let rf = r as f64 / 255.0;
    let gf = g as f64 / 255.0;
    let bf = b as f64 / 255.0;

    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;
    let l = (max + min) / 2.0;

    if delta.abs() < f64::EPSILON {
        return (0, 0, (l * 100.0).round() as u8);
    }

    let s = if l < 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };

    let h = if (max - rf).abs() < f64::EPSILON {
        60.0 * (((gf - bf) / delta) % 6.0)
    } else if (max - gf).abs() < f64::EPSILON {
        60.0 * (((bf - rf) / delta) + 2.0)
    } else {
        60.0 * (((rf - gf) / delta) + 4.0)
    };

    let h = if h < 0.0 { h + 360.0 } else { h };

    ((h.round() as i64).rem_euclid(360) as u16, (s * 100.0).round() as u8, (l * 100.0).round() as u8)
}

/// Berlin-Kay-derived 11-term color naming plus black/white/gray/bw and a
/// catch-all, assigned by the ordered rules in spec.md §4.4 (first match wins).
pub fn classify(h: u16, s: u8, l: u8) -> &'static str {
    if s < 5 && l < 20 {
        return "black";
    }
    if s < 5 && l > 80 {
        return "white";
    }
    if s < 10 {
        return "gray";
    }
    if s < 15 {
        return "bw";
    }
    if (20..=40).contains(&h) && l < 50 {
        return "brown";
    }
    if h <= 15 || h >= 345 {
        return "red";
    }
    if (16..=45).contains(&h) {
        return "orange";
    }
    if (46..=75).contains(&h) {
        return "yellow";
    }
    if (76..=165).contains(&h) {
        return "green";
    }
    if (166..=255).contains(&h) {
        return "blue";
    }
    if (256..=290).contains(&h) {
        return "purple";
    }
    if (291..=344).contains(&h) {
        return "pink";
    }
    "other"
}

/// Inverse of `classify`, used by the search layer to translate a requested
/// color name into an HSL predicate over a photo's color samples.
pub fn color_name_matches(name: &str, h: u16, s: u8, l: u8) -> bool {
    match name {
        "red" => h <= 15 || h >= 345,
        "grey" | "gray" => s < 20 && (20..=80).contains(&l),
        "black" => l < 20,
        "white" => l > 80,
        "brown" => (20..=40).contains(&h),
        "orange" => (16..=45).contains(&h),
        "yellow" => (46..=75).contains(&h),
        "green" => (76..=165).contains(&h),
        "blue" => (166..=255).contains(&h),
        "purple" => (256..=290).contains(&h),
        "pink" => (291..=344).contains(&h),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_to_hsl_pure_red() {
        let (h, s, l) = rgb_to_hsl(255, 0, 0);
        assert_eq!(h, 0);
        assert_eq!(s, 100);
        assert_eq!(l, 50);
    }

    #[test]
    fn rgb_to_hsl_achromatic_gray() {
        let (h, s, l) = rgb_to_hsl(128, 128, 128);
        assert_eq!(h, 0);
        assert_eq!(s, 0);
        assert_eq!(l, 50);
    }

    #[test]
    fn rgb_to_hsl_white_and_black() {
        assert_eq!(rgb_to_hsl(255, 255, 255), (0, 0, 100));
        assert_eq!(rgb_to_hsl(0, 0, 0), (0, 0, 0));
    }

    #[test]
    fn classify_black_white_gray() {
        assert_eq!(classify(0, 2, 10), "black");
        assert_eq!(classify(0, 2, 90), "white");
        assert_eq!(classify(0, 8, 50), "gray");
        assert_eq!(classify(0, 12, 50), "bw");
    }

    #[test]
    fn classify_brown_before_red() {
        // H=30, S=40, L=30 would match the red-adjacent hue range were it
        // not for the brown rule firing first when L < 50.
        assert_eq!(classify(30, 40, 30), "brown");
        assert_eq!(classify(30, 40, 70), "orange");
    }

    #[test]
    fn classify_hue_bands() {
        assert_eq!(classify(5, 80, 60), "red");
        assert_eq!(classify(350, 80, 60), "red");
        assert_eq!(classify(30, 80, 60), "orange");
        assert_eq!(classify(60, 80, 60), "yellow");
        assert_eq!(classify(120, 80, 60), "green");
        assert_eq!(classify(200, 80, 60), "blue");
        assert_eq!(classify(270, 80, 60), "purple");
        assert_eq!(classify(310, 80, 60), "pink");
    }

    #[test]
    fn color_name_matches_handles_red_wraparound() {
        assert!(color_name_matches("red", 3, 80, 50));
        assert!(color_name_matches("red", 358, 80, 50));
        assert!(!color_name_matches("red", 180, 80, 50));
    }

    #[test]
    fn color_name_matches_achromatic_cases() {
        assert!(color_name_matches("black", 10, 50, 15));
        assert!(color_name_matches("white", 10, 50, 90));
        assert!(color_name_matches("grey", 10, 10, 50));
        assert!(!color_name_matches("grey", 10, 50, 50));
    }

    #[test]
    fn extract_palette_weights_sum_to_one() {
        let mut img = image::RgbImage::new(20, 20);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = if x < 10 {
                image::Rgb([255, 0, 0])
            } else if y < 10 {
                image::Rgb([0, 255, 0])
            } else {
                image::Rgb([0, 0, 255])
            };
        }
        let dynamic = DynamicImage::ImageRgb8(img);
        let palette = extract_palette(&dynamic);
        assert!(!palette.is_empty());
        let total_weight: f32 = palette.iter().map(|c| c.weight).sum();
        assert!((total_weight - 1.0).abs() < 0.02);
    }

    #[test]
    fn extract_palette_on_uniform_image_yields_single_cluster() {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]));
        let dynamic = DynamicImage::ImageRgb8(img);
        let palette = extract_palette(&dynamic);
        assert_eq!(palette.len(), 1);
        assert!((palette[0].weight - 1.0).abs() < 0.02);
        assert_eq!(palette[0].rgb, (10, 20, 30));
    }

    #[test]
    fn extract_palette_empty_image_returns_empty_palette() {
        let img = image::RgbImage::new(0, 0);
        let dynamic = DynamicImage::ImageRgb8(img);
        assert!(extract_palette(&dynamic).is_empty());
    }
}
