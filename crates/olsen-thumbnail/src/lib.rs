//! Aspect-preserving thumbnail ladder builder.
//!
//! Produces a subset of the fixed size ladder {64, 256, 512, 1024} for a
//! decoded image, JPEG-encoded at quality 85, with grayscale sources
//! promoted to RGB before encoding (spec.md §4.3). Never upscales.

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};

/// Longest-edge size-ladder tags. Mirrors `olsen_catalog::ThumbnailSize`
/// one-for-one; kept as a distinct type here so this crate has no
/// dependency on the catalog's storage layer (the indexer maps between
/// the two at the point where thumbnails are handed to `CatalogDb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeTag {
    Tiny,
    Small,
    Medium,
    Large,
}

impl SizeTag {
    pub const LADDER: [SizeTag; 4] = [SizeTag::Tiny, SizeTag::Small, SizeTag::Medium, SizeTag::Large];

    pub fn target_edge(&self) -> u32 {
        match self {
            SizeTag::Tiny => 64,
            SizeTag::Small => 256,
            SizeTag::Medium => 512,
            SizeTag::Large => 1024,
        }
    }
}

const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Fraction of images for which `build_ladder` is asked to emit
    /// diagnostics; the caller decides when to sample (spec.md §4.3: "never
    /// affects the returned bytes").
    pub sample_rate: f32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self { sample_rate: 0.05 }
    }
}

#[derive(Debug, Clone)]
pub struct ThumbnailDiagnostics {
    pub photo_path: String,
    pub width: u32,
    pub height: u32,
    pub sizes_built: Vec<&'static str>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BuiltThumbnail {
    pub size: SizeTag,
    pub data: Vec<u8>,
}

fn tag_label(tag: SizeTag) -> &'static str {
    match tag {
        SizeTag::Tiny => "64",
        SizeTag::Small => "256",
        SizeTag::Medium => "512",
        SizeTag::Large => "1024",
    }
}

/// Build the thumbnail ladder for `img`. `capture_diagnostics` is the
/// caller's per-file sampling decision (driven by `ThumbnailConfig::sample_rate`).
pub fn build_ladder(
    img: &DynamicImage,
    photo_path: &str,
    capture_diagnostics: bool,
) -> Result<(Vec<BuiltThumbnail>, Option<ThumbnailDiagnostics>)> {
    let (width, height) = img.dimensions();
    let longest_edge = width.max(height);
    let mut warnings = Vec::new();

    if longest_edge == 0 {
        anyhow::bail!("image {photo_path} has zero-sized dimensions");
    }

    let aspect_ratio = width as f64 / height as f64;
    if !(0.1..=10.0).contains(&aspect_ratio) {
        warnings.push(format!("unusual aspect ratio {aspect_ratio:.2}"));
    }
    if longest_edge < SizeTag::Tiny.target_edge() {
        warnings.push(format!("source longest edge {longest_edge} is smaller than the tiny tag"));
    }

    let mut thumbnails = Vec::new();
    for tag in SizeTag::LADDER {
        let target = tag.target_edge();
        if longest_edge >= target {
            let data = resize_and_encode(img, target)?;
            thumbnails.push(BuiltThumbnail { size: tag, data });
        }
    }

    // Degenerate case: the ladder is empty (source smaller than even the
    // tiny tag) — fall back to a single tiny-tagged thumbnail of the
    // original, guaranteeing every decoded photo has at least one thumbnail.
    if thumbnails.is_empty() {
        let data = encode_jpeg(img)?;
        thumbnails.push(BuiltThumbnail {
            size: SizeTag::Tiny,
            data,
        });
    }

    let diagnostics = capture_diagnostics.then(|| ThumbnailDiagnostics {
        photo_path: photo_path.to_string(),
        width,
        height,
        sizes_built: thumbnails.iter().map(|t| tag_label(t.size)).collect(),
        warnings,
    });

    Ok((thumbnails, diagnostics))
}

fn resize_and_encode(img: &DynamicImage, target_edge: u32) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    let (new_width, new_height) = if width >= height {
        let ratio = target_edge as f64 / width as f64;
        (target_edge, (height as f64 * ratio).round().max(1.0) as u32)
    } else {
        let ratio = target_edge as f64 / height as f64;
        ((width as f64 * ratio).round().max(1.0) as u32, target_edge)
    };

    let resized = img.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3);
    encode_jpeg(&resized)
}

/// JPEG encoding requires RGB; grayscale sources are promoted before
/// encoding (spec.md §4.3's forced contract).
fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ExtendedColorType::Rgb8)
        .context("failed to encode thumbnail as JPEG")?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid_jpeg(data: &[u8]) -> bool {
        data.len() >= 4
            && data[0] == 0xFF
            && data[1] == 0xD8
            && data[data.len() - 2] == 0xFF
            && data[data.len() - 1] == 0xD9
    }

    #[test]
    fn full_ladder_for_large_image() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(2000, 1500, image::Rgb([10, 20, 30])));
        let (thumbs, _) = build_ladder(&img, "/a.jpg", false).unwrap();
        assert_eq!(thumbs.len(), 4);
        for t in &thumbs {
            assert!(is_valid_jpeg(&t.data));
        }
    }

    #[test]
    fn aspect_ratio_preserved_for_256_tag() {
        // 600x800 input: longest edge 800 -> 256 tag constrains to 256 on
        // the longest edge (height here), width scales to 192.
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(600, 800, image::Rgb([1, 2, 3])));
        let data = resize_and_encode(&img, 256).unwrap();
        let decoded = image::load_from_memory(&data).unwrap();
        let (w, h) = decoded.dimensions();
        assert_eq!(h, 256);
        assert!((w as i64 - 192).abs() <= 1);
    }

    #[test]
    fn square_input_produces_square_thumbnail() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(800, 800, image::Rgb([1, 2, 3])));
        let data = resize_and_encode(&img, 256).unwrap();
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(decoded.dimensions(), (256, 256));
    }

    #[test]
    fn small_image_yields_degenerate_tiny_only_thumbnail() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(40, 30, image::Rgb([5, 5, 5])));
        let (thumbs, _) = build_ladder(&img, "/tiny.jpg", false).unwrap();
        assert_eq!(thumbs.len(), 1);
        assert_eq!(thumbs[0].size, SizeTag::Tiny);
        assert!(is_valid_jpeg(&thumbs[0].data));
    }

    #[test]
    fn grayscale_source_promotes_to_rgb_jpeg() {
        let gray = image::GrayImage::from_pixel(300, 300, image::Luma([128]));
        let img = DynamicImage::ImageLuma8(gray);
        let (thumbs, _) = build_ladder(&img, "/gray.jpg", false).unwrap();
        assert!(!thumbs.is_empty());
        for t in &thumbs {
            assert!(is_valid_jpeg(&t.data));
            let decoded = image::load_from_memory(&t.data).unwrap();
            assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
        }
    }

    #[test]
    fn never_upscales_past_ladder_sizes() {
        // 300px longest edge: only the 64 and 256 tags should appear,
        // never the 512/1024 tags that would require upscaling.
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(300, 200, image::Rgb([9, 9, 9])));
        let (thumbs, _) = build_ladder(&img, "/medium.jpg", false).unwrap();
        let tags: Vec<_> = thumbs.iter().map(|t| t.size).collect();
        assert!(tags.contains(&SizeTag::Tiny));
        assert!(tags.contains(&SizeTag::Small));
        assert!(!tags.contains(&SizeTag::Medium));
        assert!(!tags.contains(&SizeTag::Large));
    }

    #[test]
    fn diagnostics_captured_only_when_requested() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(1000, 1000, image::Rgb([1, 1, 1])));
        let (_, diag_off) = build_ladder(&img, "/x.jpg", false).unwrap();
        assert!(diag_off.is_none());

        let (_, diag_on) = build_ladder(&img, "/x.jpg", true).unwrap();
        let diag = diag_on.unwrap();
        assert_eq!(diag.width, 1000);
        assert_eq!(diag.height, 1000);
        assert_eq!(diag.photo_path, "/x.jpg");
    }
}
