//! Perceptual hashing (average-hash / aHash) and Hamming-distance comparison,
//! per spec.md §4.5.

use image::DynamicImage;

/// Similarity band for a Hamming distance between two hashes, used by the
/// burst detector and duplicate-detection heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityBand {
    NearIdentical,
    VerySimilar,
    BurstVariation,
    Loose,
    Different,
}

/// Compute the average hash of `img`: downsample to 8x8 grayscale, threshold
/// each pixel against the block mean, pack into a 64-bit value.
pub fn compute_hash(img: &DynamicImage) -> u64 {
    let small = img.resize_exact(8, 8, image::imageops::FilterType::Lanczos3);
    let gray = small.to_luma8();

    let mean: u32 = gray.pixels().map(|p| p[0] as u32).sum::<u32>() / 64;
    let mut hash: u64 = 0;
    for (i, pixel) in gray.pixels().enumerate() {
        if pixel[0] as u32 >= mean {
            hash |= 1 << i;
        }
    }
    hash
}

/// Serialize a hash as a fixed-width hex string for catalog storage.
pub fn hash_to_hex(hash: u64) -> String {
    format!("{hash:016x}")
}

pub fn hash_from_hex(s: &str) -> Option<u64> {
    u64::from_str_radix(s, 16).ok()
}

/// Integer bit-difference between two hashes.
pub fn hamming(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Bucket a Hamming distance into the bands used for burst/duplicate
/// heuristics (spec.md §4.5).
pub fn similarity_band(distance: u32) -> SimilarityBand {
    match distance {
        0..=5 => SimilarityBand::NearIdentical,
        6..=10 => SimilarityBand::VerySimilar,
        11..=15 => SimilarityBand::BurstVariation,
        16..=20 => SimilarityBand::Loose,
        _ => SimilarityBand::Different,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(r: u8, g: u8, b: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_pixel(64, 64, image::Rgb([r, g, b])))
    }

    #[test]
    fn identical_images_produce_identical_hashes() {
        let a = solid(200, 100, 50);
        let b = solid(200, 100, 50);
        assert_eq!(compute_hash(&a), compute_hash(&b));
    }

    #[test]
    fn different_images_produce_different_hashes() {
        let gradient = DynamicImage::ImageRgb8(image::RgbImage::from_fn(64, 64, |x, _| {
            image::Rgb([(x * 4) as u8, 0, 0])
        }));
        let checkerboard = DynamicImage::ImageRgb8(image::RgbImage::from_fn(64, 64, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        }));
        assert_ne!(compute_hash(&gradient), compute_hash(&checkerboard));
    }

    #[test]
    fn hamming_distance_basic() {
        assert_eq!(hamming(0, 0), 0);
        assert_eq!(hamming(0, 1), 1);
        assert_eq!(hamming(0, u64::MAX), 64);
    }

    #[test]
    fn hex_roundtrip() {
        let hash = compute_hash(&solid(10, 20, 30));
        let hex = hash_to_hex(hash);
        assert_eq!(hex.len(), 16);
        assert_eq!(hash_from_hex(&hex), Some(hash));
    }

    #[test]
    fn similarity_bands_cover_expected_ranges() {
        assert_eq!(similarity_band(0), SimilarityBand::NearIdentical);
        assert_eq!(similarity_band(5), SimilarityBand::NearIdentical);
        assert_eq!(similarity_band(6), SimilarityBand::VerySimilar);
        assert_eq!(similarity_band(10), SimilarityBand::VerySimilar);
        assert_eq!(similarity_band(11), SimilarityBand::BurstVariation);
        assert_eq!(similarity_band(15), SimilarityBand::BurstVariation);
        assert_eq!(similarity_band(16), SimilarityBand::Loose);
        assert_eq!(similarity_band(20), SimilarityBand::Loose);
        assert_eq!(similarity_band(21), SimilarityBand::Different);
        assert_eq!(similarity_band(64), SimilarityBand::Different);
    }
}
