//! File hashing, EXIF parsing, and image/RAW decode dispatch for the Olsen indexer.

pub mod decode;
pub mod exif;
pub mod hash;

pub use decode::{decode_image, raw_supported, DecodeError, DecodeOutcome};
pub use exif::{read_exif, ExifData};
pub use hash::hash_file;
