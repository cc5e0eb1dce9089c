//! Catalog schema. Table names and columns follow spec.md §6 verbatim.

pub const SCHEMA_VERSION: i64 = 1;

pub const CREATE_TABLES_SQL: &str = "
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL UNIQUE,
    file_hash TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    date_taken TEXT,
    date_digitized TEXT,
    last_modified TEXT,
    indexed_at TEXT NOT NULL,
    camera_make TEXT,
    camera_model TEXT,
    lens_make TEXT,
    lens_model TEXT,
    iso INTEGER,
    aperture REAL,
    shutter_speed TEXT,
    exposure_compensation REAL,
    focal_length REAL,
    focal_length_35mm REAL,
    width INTEGER,
    height INTEGER,
    orientation INTEGER,
    color_space TEXT,
    white_balance TEXT,
    flash_fired INTEGER,
    latitude REAL,
    longitude REAL,
    altitude REAL,
    perceptual_hash TEXT,
    time_of_day TEXT NOT NULL DEFAULT '',
    season TEXT NOT NULL DEFAULT '',
    focal_category TEXT NOT NULL DEFAULT '',
    shooting_condition TEXT NOT NULL DEFAULT '',
    burst_group_id TEXT REFERENCES burst_groups(id),
    burst_sequence INTEGER,
    burst_count INTEGER,
    is_burst_representative INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS thumbnails (
    photo_id INTEGER NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
    size TEXT NOT NULL,
    data BLOB NOT NULL,
    PRIMARY KEY (photo_id, size)
);

CREATE TABLE IF NOT EXISTS photo_colors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    photo_id INTEGER NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
    r INTEGER NOT NULL,
    g INTEGER NOT NULL,
    b INTEGER NOT NULL,
    hue REAL NOT NULL,
    saturation REAL NOT NULL,
    lightness REAL NOT NULL,
    weight REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS burst_groups (
    id TEXT PRIMARY KEY,
    photo_count INTEGER NOT NULL,
    date_taken TEXT,
    camera_make TEXT,
    camera_model TEXT,
    representative_photo_id INTEGER,
    time_span_seconds REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS catalog_meta (
    key TEXT PRIMARY KEY,
    value TEXT
);

CREATE INDEX IF NOT EXISTS idx_photos_file_hash ON photos(file_hash);
CREATE INDEX IF NOT EXISTS idx_photos_file_path ON photos(file_path);
CREATE INDEX IF NOT EXISTS idx_photos_date_taken ON photos(date_taken);
CREATE INDEX IF NOT EXISTS idx_photos_camera_make ON photos(camera_make);
CREATE INDEX IF NOT EXISTS idx_photos_camera_model ON photos(camera_model);
CREATE INDEX IF NOT EXISTS idx_photos_burst_group_id ON photos(burst_group_id);
CREATE INDEX IF NOT EXISTS idx_photo_colors_photo_id ON photo_colors(photo_id);
";
