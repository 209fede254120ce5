/// Schema for the prayer-time cache and location preferences.
pub const SCHEMA: &str = r#"
-- One row per calendar date; replaced as a whole on refresh
CREATE TABLE IF NOT EXISTS prayer_times (
    date TEXT PRIMARY KEY,
    fajr TEXT NOT NULL,
    sunrise TEXT NOT NULL,
    dhuhr TEXT NOT NULL,
    asr TEXT NOT NULL,
    maghrib TEXT NOT NULL,
    isha TEXT NOT NULL,
    calculation_method TEXT NOT NULL,
    last_updated INTEGER NOT NULL
);

-- Last-known location and selected country
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
