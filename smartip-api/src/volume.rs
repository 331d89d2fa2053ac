//! Volume level conversions
//!
//! The device works in dB on `[-130, 0]`. Control surfaces usually want a
//! linear fraction on `[0, 1]`, mapped as `percent = (db + 130) / 130`.

/// Lowest settable level in dB
pub const MIN_LEVEL_DB: f64 = -130.0;

/// Highest settable level in dB
pub const MAX_LEVEL_DB: f64 = 0.0;

const RANGE_DB: f64 = MAX_LEVEL_DB - MIN_LEVEL_DB;

/// Clamp a requested level into the device range
///
/// Returns `None` for NaN, which has no meaningful level.
pub fn clamp_db(db: f64) -> Option<f64> {
    if db.is_nan() {
        None
    } else {
        Some(db.clamp(MIN_LEVEL_DB, MAX_LEVEL_DB))
    }
}

/// Linear fraction for a level in dB
pub fn db_to_percent(db: f64) -> f64 {
    (db - MIN_LEVEL_DB) / RANGE_DB
}

/// Level in dB for a linear fraction, clamping the fraction to `[0, 1]`
///
/// Returns `None` for NaN.
pub fn percent_to_db(percent: f64) -> Option<f64> {
    if percent.is_nan() {
        None
    } else {
        Some(percent.clamp(0.0, 1.0) * RANGE_DB + MIN_LEVEL_DB)
    }
}

/// Round a level to the single decimal the device accepts
///
/// Midpoints round to even (`-20.25` becomes `-20.2`).
pub fn round_db(db: f64) -> f64 {
    (db * 10.0).round_ties_even() / 10.0
}
