//! Numeric helpers for monetary aggregates.

/// Round `value` half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Percent change from `previous` to `current`.
///
/// Returns `0.0` when `previous` is zero (no baseline to compare against).
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}
