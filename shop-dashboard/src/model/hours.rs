//! Whole-second arithmetic on hour values
//!
//! Hours are exposed as reals but accrue one second at a time. Re-deriving the
//! whole-second count before each increment keeps repeated ticks on exact
//! second boundaries: 3600 one-second accruals give exactly `1.0`.

/// Seconds in one hour
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Add `seconds` whole seconds to an hour value
///
/// # Example
///
/// ```rust
/// use shop_dashboard::model::hours::add_seconds;
///
/// let mut hours = 0.0;
/// for _ in 0..3600 {
///     hours = add_seconds(hours, 1);
/// }
/// assert_eq!(hours, 1.0);
/// ```
#[must_use]
pub fn add_seconds(hours: f64, seconds: u32) -> f64 {
    (whole_seconds(hours) + f64::from(seconds)) / SECONDS_PER_HOUR
}

/// Nearest whole-second count for an hour value
#[must_use]
pub fn whole_seconds(hours: f64) -> f64 {
    (hours * SECONDS_PER_HOUR).round()
}
