//! Numeric conversion helpers centralizing lossy casts.

use num_traits::cast::cast;

/// Truncate a f64 toward negative infinity and clamp it to the i32 range,
/// returning 0 for NaN values.
#[must_use]
pub fn floor_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    cast::<f64, i32>(value.clamp(min, max).floor()).unwrap_or(0)
}

/// Round a f64 to the nearest integer and clamp it to the i32 range,
/// returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    cast::<f64, i32>(value.clamp(min, max).round()).unwrap_or(0)
}

/// Floor a non-negative f64 into a u32 amount; negatives and NaN become 0.
#[must_use]
pub fn floor_f64_to_u32(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    let max = cast::<u32, f64>(u32::MAX).unwrap_or(f64::MAX);
    cast::<f64, u32>(value.min(max).floor()).unwrap_or(0)
}

/// Convert a collection length to f64 in a single place.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}
