//! Numeric utilities: safe and centralized integer conversions.
//!
//! Prefer fallible conversions when an out-of-range value should reject the input (stage
//! arguments such as `$limit`), and saturating ones for best-effort values such as durations
//! written to logs.

use bson::Bson;

#[inline]
#[must_use]
pub fn i64_to_usize(v: i64) -> Option<usize> {
    usize::try_from(v).ok()
}

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn u128_to_u64_saturating(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

/// Elapsed milliseconds since `start`, saturated to `u64`.
#[inline]
#[must_use]
pub fn elapsed_ms(start: std::time::Instant) -> u64 {
    u128_to_u64_saturating(start.elapsed().as_millis())
}

/// Interprets a BSON number as a non-negative count. Doubles must be integral.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn bson_to_usize(v: &Bson) -> Option<usize> {
    match v {
        Bson::Int32(i) => i64_to_usize(i64::from(*i)),
        Bson::Int64(i) => i64_to_usize(*i),
        Bson::Double(f) if f.is_finite() && f.fract() == 0.0 && *f >= 0.0 && *f <= 9.0e15 => {
            i64_to_usize(*f as i64)
        }
        _ => None,
    }
}
