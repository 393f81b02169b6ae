//! Signed delta mapping
//!
//! Positive deltas take the odd codes and non-positive deltas the even codes,
//! so `0, 1, -1, 2, -2` map to `0, 1, 2, 3, 4`.

/// Map a signed delta onto an unsigned symbol
#[inline]
pub fn to_zig(x: i32) -> u32 {
    if x > 0 {
        (x as u32) * 2 - 1
    } else {
        x.unsigned_abs() * 2
    }
}

/// Inverse of [`to_zig`]
#[inline]
pub fn from_zig(z: u32) -> i32 {
    if z & 1 == 1 {
        z.div_ceil(2) as i32
    } else {
        -((z / 2) as i32)
    }
}
