//! Angular arithmetic for target tracking.
//!
//! The filter keeps the tracked plate's yaw continuous (unbounded) so the
//! yaw-rate state stays differentiable across the ±π seam; observations
//! arrive on the principal branch. These helpers convert between the two.

use std::f64::consts::PI;

/// Normalize angle to [-π, π].
///
/// # Example
/// ```
/// use lakshya_aim::core::math::normalize_angle;
/// use std::f64::consts::PI;
///
/// assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-9);
/// assert!((normalize_angle(-3.0 * PI) - (-PI)).abs() < 1e-9);
/// ```
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Shortest signed angular difference from angle `a` to angle `b`.
#[inline]
pub fn angle_diff(a: f64, b: f64) -> f64 {
    normalize_angle(b - a)
}

/// Unwrap `angle` onto the branch containing `reference`.
///
/// Returns the representative of `angle` (mod 2π) that lies within
/// (reference − π, reference + π]. Used to keep the filter's yaw state
/// continuous across updates while observations stay on the principal
/// branch.
///
/// # Example
/// ```
/// use lakshya_aim::core::math::unwrap_angle;
/// use std::f64::consts::PI;
///
/// // 3.10 rad tracked, observation arrives as -3.10 rad: the continuous
/// // representative is just past π, not a 2π jump backwards.
/// let unwrapped = unwrap_angle(3.10, -3.10);
/// assert!((unwrapped - (2.0 * PI - 3.10)).abs() < 1e-9);
/// ```
#[inline]
pub fn unwrap_angle(reference: f64, angle: f64) -> f64 {
    reference + angle_diff(reference, angle)
}
