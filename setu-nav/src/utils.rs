//! Shared angle and grid helpers
//!
//! Headings are degrees, 0 along +y, increasing clockwise.

/// Normalize angle to [0, 360)
#[inline]
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds up to 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Normalize angle to (-180, 180]
#[inline]
pub fn signed_degrees(angle: f64) -> f64 {
    let wrapped = normalize_degrees(angle);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

/// Round a value to the nearest multiple of `step`
#[inline]
pub fn closest_multiple(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

/// The diagonal heading (45, 135, 225 or 315) in the quadrant of `theta`
pub fn closest_reference(theta: f64) -> f64 {
    let theta = normalize_degrees(theta);
    if theta < 90.0 {
        45.0
    } else if theta < 180.0 {
        135.0
    } else if theta < 270.0 {
        225.0
    } else {
        315.0
    }
}

/// Bearing from one point to another: `atan2(dx, dy)` in degrees, [0, 360)
#[inline]
pub fn bearing(from_x: f64, from_y: f64, to_x: f64, to_y: f64) -> f64 {
    normalize_degrees((to_x - from_x).atan2(to_y - from_y).to_degrees())
}
