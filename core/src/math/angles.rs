/// Degree-based angle arithmetic for compass headings.
pub struct AngleHelper;

impl AngleHelper {
    /// Reduces `degrees` into [0, 360).
    pub fn wrap360(degrees: f64) -> f64 {
        let wrapped = degrees.rem_euclid(360.0);
        // rem_euclid rounds tiny negative inputs up to exactly 360.0
        if wrapped >= 360.0 {
            0.0
        } else {
            wrapped
        }
    }

    /// Signed difference folded as `((x + 180) mod 360) - 180`, giving [-180, 180).
    pub fn wrap180(degrees: f64) -> f64 {
        (degrees + 180.0).rem_euclid(360.0) - 180.0
    }

    /// Mean direction of a set of headings, computed on unit vectors so that
    /// values on either side of north average to north rather than south.
    ///
    /// Returns `None` for an empty slice.
    pub fn circular_mean(degrees: &[f64]) -> Option<f64> {
        if degrees.is_empty() {
            return None;
        }
        let (sin_sum, cos_sum) = degrees.iter().fold((0.0_f64, 0.0_f64), |(s, c), &d| {
            let radians = d.to_radians();
            (s + radians.sin(), c + radians.cos())
        });
        Some(Self::wrap360(sin_sum.atan2(cos_sum).to_degrees()))
    }

    /// Unsigned angular separation in [0, 180].
    pub fn separation(a: f64, b: f64) -> f64 {
        Self::wrap180(a - b).abs()
    }
}
