use geographiclib_rs::{Geodesic, InverseGeodesic};

use crate::model::GeoFix;
use crate::prelude::{TrailError, TrailResult};

/// Solution of the inverse problem between two fixes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodesicSolution {
    /// Forward azimuth at the first point, degrees clockwise from north in [0, 360).
    pub azimuth_deg: f64,
    pub distance_m: f64,
}

/// Wraps a WGS84 `Geodesic` and rejects inputs that would produce a
/// meaningless azimuth.
#[derive(Debug, Clone)]
pub struct GeodesicHelper {
    ellipsoid: Geodesic,
}

impl GeodesicHelper {
    pub fn wgs84() -> Self {
        Self {
            ellipsoid: Geodesic::wgs84(),
        }
    }

    pub fn inverse(&self, from: &GeoFix, to: &GeoFix) -> TrailResult<GeodesicSolution> {
        validate(from)?;
        validate(to)?;
        if from == to {
            return Err(TrailError::DegenerateGeodesic(format!(
                "coincident points at ({}, {})",
                from.latitude, from.longitude
            )));
        }

        let (s12, azi1, _azi2, _a12): (f64, f64, f64, f64) =
            self.ellipsoid
                .inverse(from.latitude, from.longitude, to.latitude, to.longitude);
        if !s12.is_finite() || !azi1.is_finite() {
            return Err(TrailError::DegenerateGeodesic(format!(
                "no solution between ({}, {}) and ({}, {})",
                from.latitude, from.longitude, to.latitude, to.longitude
            )));
        }

        Ok(GeodesicSolution {
            azimuth_deg: super::AngleHelper::wrap360(azi1),
            distance_m: s12,
        })
    }
}

fn validate(fix: &GeoFix) -> TrailResult<()> {
    if !fix.latitude.is_finite() || !fix.longitude.is_finite() {
        return Err(TrailError::DegenerateGeodesic(format!(
            "non-finite coordinate ({}, {})",
            fix.latitude, fix.longitude
        )));
    }
    if !(-90.0..=90.0).contains(&fix.latitude) {
        return Err(TrailError::DegenerateGeodesic(format!(
            "latitude {} outside [-90, 90]",
            fix.latitude
        )));
    }
    Ok(())
}
