use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A GPS position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoFix {
    /// Interprets raw descriptor coordinates. Cameras write 0.0 when they
    /// had no satellite lock, so a zero on either axis means "no fix".
    pub fn from_raw(latitude: f64, longitude: f64) -> Option<Self> {
        if latitude == 0.0 || longitude == 0.0 {
            None
        } else {
            Some(Self {
                latitude,
                longitude,
            })
        }
    }
}

/// One photo of the trail, as loaded from its descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub id: String,
    pub capture_time: NaiveDateTime,
    pub fix: GeoFix,
}

impl ImageRecord {
    pub fn new(id: impl Into<String>, capture_time: NaiveDateTime, fix: GeoFix) -> Self {
        Self {
            id: id.into(),
            capture_time,
            fix,
        }
    }
}

/// Smoothed travel heading of a sequenced image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BearingRecord {
    pub image_id: String,
    pub heading_deg: f64,
}
