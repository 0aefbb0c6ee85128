use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::model::{GeoFix, ImageRecord, TileReference};

/// Timestamp layout written by the ingestion step.
pub const CAPTURE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Why a descriptor did not become an [`ImageRecord`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DescriptorIssue {
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("unparseable capture time {0:?}")]
    BadTimestamp(String),
    #[error("no GPS fix")]
    NoFix,
}

/// Per-image metadata file `<img>/<id>.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageDescriptor {
    #[serde(rename = "creationDate", alias = "captureTime", default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl ImageDescriptor {
    pub fn into_record(self, id: &str) -> Result<ImageRecord, DescriptorIssue> {
        let raw_time = self
            .creation_date
            .ok_or(DescriptorIssue::MissingField("creationDate"))?;
        let latitude = self
            .latitude
            .ok_or(DescriptorIssue::MissingField("latitude"))?;
        let longitude = self
            .longitude
            .ok_or(DescriptorIssue::MissingField("longitude"))?;

        let capture_time = NaiveDateTime::parse_from_str(raw_time.trim(), CAPTURE_TIME_FORMAT)
            .map_err(|_| DescriptorIssue::BadTimestamp(raw_time.clone()))?;
        let fix = GeoFix::from_raw(latitude, longitude).ok_or(DescriptorIssue::NoFix)?;

        Ok(ImageRecord::new(id, capture_time, fix))
    }
}

/// Tile generator output `<img>/<id>/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileDescriptor {
    #[serde(rename = "multiRes")]
    pub multi_res: MultiResDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiResDescriptor {
    #[serde(rename = "shtHash")]
    pub sht_hash: String,
    pub path: String,
    #[serde(rename = "fallbackPath")]
    pub fallback_path: String,
    pub extension: String,
    #[serde(rename = "tileResolution")]
    pub tile_resolution: u32,
    #[serde(rename = "maxLevel")]
    pub max_level: u32,
    #[serde(rename = "cubeResolution")]
    pub cube_resolution: u32,
}

impl TileDescriptor {
    pub fn into_reference(self, base_path: String) -> TileReference {
        let multi_res = self.multi_res;
        TileReference {
            base_path,
            content_hash: multi_res.sht_hash,
            path: multi_res.path,
            fallback_path: multi_res.fallback_path,
            extension: multi_res.extension,
            tile_resolution: multi_res.tile_resolution,
            max_level: multi_res.max_level,
            cube_resolution: multi_res.cube_resolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ImageDescriptor {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn complete_descriptor_becomes_record() {
        let record = parse(
            r#"{"originalName": "IMG_0001.JPG", "creationDate": "2022-06-15 10:04:31",
                "latitude": 41.4123, "longitude": -81.6012}"#,
        )
        .into_record("abc")
        .unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(
            record.capture_time.format(CAPTURE_TIME_FORMAT).to_string(),
            "2022-06-15 10:04:31"
        );
        assert_eq!(record.fix.longitude, -81.6012);
    }

    #[test]
    fn capture_time_alias_is_accepted() {
        let record = parse(
            r#"{"captureTime": "2022-06-15 10:04:31", "latitude": 41.4, "longitude": -81.6}"#,
        )
        .into_record("x");
        assert!(record.is_ok());
    }

    #[test]
    fn incomplete_descriptors_report_the_issue() {
        let missing = parse(r#"{"latitude": 41.4, "longitude": -81.6}"#).into_record("a");
        assert_eq!(missing, Err(DescriptorIssue::MissingField("creationDate")));

        let bad_time = parse(
            r#"{"creationDate": "2022:06:15 10:04:31", "latitude": 41.4, "longitude": -81.6}"#,
        )
        .into_record("b");
        assert!(matches!(bad_time, Err(DescriptorIssue::BadTimestamp(_))));

        let no_fix = parse(
            r#"{"creationDate": "2022-06-15 10:04:31", "latitude": 0.0, "longitude": 0.0}"#,
        )
        .into_record("c");
        assert_eq!(no_fix, Err(DescriptorIssue::NoFix));
    }

    #[test]
    fn tile_descriptor_maps_to_reference() {
        let descriptor: TileDescriptor = serde_json::from_str(
            r#"{"multiRes": {"shtHash": "h1", "path": "/%l/%s%y_%x",
                "fallbackPath": "/fallback/%s", "extension": "jpg", "tileResolution": 512,
                "maxLevel": 4, "cubeResolution": 2048}}"#,
        )
        .unwrap();
        let reference = descriptor.into_reference("/trails/a/img/x".into());
        assert_eq!(reference.content_hash, "h1");
        assert_eq!(reference.base_path, "/trails/a/img/x");
        assert_eq!(reference.cube_resolution, 2048);
    }
}
