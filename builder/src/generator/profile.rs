use anyhow::Context;
use chrono::{Duration, NaiveDate};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::Path;
use trailcore::interface::descriptor::CAPTURE_TIME_FORMAT;

const METERS_PER_DEG_LAT: f64 = 111_132.954;

/// Shape of a synthetic walk used to exercise the pipeline without a camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailProfile {
    pub images: usize,
    pub spacing_m: f64,
    pub jitter_m: f64,
    pub start_heading_deg: f64,
    /// Heading change applied every `turn_every` images; 0 disables turns.
    pub turn_every: usize,
    pub turn_deg: f64,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub interval_s: i64,
    /// Extra images written without a GPS fix; the loader is expected to skip them.
    pub unlocated: usize,
    pub seed: u64,
}

impl Default for TrailProfile {
    fn default() -> Self {
        Self {
            images: 60,
            spacing_m: 4.0,
            jitter_m: 0.5,
            start_heading_deg: 45.0,
            turn_every: 15,
            turn_deg: 70.0,
            start_latitude: 41.3771,
            start_longitude: -81.6418,
            interval_s: 2,
            unlocated: 0,
            seed: 0,
        }
    }
}

/// Ids of the images written, in capture order.
#[derive(Debug, Clone, Default)]
pub struct SyntheticTrail {
    pub located: Vec<String>,
    pub unlocated: Vec<String>,
}

fn tile_descriptor(rng: &mut StdRng) -> serde_json::Value {
    json!({
        "multiRes": {
            "shtHash": format!("{:016x}", rng.gen::<u64>()),
            "path": "/%l/%s%y_%x",
            "fallbackPath": "/fallback/%s",
            "extension": "jpg",
            "tileResolution": 512,
            "maxLevel": 4,
            "cubeResolution": 2448,
        }
    })
}

fn write_json(path: &Path, value: &serde_json::Value) -> anyhow::Result<()> {
    let contents = serde_json::to_string_pretty(value)?;
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

/// Writes descriptors and tile configs for a synthetic trail into `<trail_dir>/img`.
pub fn write_synthetic_trail(
    trail_dir: &Path,
    profile: &TrailProfile,
) -> anyhow::Result<SyntheticTrail> {
    let image_dir = trail_dir.join("img");
    fs::create_dir_all(&image_dir)
        .with_context(|| format!("creating {}", image_dir.display()))?;

    let mut rng = StdRng::seed_from_u64(profile.seed);
    let start = NaiveDate::from_ymd_opt(2022, 6, 15)
        .and_then(|date| date.and_hms_opt(9, 0, 0))
        .context("building synthetic start time")?;

    let mut trail = SyntheticTrail::default();
    let mut latitude = profile.start_latitude;
    let mut longitude = profile.start_longitude;
    let mut heading = profile.start_heading_deg;
    let total = profile.images + profile.unlocated;

    for index in 0..total {
        let id = format!("{:032x}", rng.gen::<u128>());
        let captured = start + Duration::seconds(profile.interval_s * index as i64);
        let located = index < profile.images;

        let (lat, lon) = if located {
            if index > 0 && profile.turn_every > 0 && index % profile.turn_every == 0 {
                heading = (heading + profile.turn_deg).rem_euclid(360.0);
            }
            if index > 0 {
                let mut step = profile.spacing_m;
                if profile.jitter_m > 0.0 {
                    step += rng.gen_range(-profile.jitter_m..profile.jitter_m);
                }
                let radians = heading.to_radians();
                latitude += step * radians.cos() / METERS_PER_DEG_LAT;
                longitude += step * radians.sin()
                    / (METERS_PER_DEG_LAT * latitude.to_radians().cos());
            }
            (latitude, longitude)
        } else {
            (0.0, 0.0)
        };

        let descriptor = json!({
            "originalName": format!("IMG_{:04}.JPG", index + 1),
            "creationDate": captured.format(CAPTURE_TIME_FORMAT).to_string(),
            "latitude": lat,
            "longitude": lon,
        });
        write_json(&image_dir.join(format!("{id}.json")), &descriptor)?;

        let tile_dir = image_dir.join(&id);
        fs::create_dir_all(&tile_dir)
            .with_context(|| format!("creating {}", tile_dir.display()))?;
        write_json(&tile_dir.join("config.json"), &tile_descriptor(&mut rng))?;

        if located {
            trail.located.push(id);
        } else {
            trail.unlocated.push(id);
        }
    }

    Ok(trail)
}
