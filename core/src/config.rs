//! Two-tier sequence settings.
//!
//! Each trail may carry its own overrides; anything it does not set falls
//! back to the global defaults. The merge happens once, producing an
//! immutable [`SequenceConfig`] that is handed to each stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::prelude::{TrailError, TrailResult};

pub mod keys {
    pub const PREV_BEARING_INFLUENCE_CUTOFF: &str = "PrevImageBearingInfluenceCutoffAngle";
    pub const OPTIMAL_NEIGHBOR_DISTANCE: &str = "OptimalNeighborDistance";
    pub const NEIGHBOR_DISTANCE_CUTOFF: &str = "NeighborDistanceCutoff";
    pub const NEIGHBOR_PRUNE_ANGLE: &str = "NeighborPruneAngle";
    pub const FADE_DURATION: &str = "FadeDuration";
    pub const SHOW_COMPASS: &str = "ShowCompass";
    pub const HORIZON_CORRECTION: &str = "HorizonCorrection";
    pub const HFOV: &str = "HFov";
    pub const SHOW_TITLE: &str = "ShowTitle";
    pub const ARROW_PITCH: &str = "ArrowPitch";
}

/// A raw setting as written in a settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl SettingValue {
    fn as_number(&self, key: &str) -> TrailResult<f64> {
        match self {
            SettingValue::Number(value) => Ok(*value),
            SettingValue::Text(text) => text.trim().parse::<f64>().map_err(|_| invalid(key, text)),
            SettingValue::Flag(flag) => Err(invalid(key, &flag.to_string())),
        }
    }

    fn as_flag(&self) -> bool {
        match self {
            SettingValue::Flag(flag) => *flag,
            SettingValue::Number(value) => *value == 1.0,
            SettingValue::Text(text) => matches!(
                text.trim().to_lowercase().as_str(),
                "yes" | "1" | "true" | "on"
            ),
        }
    }
}

fn invalid(key: &str, value: &str) -> TrailError {
    TrailError::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// One tier of named settings.
pub type SettingsTier = BTreeMap<String, SettingValue>;

/// Per-trail overrides layered over global defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    local: Option<SettingsTier>,
    global: SettingsTier,
}

impl ConfigLayers {
    pub fn new(global: SettingsTier) -> Self {
        Self {
            local: None,
            global,
        }
    }

    pub fn with_local(mut self, local: SettingsTier) -> Self {
        self.local = Some(local);
        self
    }

    pub fn lookup(&self, key: &str) -> TrailResult<&SettingValue> {
        self.local
            .as_ref()
            .and_then(|local| local.get(key))
            .or_else(|| self.global.get(key))
            .ok_or_else(|| TrailError::MissingConfig(key.to_string()))
    }

    pub fn number(&self, key: &str) -> TrailResult<f64> {
        self.lookup(key)?.as_number(key)
    }

    pub fn flag(&self, key: &str) -> TrailResult<bool> {
        Ok(self.lookup(key)?.as_flag())
    }
}

/// Fully resolved settings for one trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceConfig {
    pub prev_bearing_influence_cutoff_deg: f64,
    pub optimal_neighbor_distance_m: f64,
    pub neighbor_distance_cutoff_m: f64,
    pub neighbor_prune_angle_deg: f64,
    pub fade_duration_ms: f64,
    pub show_compass: bool,
    pub horizon_correction_deg: f64,
    pub hfov_deg: f64,
    pub show_title: bool,
    pub arrow_pitch_deg: f64,
}

impl SequenceConfig {
    pub fn resolve(layers: &ConfigLayers) -> TrailResult<Self> {
        Ok(Self {
            prev_bearing_influence_cutoff_deg: layers.number(keys::PREV_BEARING_INFLUENCE_CUTOFF)?,
            optimal_neighbor_distance_m: layers.number(keys::OPTIMAL_NEIGHBOR_DISTANCE)?,
            neighbor_distance_cutoff_m: layers.number(keys::NEIGHBOR_DISTANCE_CUTOFF)?,
            neighbor_prune_angle_deg: layers.number(keys::NEIGHBOR_PRUNE_ANGLE)?,
            fade_duration_ms: layers.number(keys::FADE_DURATION)?,
            show_compass: layers.flag(keys::SHOW_COMPASS)?,
            horizon_correction_deg: layers.number(keys::HORIZON_CORRECTION)?,
            hfov_deg: layers.number(keys::HFOV)?,
            show_title: layers.flag(keys::SHOW_TITLE)?,
            arrow_pitch_deg: layers.number(keys::ARROW_PITCH)?,
        })
    }
}
