use anyhow::Context;
use log::warn;
use std::fs;
use std::path::Path;
use trailcore::config::{ConfigLayers, SettingsTier};
use trailcore::SequenceConfig;

/// Settings file name, both for the global defaults and inside each trail.
pub const SETTINGS_FILE: &str = "process_sequence.yaml";

#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub global: SettingsTier,
    pub flipped: bool,
    pub export_geo: bool,
    pub workers: usize,
}

impl WorkflowConfig {
    /// Loads the global tier. A missing file is not an error by itself: every
    /// key may still come from the per-trail file.
    pub fn load<P: AsRef<Path>>(
        global_path: P,
        flipped: bool,
        export_geo: bool,
        workers: usize,
    ) -> anyhow::Result<Self> {
        let path_ref = global_path.as_ref();
        let global = if path_ref.exists() {
            load_tier(path_ref)?
        } else {
            warn!(
                "global settings {} not found; relying on per-trail settings",
                path_ref.display()
            );
            SettingsTier::new()
        };
        Ok(Self::from_tier(global, flipped, export_geo, workers))
    }

    pub fn from_tier(
        global: SettingsTier,
        flipped: bool,
        export_geo: bool,
        workers: usize,
    ) -> Self {
        Self {
            global,
            flipped,
            export_geo,
            workers: workers.max(1),
        }
    }

    pub fn layers_for(&self, trail_dir: &Path) -> anyhow::Result<ConfigLayers> {
        let layers = ConfigLayers::new(self.global.clone());
        let local_path = trail_dir.join(SETTINGS_FILE);
        if local_path.exists() {
            Ok(layers.with_local(load_tier(&local_path)?))
        } else {
            Ok(layers)
        }
    }

    pub fn resolve_for(&self, trail_dir: &Path) -> anyhow::Result<SequenceConfig> {
        let layers = self.layers_for(trail_dir)?;
        SequenceConfig::resolve(&layers)
            .with_context(|| format!("resolving settings for {}", trail_dir.display()))
    }
}

pub fn load_tier(path: &Path) -> anyhow::Result<SettingsTier> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading settings {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(SettingsTier::new());
    }
    let tier: SettingsTier = serde_yaml::from_str(&contents)
        .with_context(|| format!("parsing settings {}", path.display()))?;
    Ok(tier)
}
