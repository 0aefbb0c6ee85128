use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::interface::TileDescriptor;
use crate::model::{ImageRecord, TileReference};
use crate::prelude::{TrailError, TrailResult};
use crate::telemetry::log::LogManager;

/// Tile references for one trail, keyed by image id.
pub type TileCatalog = BTreeMap<String, TileReference>;

/// Reads `<img>/<id>/config.json`, written by the tiling tool, for every sequenced image.
pub struct TileCatalogLoader {
    image_dir: PathBuf,
    base_path: String,
    logger: LogManager,
}

impl TileCatalogLoader {
    /// `base_path` is the web path of the trail directory; tiles are served
    /// from `<base_path>/img/<id>`.
    pub fn new(image_dir: impl Into<PathBuf>, base_path: impl Into<String>) -> Self {
        Self {
            image_dir: image_dir.into(),
            base_path: base_path.into(),
            logger: LogManager::new("tiles"),
        }
    }

    pub fn base_path_for(&self, id: &str) -> String {
        let prefix = self.base_path.trim_end_matches('/');
        if prefix.is_empty() {
            format!("img/{id}")
        } else {
            format!("{prefix}/img/{id}")
        }
    }

    pub fn load(&self, records: &[ImageRecord]) -> TrailResult<TileCatalog> {
        let mut catalog = TileCatalog::new();
        for record in records {
            let path = self.image_dir.join(&record.id).join("config.json");
            let descriptor = read_descriptor(&record.id, &path)?;
            catalog.insert(
                record.id.clone(),
                descriptor.into_reference(self.base_path_for(&record.id)),
            );
        }
        self.logger
            .record(&format!("{} tile sets resolved", catalog.len()));
        Ok(catalog)
    }
}

fn read_descriptor(id: &str, path: &Path) -> TrailResult<TileDescriptor> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(TrailError::MissingTile(id.to_string()))
        }
        Err(err) => return Err(TrailError::io(path, err)),
    };
    serde_json::from_str(&contents).map_err(|err| TrailError::InvalidTile {
        id: id.to_string(),
        reason: err.to_string(),
    })
}
