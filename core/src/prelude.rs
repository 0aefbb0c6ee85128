use std::path::PathBuf;

/// Common error type for stage execution.
#[derive(thiserror::Error, Debug)]
pub enum TrailError {
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("i/o failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("configuration key {0} missing from both per-trail and global settings")]
    MissingConfig(String),
    #[error("configuration key {key} has unusable value {value}")]
    InvalidConfig { key: String, value: String },
    #[error("no tile descriptor for image {0}")]
    MissingTile(String),
    #[error("invalid tile descriptor for image {id}: {reason}")]
    InvalidTile { id: String, reason: String },
    #[error("degenerate geodesic input: {0}")]
    DegenerateGeodesic(String),
    #[error("insufficient records: {0}")]
    InsufficientRecords(String),
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("run cancelled before {0}")]
    Cancelled(&'static str),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl TrailError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type TrailResult<T> = Result<T, TrailError>;

/// Trait shared by every step of the sequencing pipeline.
///
/// Stages receive their configuration at construction time and are
/// otherwise stateless, so a single instance can execute any number of runs.
pub trait PipelineStage<I> {
    type Output;

    fn name(&self) -> &'static str;
    fn execute(&self, input: I) -> TrailResult<Self::Output>;
}
