pub mod descriptor;
pub mod document;

pub use descriptor::{DescriptorIssue, ImageDescriptor, MultiResDescriptor, TileDescriptor};
pub use document::{
    BearingSequenceDocument, GeoMasterDocument, GeoMasterPoint, GeoPoint, GeoSequenceDocument,
    Hotspot, HotspotKind, PanoramaKind, Scene, SequenceDocument, TargetView, ViewerConfig,
    ViewerDefaults,
};
