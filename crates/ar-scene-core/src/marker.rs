//! Marker identities and per-frame detection snapshots.

use nalgebra::{Matrix4, Point2};
use serde::{Deserialize, Serialize};

use crate::geometry::HitBox;

/// Id of a trained pattern (template) marker, assigned by the tracker when
/// the pattern image finishes loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternId(pub u32);

/// Decoded value of a matrix (barcode) marker. No training step is involved,
/// the value itself is the identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BarcodeId(pub u32);

/// Id of a multi-marker set, assigned by the tracker when the set definition
/// finishes loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MultiMarkerId(pub u32);

/// Identity a single-marker detection is filed under.
///
/// Pattern and barcode ids live in separate namespaces; a pattern id 3 and a
/// barcode value 3 name different markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrackedId {
    Pattern(PatternId),
    Barcode(BarcodeId),
}

/// Projected marker corners in screen space, in detector order.
pub type MarkerVertices = [Point2<f64>; 4];

/// State of one detected marker for the frame it was queried in.
///
/// Snapshots are rebuilt from the tracker on every processed frame and must
/// not be retained across frames; the tracker reuses the underlying slots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerSnapshot {
    /// Identity the tracker filed this detection under.
    pub id: TrackedId,
    /// Pattern id when template matching recognised the marker.
    pub pattern_id: Option<PatternId>,
    /// Barcode value when matrix decoding recognised the marker.
    pub barcode_id: Option<BarcodeId>,
    /// Whether the marker is considered in view this frame.
    pub visible: bool,
    /// Projected corner positions in screen space.
    pub vertices: MarkerVertices,
    /// Model-view transform of the marker relative to the camera.
    pub pose: Matrix4<f64>,
}

impl MarkerSnapshot {
    /// Axis-aligned screen-space box spanned by the projected corners.
    pub fn hit_box(&self) -> HitBox {
        HitBox::from_vertices(&self.vertices)
    }
}

/// Per-frame status the tracker reports for one member of a multi-marker set.
///
/// Non-negative values mean the submarker was sighted this frame; negative
/// values mean it was extrapolated from the set pose or lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubMarkerStatus(pub i32);

impl SubMarkerStatus {
    pub fn is_visible(self) -> bool {
        self.0 >= 0
    }
}
