//! The marker tracker seam.

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::marker::{
    BarcodeId, MarkerSnapshot, MarkerVertices, MultiMarkerId, PatternId, SubMarkerStatus,
    TrackedId,
};
use crate::mode::{DetectionMode, MatrixCodeType};

/// Marker width in tracker units assumed when the caller does not give one.
pub const DEFAULT_MARKER_WIDTH: f64 = 1.0;

/// Handle for one in-flight pattern or multi-marker load.
///
/// Tickets are minted by the tracker and echoed back in the completion
/// event, so callers can pair requests with results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadTicket(pub u64);

/// Errors a tracker implementation may surface.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    #[error("failed to load pattern {resource:?}: {reason}")]
    PatternLoad { resource: String, reason: String },
    #[error("failed to load multi-marker set {resource:?}: {reason}")]
    MultiMarkerLoad { resource: String, reason: String },
    #[error("tracker construction failed: {0}")]
    Construct(String),
    #[error("frame processing failed: {0}")]
    Process(String),
}

/// Sighting of a single pattern or barcode marker in the current frame.
#[derive(Clone, Debug)]
pub struct MarkerUpdate {
    pub id: TrackedId,
    /// Model-view transform relative to the camera.
    pub pose: Matrix4<f64>,
    /// Projected corners in screen space.
    pub vertices: MarkerVertices,
}

/// Sighting of a multi-marker set in the current frame.
#[derive(Clone, Debug)]
pub struct MultiMarkerUpdate {
    pub id: MultiMarkerId,
    pub pose: Matrix4<f64>,
}

/// Per-member detail following a `MultiMarker` sighting.
#[derive(Clone, Debug)]
pub struct SubMarkerUpdate {
    /// Set this member belongs to.
    pub set: MultiMarkerId,
    /// Index of the member within its set definition.
    pub index: usize,
    /// Pose of the member relative to the set's root.
    pub pose: Matrix4<f64>,
    pub status: SubMarkerStatus,
}

/// Notifications drained from the tracker once per processed frame.
///
/// Sighting events are emitted only for markers detected in the frame that
/// was just processed; absence of an event means the marker was not seen.
#[derive(Clone, Debug)]
pub enum TrackerEvent {
    /// A pattern finished training and received its id.
    PatternLoaded { ticket: LoadTicket, id: PatternId },
    /// A multi-marker set finished loading with `sub_count` members.
    MultiMarkerLoaded {
        ticket: LoadTicket,
        id: MultiMarkerId,
        sub_count: usize,
    },
    /// An in-flight load failed. The ticket will never complete.
    LoadFailed {
        ticket: LoadTicket,
        error: TrackerError,
    },
    /// A pattern or barcode marker was sighted.
    Marker(MarkerUpdate),
    /// A multi-marker set was sighted.
    MultiMarker(MultiMarkerUpdate),
    /// Member detail for a sighted multi-marker set.
    MultiMarkerSub(SubMarkerUpdate),
}

/// Interface the glue expects from a marker tracking library.
///
/// Implementations wrap the actual computer-vision backend. All methods are
/// called from the single thread driving the frame loop; loads started with
/// `load_pattern_marker` / `load_multi_marker` may complete in the background
/// but must surface their completion through `drain_events`.
pub trait MarkerTracker {
    /// Select the per-frame matching strategy.
    fn set_detection_mode(&mut self, mode: DetectionMode);

    /// Select the bit layout used by matrix (barcode) decoding.
    fn set_matrix_code_type(&mut self, code: MatrixCodeType);

    /// Start training a pattern marker from `source`. Completion arrives as
    /// [`TrackerEvent::PatternLoaded`] or [`TrackerEvent::LoadFailed`].
    fn load_pattern_marker(&mut self, source: &str) -> LoadTicket;

    /// Start loading a multi-marker set definition from `source`. Completion
    /// arrives as [`TrackerEvent::MultiMarkerLoaded`] or
    /// [`TrackerEvent::LoadFailed`].
    fn load_multi_marker(&mut self, source: &str) -> LoadTicket;

    /// Begin tracking a trained pattern. `width` is the physical marker
    /// width in tracker units.
    fn track_pattern_marker(&mut self, id: PatternId, width: f64);

    /// Begin tracking a barcode value. Barcodes need no training step.
    fn track_barcode_marker(&mut self, id: BarcodeId, width: f64);

    /// Run detection on the current video frame.
    fn process(&mut self) -> Result<(), TrackerError>;

    /// Move all pending events into `into`, preserving emission order.
    fn drain_events(&mut self, into: &mut Vec<TrackerEvent>);

    /// Snapshots of the markers detected in the last processed frame.
    ///
    /// Rebuilt on every call; the tracker reuses its internal slots across
    /// frames, so snapshots must not be cached by the caller.
    fn detected_markers(&self) -> Vec<MarkerSnapshot>;

    /// Projection matrix derived from the calibration the tracker was built
    /// with.
    fn projection_matrix(&self) -> Matrix4<f64>;
}
