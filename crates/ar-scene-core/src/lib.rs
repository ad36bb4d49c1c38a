//! Core types and seams for marker-tracking AR glue.
//!
//! This crate is intentionally small and renderer-agnostic. It defines the
//! tracker and video seams, the per-frame marker data model, and the pure
//! geometry used by hit-testing and frame setup. It does *not* depend on any
//! concrete tracking backend or graphics stack.

mod calibration;
mod easing;
mod geometry;
mod logger;
mod marker;
mod mode;
mod tracker;
mod video;

pub use calibration::{CalibrationError, CalibrationSource, CameraCalibration, JsonCalibrationFile};
pub use easing::SpinState;
pub use geometry::HitBox;
pub use marker::{
    BarcodeId, MarkerSnapshot, MarkerVertices, MultiMarkerId, PatternId, SubMarkerStatus,
    TrackedId,
};
pub use mode::{DetectionMode, MatrixCodeType};
pub use tracker::{
    LoadTicket, MarkerTracker, MarkerUpdate, MultiMarkerUpdate, SubMarkerUpdate, TrackerError,
    TrackerEvent, DEFAULT_MARKER_WIDTH,
};
pub use video::{FrameGeometry, Orientation, VideoSource};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level};
