//! Glue between a marker tracking library and a 3D renderer.
//!
//! This crate owns the wiring an AR application otherwise reimplements by
//! hand: it derives the processing geometry from the video feed, copies the
//! tracker's calibrated projection into a scene camera, keeps a registry of
//! content anchored to marker ids, and drives the per-frame loop of
//! detection, eased animation, background draw and hit-testing. The actual
//! computer vision and the actual graphics stack stay behind the
//! [`MarkerTracker`] and [`ArRenderer`] seams.
//!
//! ## Quickstart
//!
//! ```no_run
//! use ar_scene::{ArConfig, ArSession, MarkerDescriptor, MarkerSource};
//! # use ar_scene::core::{CameraCalibration, FrameGeometry, TrackerError, VideoSource};
//! # struct Camera;
//! # impl VideoSource for Camera {
//! #     fn dimensions(&self) -> (u32, u32) { (640, 480) }
//! # }
//! # fn open_camera() -> Camera { Camera }
//! # fn make_tracker(_: &FrameGeometry, _: CameraCalibration) -> Result<ScriptedTracker, TrackerError> { unimplemented!() }
//! # use ar_scene::core::{MarkerSnapshot, MarkerTracker, TrackerEvent, LoadTicket};
//! # struct ScriptedTracker;
//! # impl MarkerTracker for ScriptedTracker {
//! #     fn set_detection_mode(&mut self, _: ar_scene::DetectionMode) {}
//! #     fn set_matrix_code_type(&mut self, _: ar_scene::MatrixCodeType) {}
//! #     fn load_pattern_marker(&mut self, _: &str) -> LoadTicket { LoadTicket(0) }
//! #     fn load_multi_marker(&mut self, _: &str) -> LoadTicket { LoadTicket(0) }
//! #     fn track_pattern_marker(&mut self, _: ar_scene::PatternId, _: f64) {}
//! #     fn track_barcode_marker(&mut self, _: ar_scene::BarcodeId, _: f64) {}
//! #     fn process(&mut self) -> Result<(), TrackerError> { Ok(()) }
//! #     fn drain_events(&mut self, _: &mut Vec<TrackerEvent>) {}
//! #     fn detected_markers(&self) -> Vec<MarkerSnapshot> { Vec::new() }
//! #     fn projection_matrix(&self) -> nalgebra::Matrix4<f64> { nalgebra::Matrix4::identity() }
//! # }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let video = open_camera();
//! let calibration = ar_scene::core::JsonCalibrationFile::new("camera.json");
//! let mut session = ArSession::build(&video, &calibration, ArConfig::default(), make_tracker)?;
//!
//! let kanji = session.add_marker(
//!     MarkerDescriptor::new(MarkerSource::Pattern("patt.kanji".into()), "my-mesh")
//!         .on_click(|turns| println!("spun {turns} times")),
//! );
//! # let _ = kanji;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - [`ArSession`]: host-driven session; registration, frame loop, clicks.
//! - [`ArScene`]: camera + video background + anchor registry bundle.
//! - [`MarkerRegistry`] / [`AnchorNode`]: content keyed by tracked ids.
//! - [`ArRenderer`]: the seam a graphics backend implements.
//! - [`ar_scene::core`](ar_scene_core): tracker seam, snapshots, geometry.

pub use ar_scene_core as core;

mod config;
mod registry;
mod renderer;
mod scene;
mod session;

pub use config::ArConfig;
pub use registry::{AnchorNode, MarkerRegistry, MultiAnchor, SubNode};
pub use renderer::{ArRenderer, MarkerInstance};
pub use scene::{ArCamera, ArScene, VideoBackground};
pub use session::{
    ArSession, BuildError, ClickHandler, ClickHit, MarkerDescriptor, MarkerHandle, MarkerSource,
    MarkerState,
};

pub use ar_scene_core::{
    BarcodeId, DetectionMode, MarkerSnapshot, MarkerTracker, MatrixCodeType, MultiMarkerId,
    PatternId, TrackedId, TrackerError, TrackerEvent,
};
