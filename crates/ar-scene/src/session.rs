//! Session driver: construction, marker lifecycle, frame loop, hit-testing.

use std::collections::HashMap;

use ar_scene_core::{
    BarcodeId, CalibrationError, CalibrationSource, CameraCalibration, FrameGeometry, LoadTicket,
    MarkerSnapshot, MarkerTracker, MultiMarkerId, PatternId, TrackedId, TrackerError,
    TrackerEvent, VideoSource, DEFAULT_MARKER_WIDTH,
};
use log::{debug, info, warn};
use nalgebra::{Point2, Vector3};
use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::ArConfig;
use crate::registry::{AnchorNode, MultiAnchor};
use crate::renderer::ArRenderer;
use crate::scene::ArScene;

/// Errors that abort session construction.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("video reports unusable dimensions {width}x{height}")]
    InvalidVideo { width: u32, height: u32 },
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Callback fired when a click lands on a marker. Receives the total number
/// of revolutions queued for the content so far.
pub type ClickHandler = Box<dyn FnMut(u32)>;

/// What a marker registration tracks.
pub enum MarkerSource {
    /// Pattern image to train, by resource locator.
    Pattern(String),
    /// Barcode value. Needs no training step.
    Barcode(BarcodeId),
    /// Multi-marker set definition, by resource locator.
    Multi(String),
}

/// One marker registration: what to track, what to show on it, and how it
/// reacts to clicks.
pub struct MarkerDescriptor<C> {
    pub source: MarkerSource,
    pub content: C,
    /// Physical marker width in tracker units. Defaults to 1.
    pub width: Option<f64>,
    /// Content scale relative to the marker size. Shrinks the click region
    /// by the same factor. Defaults to (1, 1, 1).
    pub content_scale: Option<Vector3<f64>>,
    /// Invoked whenever a click lands on this marker.
    pub on_click: Option<ClickHandler>,
}

impl<C> MarkerDescriptor<C> {
    pub fn new(source: MarkerSource, content: C) -> Self {
        Self {
            source,
            content,
            width: None,
            content_scale: None,
            on_click: None,
        }
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn content_scale(mut self, scale: Vector3<f64>) -> Self {
        self.content_scale = Some(scale);
        self
    }

    pub fn on_click(mut self, handler: impl FnMut(u32) + 'static) -> Self {
        self.on_click = Some(Box::new(handler));
        self
    }
}

/// Handle to one registered marker, for state queries and anchor access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(u64);

/// Lifecycle state of a registered marker.
#[derive(Clone, Debug)]
pub enum MarkerState {
    /// Resource load still in flight.
    Pending,
    /// Tracked and wired to its anchor.
    Active,
    /// Load failed. The registration will never activate.
    Failed(TrackerError),
}

/// A click that landed on a marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClickHit {
    /// Marker the click landed on.
    pub id: TrackedId,
    /// Revolutions queued for its content after this click.
    pub turns: u32,
}

enum HandleTarget {
    Pending(LoadTicket),
    Single(TrackedId),
    Multi(MultiMarkerId),
    Failed(TrackerError),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Pattern,
    Multi,
}

struct PendingLoad<C> {
    handle: MarkerHandle,
    resource: String,
    kind: PendingKind,
    width: f64,
    content: C,
    content_scale: Vector3<f64>,
    on_click: Option<ClickHandler>,
}

/// Host-driven AR session.
///
/// Owns the tracker, the scene bundle and all marker registrations, and
/// advances them one frame at a time from the host's render loop. Nothing
/// here spawns threads; loads complete through the events drained in
/// [`process`](ArSession::process).
pub struct ArSession<T, C> {
    tracker: T,
    scene: ArScene<C>,
    config: ArConfig,
    events: Vec<TrackerEvent>,
    pending: HashMap<LoadTicket, PendingLoad<C>>,
    handles: HashMap<MarkerHandle, HandleTarget>,
    click_handlers: HashMap<TrackedId, ClickHandler>,
    next_handle: u64,
}

impl<T: MarkerTracker, C> ArSession<T, C> {
    /// Build a session from scratch: derive the processing geometry from the
    /// video, load the calibration, construct the tracker through
    /// `make_tracker` and assemble the scene bundle around it.
    ///
    /// Any failure aborts the build; there is no degraded session.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(mode = ?config.detection_mode))
    )]
    pub fn build<F>(
        video: &dyn VideoSource,
        calibration: &dyn CalibrationSource,
        config: ArConfig,
        make_tracker: F,
    ) -> Result<Self, BuildError>
    where
        F: FnOnce(&FrameGeometry, CameraCalibration) -> Result<T, TrackerError>,
    {
        let (width, height) = video.dimensions();
        let geometry = FrameGeometry::from_dimensions(width, height, config.max_video_size)
            .ok_or(BuildError::InvalidVideo { width, height })?;
        let loaded = calibration.load()?;
        let tracker = make_tracker(&geometry, loaded)?;
        Ok(Self::assemble(tracker, geometry, config))
    }

    /// Build a session around an already-constructed tracker.
    pub fn with_tracker(
        tracker: T,
        video: &dyn VideoSource,
        config: ArConfig,
    ) -> Result<Self, BuildError> {
        let (width, height) = video.dimensions();
        let geometry = FrameGeometry::from_dimensions(width, height, config.max_video_size)
            .ok_or(BuildError::InvalidVideo { width, height })?;
        Ok(Self::assemble(tracker, geometry, config))
    }

    fn assemble(mut tracker: T, geometry: FrameGeometry, config: ArConfig) -> Self {
        tracker.set_detection_mode(config.detection_mode);
        if let Some(code) = config.matrix_code_type {
            tracker.set_matrix_code_type(code);
        }
        let scene = ArScene::new(geometry, &tracker);
        info!(
            "AR session ready: {}x{} processing buffer, {:?} detection",
            geometry.processing_width, geometry.processing_height, config.detection_mode
        );
        Self {
            tracker,
            scene,
            config,
            events: Vec::new(),
            pending: HashMap::new(),
            handles: HashMap::new(),
            click_handlers: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Register a marker. Pattern and multi-marker sources start a resource
    /// load and stay [`MarkerState::Pending`] until a processed frame
    /// delivers the completion; barcode markers activate immediately.
    pub fn add_marker(&mut self, descriptor: MarkerDescriptor<C>) -> MarkerHandle {
        let handle = self.mint_handle();
        let width = descriptor.width.unwrap_or(DEFAULT_MARKER_WIDTH);
        let content_scale = descriptor
            .content_scale
            .unwrap_or_else(|| Vector3::new(1.0, 1.0, 1.0));

        match descriptor.source {
            MarkerSource::Pattern(resource) => {
                let ticket = self.tracker.load_pattern_marker(&resource);
                debug!("pattern {resource:?} loading under {ticket:?}");
                self.pending.insert(
                    ticket,
                    PendingLoad {
                        handle,
                        resource,
                        kind: PendingKind::Pattern,
                        width,
                        content: descriptor.content,
                        content_scale,
                        on_click: descriptor.on_click,
                    },
                );
                self.handles.insert(handle, HandleTarget::Pending(ticket));
            }
            MarkerSource::Barcode(id) => {
                self.tracker.track_barcode_marker(id, width);
                let anchor = self
                    .scene
                    .registry_mut()
                    .add_barcode_anchor(id, descriptor.content);
                anchor.set_content_scale(content_scale);
                if let Some(handler) = descriptor.on_click {
                    self.click_handlers.insert(TrackedId::Barcode(id), handler);
                }
                self.handles
                    .insert(handle, HandleTarget::Single(TrackedId::Barcode(id)));
                debug!("barcode {id:?} registered");
            }
            MarkerSource::Multi(resource) => {
                let ticket = self.tracker.load_multi_marker(&resource);
                debug!("multi-marker set {resource:?} loading under {ticket:?}");
                self.pending.insert(
                    ticket,
                    PendingLoad {
                        handle,
                        resource,
                        kind: PendingKind::Multi,
                        width,
                        content: descriptor.content,
                        content_scale,
                        on_click: descriptor.on_click,
                    },
                );
                self.handles.insert(handle, HandleTarget::Pending(ticket));
            }
        }
        handle
    }

    /// Advance detection by one frame: hide every anchor, run the tracker
    /// on the current video image, then apply the events it emitted.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn process(&mut self) -> Result<(), TrackerError> {
        self.scene.registry_mut().reset_visibility();
        self.tracker.process()?;

        let mut events = std::mem::take(&mut self.events);
        self.tracker.drain_events(&mut events);
        for event in &events {
            match event {
                TrackerEvent::PatternLoaded { ticket, id } => {
                    self.finish_pattern_load(*ticket, *id);
                }
                TrackerEvent::MultiMarkerLoaded {
                    ticket,
                    id,
                    sub_count,
                } => {
                    self.finish_multi_load(*ticket, *id, *sub_count);
                }
                TrackerEvent::LoadFailed { ticket, error } => {
                    self.fail_load(*ticket, error.clone());
                }
                sighting => self.scene.registry_mut().apply(sighting),
            }
        }
        events.clear();
        self.events = events;
        Ok(())
    }

    /// Advance every marker's spin animation by one frame.
    pub fn animate(&mut self) {
        self.scene.registry_mut().step_spins();
    }

    /// Draw the current frame through the scene bundle.
    pub fn render_on<R: ArRenderer<C>>(&mut self, renderer: &mut R) {
        self.scene.render_on(renderer);
    }

    /// One full frame: process the video, draw, then advance animations.
    ///
    /// Spins step after the draw, so a click shows up one frame later.
    pub fn tick<R: ArRenderer<C>>(&mut self, renderer: &mut R) -> Result<(), TrackerError> {
        self.process()?;
        self.render_on(renderer);
        self.animate();
        Ok(())
    }

    /// Test a click in display coordinates against every visible marker.
    ///
    /// Each marker whose scale-adjusted screen box contains the point gets
    /// one extra revolution queued and its click handler invoked. Markers
    /// whose boxes overlap all fire on the same click.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn click(&mut self, x: f64, y: f64) -> Vec<ClickHit> {
        let point = Point2::new(x, y);
        let mut hit_ids: Vec<TrackedId> = Vec::new();
        for (id, anchor) in self.scene.registry().singles() {
            if !anchor.visible() {
                continue;
            }
            if let Some(region) = anchor.hit_region() {
                if region.contains(point) {
                    hit_ids.push(id);
                }
            }
        }

        let mut hits = Vec::with_capacity(hit_ids.len());
        for id in hit_ids {
            let Some(anchor) = self.scene.registry_mut().single_mut(id) else {
                continue;
            };
            anchor.spin_mut().add_turn();
            let turns = anchor.spin().turns();
            if let Some(handler) = self.click_handlers.get_mut(&id) {
                handler(turns);
            }
            hits.push(ClickHit { id, turns });
        }
        hits
    }

    /// Lifecycle state of a registration, or `None` for a foreign handle.
    pub fn marker_state(&self, handle: MarkerHandle) -> Option<MarkerState> {
        self.handles.get(&handle).map(|target| match target {
            HandleTarget::Pending(_) => MarkerState::Pending,
            HandleTarget::Single(_) | HandleTarget::Multi(_) => MarkerState::Active,
            HandleTarget::Failed(error) => MarkerState::Failed(error.clone()),
        })
    }

    /// Anchor behind a handle once the marker is active. For multi-marker
    /// registrations this is the set's root node.
    pub fn anchor(&self, handle: MarkerHandle) -> Option<&AnchorNode<C>> {
        match self.handles.get(&handle)? {
            HandleTarget::Single(id) => self.scene.registry().single(*id),
            HandleTarget::Multi(id) => self.scene.registry().multi(*id).map(MultiAnchor::node),
            _ => None,
        }
    }

    pub fn anchor_mut(&mut self, handle: MarkerHandle) -> Option<&mut AnchorNode<C>> {
        match self.handles.get(&handle)? {
            HandleTarget::Single(id) => self.scene.registry_mut().single_mut(*id),
            HandleTarget::Multi(id) => self
                .scene
                .registry_mut()
                .multi_mut(*id)
                .map(MultiAnchor::node_mut),
            _ => None,
        }
    }

    /// Multi-marker anchor behind a handle, with its member slots.
    pub fn multi_anchor(&self, handle: MarkerHandle) -> Option<&MultiAnchor<C>> {
        match self.handles.get(&handle)? {
            HandleTarget::Multi(id) => self.scene.registry().multi(*id),
            _ => None,
        }
    }

    pub fn multi_anchor_mut(&mut self, handle: MarkerHandle) -> Option<&mut MultiAnchor<C>> {
        match self.handles.get(&handle)? {
            HandleTarget::Multi(id) => self.scene.registry_mut().multi_mut(*id),
            _ => None,
        }
    }

    /// Markers detected in the last processed frame. Snapshots are rebuilt
    /// per call and must not be kept across frames.
    pub fn detected_markers(&self) -> Vec<MarkerSnapshot> {
        self.tracker.detected_markers()
    }

    pub fn scene(&self) -> &ArScene<C> {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut ArScene<C> {
        &mut self.scene
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut T {
        &mut self.tracker
    }

    pub fn config(&self) -> &ArConfig {
        &self.config
    }

    fn mint_handle(&mut self) -> MarkerHandle {
        let handle = MarkerHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn finish_pattern_load(&mut self, ticket: LoadTicket, id: PatternId) {
        let Some(pending) = self.pending.remove(&ticket) else {
            debug!("completion for unknown load {ticket:?}");
            return;
        };
        if pending.kind != PendingKind::Pattern {
            warn!(
                "tracker answered multi-marker load {:?} with a pattern id",
                pending.resource
            );
            let error = TrackerError::MultiMarkerLoad {
                resource: pending.resource,
                reason: "tracker answered with a pattern marker id".into(),
            };
            self.handles
                .insert(pending.handle, HandleTarget::Failed(error));
            return;
        }
        self.tracker.track_pattern_marker(id, pending.width);
        let tracked = TrackedId::Pattern(id);
        let anchor = self
            .scene
            .registry_mut()
            .add_pattern_anchor(id, pending.content);
        anchor.set_content_scale(pending.content_scale);
        if let Some(handler) = pending.on_click {
            self.click_handlers.insert(tracked, handler);
        }
        self.handles
            .insert(pending.handle, HandleTarget::Single(tracked));
        debug!("pattern {:?} active as {id:?}", pending.resource);
    }

    fn finish_multi_load(&mut self, ticket: LoadTicket, id: MultiMarkerId, sub_count: usize) {
        let Some(pending) = self.pending.remove(&ticket) else {
            debug!("completion for unknown load {ticket:?}");
            return;
        };
        if pending.kind != PendingKind::Multi {
            warn!(
                "tracker answered pattern load {:?} with a multi-marker id",
                pending.resource
            );
            let error = TrackerError::PatternLoad {
                resource: pending.resource,
                reason: "tracker answered with a multi-marker set id".into(),
            };
            self.handles
                .insert(pending.handle, HandleTarget::Failed(error));
            return;
        }
        let multi = self
            .scene
            .registry_mut()
            .add_multi_anchor(id, sub_count, pending.content);
        multi.node_mut().set_content_scale(pending.content_scale);
        if pending.on_click.is_some() {
            debug!(
                "multi-marker set {:?} has no screen-space box; its click handler is dropped",
                pending.resource
            );
        }
        self.handles
            .insert(pending.handle, HandleTarget::Multi(id));
        debug!(
            "multi-marker set {:?} active as {id:?} with {sub_count} members",
            pending.resource
        );
    }

    fn fail_load(&mut self, ticket: LoadTicket, error: TrackerError) {
        let Some(pending) = self.pending.remove(&ticket) else {
            return;
        };
        warn!("marker load {:?} failed: {error}", pending.resource);
        self.handles
            .insert(pending.handle, HandleTarget::Failed(error));
    }
}
