//! End-to-end behavior of the session frame loop, driven by a scripted
//! tracker and observed through a recording renderer.

use std::cell::Cell;
use std::collections::VecDeque;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::rc::Rc;

use ar_scene::core::{
    BarcodeId, CalibrationError, CalibrationSource, CameraCalibration, DetectionMode, LoadTicket,
    MarkerSnapshot, MarkerTracker, MarkerUpdate, MarkerVertices, MatrixCodeType, MultiMarkerId,
    MultiMarkerUpdate, PatternId, SubMarkerStatus, SubMarkerUpdate, TrackedId, TrackerError,
    TrackerEvent, VideoSource,
};
use ar_scene::{
    ArConfig, ArRenderer, ArSession, BuildError, MarkerDescriptor, MarkerInstance, MarkerSource,
    MarkerState,
};
use nalgebra::{Matrix4, Point2, Vector3};

struct FixedVideo(u32, u32);

impl VideoSource for FixedVideo {
    fn dimensions(&self) -> (u32, u32) {
        (self.0, self.1)
    }
}

fn sample_projection() -> Matrix4<f64> {
    Matrix4::new_perspective(640.0 / 480.0, 0.7, 0.1, 1000.0)
}

/// Tracker stand-in that plays back pre-scripted events. Loads complete on
/// the drain following the request, like a backend finishing work between
/// frames.
struct ScriptedTracker {
    projection: Matrix4<f64>,
    mode: Option<DetectionMode>,
    code_type: Option<MatrixCodeType>,
    next_ticket: u64,
    next_pattern: u32,
    next_multi: u32,
    multi_sub_count: usize,
    fail_loads: bool,
    completions: Vec<TrackerEvent>,
    script: VecDeque<Vec<TrackerEvent>>,
    current: Vec<TrackerEvent>,
    tracked: Vec<(TrackedId, f64)>,
    snapshots: Vec<MarkerSnapshot>,
    frames: usize,
}

impl ScriptedTracker {
    fn new() -> Self {
        Self {
            projection: sample_projection(),
            mode: None,
            code_type: None,
            next_ticket: 0,
            next_pattern: 0,
            next_multi: 0,
            multi_sub_count: 0,
            fail_loads: false,
            completions: Vec::new(),
            script: VecDeque::new(),
            current: Vec::new(),
            tracked: Vec::new(),
            snapshots: Vec::new(),
            frames: 0,
        }
    }

    fn mint_ticket(&mut self) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }
}

impl MarkerTracker for ScriptedTracker {
    fn set_detection_mode(&mut self, mode: DetectionMode) {
        self.mode = Some(mode);
    }

    fn set_matrix_code_type(&mut self, code: MatrixCodeType) {
        self.code_type = Some(code);
    }

    fn load_pattern_marker(&mut self, source: &str) -> LoadTicket {
        let ticket = self.mint_ticket();
        if self.fail_loads {
            self.completions.push(TrackerEvent::LoadFailed {
                ticket,
                error: TrackerError::PatternLoad {
                    resource: source.to_owned(),
                    reason: "scripted failure".to_owned(),
                },
            });
        } else {
            let id = PatternId(self.next_pattern);
            self.next_pattern += 1;
            self.completions
                .push(TrackerEvent::PatternLoaded { ticket, id });
        }
        ticket
    }

    fn load_multi_marker(&mut self, source: &str) -> LoadTicket {
        let ticket = self.mint_ticket();
        if self.fail_loads {
            self.completions.push(TrackerEvent::LoadFailed {
                ticket,
                error: TrackerError::MultiMarkerLoad {
                    resource: source.to_owned(),
                    reason: "scripted failure".to_owned(),
                },
            });
        } else {
            let id = MultiMarkerId(self.next_multi);
            self.next_multi += 1;
            self.completions.push(TrackerEvent::MultiMarkerLoaded {
                ticket,
                id,
                sub_count: self.multi_sub_count,
            });
        }
        ticket
    }

    fn track_pattern_marker(&mut self, id: PatternId, width: f64) {
        self.tracked.push((TrackedId::Pattern(id), width));
    }

    fn track_barcode_marker(&mut self, id: BarcodeId, width: f64) {
        self.tracked.push((TrackedId::Barcode(id), width));
    }

    fn process(&mut self) -> Result<(), TrackerError> {
        self.frames += 1;
        self.current = self.script.pop_front().unwrap_or_default();
        Ok(())
    }

    fn drain_events(&mut self, into: &mut Vec<TrackerEvent>) {
        into.extend(self.completions.drain(..));
        into.extend(self.current.drain(..));
    }

    fn detected_markers(&self) -> Vec<MarkerSnapshot> {
        self.snapshots.clone()
    }

    fn projection_matrix(&self) -> Matrix4<f64> {
        self.projection
    }
}

#[derive(Clone, Debug, PartialEq)]
enum DrawCall {
    Clear,
    Background { generation: u64, rotation: f64 },
    Marker { content: String, model: Matrix4<f64> },
}

struct RecordingRenderer {
    auto_clear: bool,
    size: Option<(u32, u32)>,
    calls: Vec<DrawCall>,
    auto_clear_switches: Vec<bool>,
}

impl RecordingRenderer {
    fn new() -> Self {
        Self {
            auto_clear: true,
            size: None,
            calls: Vec::new(),
            auto_clear_switches: Vec::new(),
        }
    }

    fn drawn_contents(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Marker { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl ArRenderer<&'static str> for RecordingRenderer {
    fn set_size(&mut self, width: u32, height: u32) {
        self.size = Some((width, height));
    }

    fn auto_clear(&self) -> bool {
        self.auto_clear
    }

    fn set_auto_clear(&mut self, auto_clear: bool) {
        self.auto_clear_switches.push(auto_clear);
        self.auto_clear = auto_clear;
    }

    fn clear(&mut self) {
        self.calls.push(DrawCall::Clear);
    }

    fn draw_background(&mut self, background: &ar_scene::VideoBackground) {
        self.calls.push(DrawCall::Background {
            generation: background.texture_generation(),
            rotation: background.rotation(),
        });
    }

    fn draw_marker(
        &mut self,
        camera: &ar_scene::ArCamera,
        instance: &MarkerInstance<'_, &'static str>,
    ) {
        assert_eq!(camera.projection(), &sample_projection());
        self.calls.push(DrawCall::Marker {
            content: instance.content.to_string(),
            model: instance.model_matrix(),
        });
    }
}

fn square_vertices(min: f64, max: f64) -> MarkerVertices {
    [
        Point2::new(min, min),
        Point2::new(max, min),
        Point2::new(max, max),
        Point2::new(min, max),
    ]
}

fn sighting(id: TrackedId, pose: Matrix4<f64>, vertices: MarkerVertices) -> TrackerEvent {
    TrackerEvent::Marker(MarkerUpdate { id, pose, vertices })
}

fn landscape_session() -> ArSession<ScriptedTracker, &'static str> {
    ArSession::with_tracker(
        ScriptedTracker::new(),
        &FixedVideo(640, 480),
        ArConfig::default(),
    )
    .unwrap()
}

#[test]
fn pattern_marker_becomes_visible_with_the_reported_pose() {
    let mut session = landscape_session();
    let handle = session.add_marker(MarkerDescriptor::new(
        MarkerSource::Pattern("patt.hiro".into()),
        "cube",
    ));
    assert!(matches!(
        session.marker_state(handle),
        Some(MarkerState::Pending)
    ));

    // load completes on the next processed frame
    session.process().unwrap();
    assert!(matches!(
        session.marker_state(handle),
        Some(MarkerState::Active)
    ));
    let anchor = session.anchor(handle).unwrap();
    assert!(!anchor.visible());
    assert_eq!(
        session.tracker().tracked,
        vec![(TrackedId::Pattern(PatternId(0)), 1.0)]
    );

    let pose = Matrix4::new_translation(&Vector3::new(1.0, 2.0, -30.0));
    session.tracker_mut().script.push_back(vec![sighting(
        TrackedId::Pattern(PatternId(0)),
        pose,
        square_vertices(100.0, 200.0),
    )]);
    session.process().unwrap();

    let anchor = session.anchor(handle).unwrap();
    assert!(anchor.visible());
    assert_eq!(anchor.transform(), &pose);
}

#[test]
fn markers_not_sighted_go_hidden_again() {
    let mut session = landscape_session();
    let handle = session.add_marker(MarkerDescriptor::new(
        MarkerSource::Barcode(BarcodeId(5)),
        "cone",
    ));

    let pose = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -10.0));
    session.tracker_mut().script.push_back(vec![sighting(
        TrackedId::Barcode(BarcodeId(5)),
        pose,
        square_vertices(0.0, 10.0),
    )]);
    session.process().unwrap();
    assert!(session.anchor(handle).unwrap().visible());

    // empty frame: visibility resets, the last pose stays
    session.process().unwrap();
    let anchor = session.anchor(handle).unwrap();
    assert!(!anchor.visible());
    assert_eq!(anchor.transform(), &pose);
}

#[test]
fn unknown_marker_events_are_ignored() {
    let mut session = landscape_session();
    session.tracker_mut().script.push_back(vec![
        sighting(
            TrackedId::Pattern(PatternId(9)),
            Matrix4::identity(),
            square_vertices(0.0, 1.0),
        ),
        TrackerEvent::MultiMarker(MultiMarkerUpdate {
            id: MultiMarkerId(4),
            pose: Matrix4::identity(),
        }),
        TrackerEvent::MultiMarkerSub(SubMarkerUpdate {
            set: MultiMarkerId(4),
            index: 0,
            pose: Matrix4::identity(),
            status: SubMarkerStatus(1),
        }),
    ]);
    session.process().unwrap();
    assert_eq!(session.scene().registry().singles().count(), 0);
    assert_eq!(session.scene().registry().multis().count(), 0);
}

#[test]
fn camera_projection_matches_the_tracker_exactly() {
    let session = landscape_session();
    assert_eq!(session.scene().camera().projection(), &sample_projection());
}

#[test]
fn portrait_video_swaps_processing_and_rotates_background() {
    let session: ArSession<ScriptedTracker, &'static str> = ArSession::with_tracker(
        ScriptedTracker::new(),
        &FixedVideo(480, 640),
        ArConfig::default(),
    )
    .unwrap();

    let geometry = session.scene().geometry();
    assert_eq!(geometry.processing_width, 640);
    assert_eq!(geometry.processing_height, 480);
    assert_eq!(geometry.renderer_size(), (640, 480));
    assert_eq!(session.scene().background().rotation(), FRAC_PI_2);
}

#[test]
fn background_draws_first_and_texture_updates_every_frame() {
    let mut session = landscape_session();
    let mut renderer = RecordingRenderer::new();
    let (width, height) = session.scene().geometry().renderer_size();
    renderer.set_size(width, height);

    session.render_on(&mut renderer);
    session.render_on(&mut renderer);

    assert_eq!(renderer.size, Some((640, 480)));
    assert_eq!(
        renderer.calls,
        vec![
            DrawCall::Clear,
            DrawCall::Background {
                generation: 1,
                rotation: 0.0
            },
            DrawCall::Clear,
            DrawCall::Background {
                generation: 2,
                rotation: 0.0
            },
        ]
    );
    // auto-clear is forced off for the pass and restored afterwards
    assert_eq!(renderer.auto_clear_switches, vec![false, true, false, true]);
    assert!(renderer.auto_clear);
}

#[test]
fn click_spins_the_content_and_fires_the_callback() {
    let mut session = landscape_session();
    let calls = Rc::new(Cell::new(0u32));
    let turns_seen = Rc::new(Cell::new(0u32));
    let calls_rec = calls.clone();
    let turns_rec = turns_seen.clone();
    let handle = session.add_marker(
        MarkerDescriptor::new(MarkerSource::Pattern("P1".into()), "cube").on_click(
            move |turns| {
                calls_rec.set(calls_rec.get() + 1);
                turns_rec.set(turns);
            },
        ),
    );

    // the load completes and the marker is sighted on the same frame
    session.tracker_mut().script.push_back(vec![sighting(
        TrackedId::Pattern(PatternId(0)),
        Matrix4::identity(),
        square_vertices(100.0, 200.0),
    )]);
    session.process().unwrap();

    assert!(session.click(300.0, 300.0).is_empty());
    assert_eq!(calls.get(), 0);

    let hits = session.click(150.0, 150.0);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, TrackedId::Pattern(PatternId(0)));
    assert_eq!(hits[0].turns, 1);
    assert_eq!(calls.get(), 1, "one hit fires the handler exactly once");
    assert_eq!(turns_seen.get(), 1);

    for _ in 0..240 {
        session.animate();
    }
    let spun = session.anchor(handle).unwrap().spin().current();
    assert!(spun > TAU * 0.99 && spun <= TAU + 1e-9, "angle {spun}");

    let hits = session.click(150.0, 150.0);
    assert_eq!(hits[0].turns, 2);
    assert_eq!(turns_seen.get(), 2);
    assert_eq!(calls.get(), 2);
}

#[test]
fn content_scale_shrinks_the_click_region() {
    let mut session = landscape_session();
    session.add_marker(
        MarkerDescriptor::new(MarkerSource::Barcode(BarcodeId(2)), "half")
            .content_scale(Vector3::new(0.5, 0.5, 1.0)),
    );

    session.tracker_mut().script.push_back(vec![sighting(
        TrackedId::Barcode(BarcodeId(2)),
        Matrix4::identity(),
        square_vertices(100.0, 200.0),
    )]);
    session.process().unwrap();

    // the half-scale region spans 125..175 on both axes
    assert!(session.click(110.0, 150.0).is_empty());
    assert!(session.click(130.0, 150.0).len() == 1);
}

#[test]
fn overlapping_markers_all_fire_on_one_click() {
    let mut session = landscape_session();
    let first = Rc::new(Cell::new(0u32));
    let second = Rc::new(Cell::new(0u32));
    let first_rec = first.clone();
    let second_rec = second.clone();
    session.add_marker(
        MarkerDescriptor::new(MarkerSource::Barcode(BarcodeId(1)), "a")
            .on_click(move |t| first_rec.set(t)),
    );
    session.add_marker(
        MarkerDescriptor::new(MarkerSource::Barcode(BarcodeId(2)), "b")
            .on_click(move |t| second_rec.set(t)),
    );

    session.tracker_mut().script.push_back(vec![
        sighting(
            TrackedId::Barcode(BarcodeId(1)),
            Matrix4::identity(),
            square_vertices(100.0, 200.0),
        ),
        sighting(
            TrackedId::Barcode(BarcodeId(2)),
            Matrix4::identity(),
            square_vertices(150.0, 250.0),
        ),
    ]);
    session.process().unwrap();

    let hits = session.click(175.0, 175.0);
    assert_eq!(hits.len(), 2);
    assert_eq!(first.get(), 1);
    assert_eq!(second.get(), 1);
}

#[test]
fn failed_loads_surface_through_marker_state() {
    let mut tracker = ScriptedTracker::new();
    tracker.fail_loads = true;
    let mut session =
        ArSession::with_tracker(tracker, &FixedVideo(640, 480), ArConfig::default()).unwrap();

    let handle = session.add_marker(MarkerDescriptor::new(
        MarkerSource::Pattern("patt.missing".into()),
        "cube",
    ));
    session.process().unwrap();

    match session.marker_state(handle) {
        Some(MarkerState::Failed(TrackerError::PatternLoad { resource, .. })) => {
            assert_eq!(resource, "patt.missing");
        }
        other => panic!("expected a failed state, got {other:?}"),
    }
    assert!(session.anchor(handle).is_none());
    assert_eq!(session.scene().registry().singles().count(), 0);
}

#[test]
fn barcode_markers_activate_immediately() {
    let mut session = landscape_session();
    let handle = session.add_marker(
        MarkerDescriptor::new(MarkerSource::Barcode(BarcodeId(63)), "cone").width(0.08),
    );
    assert!(matches!(
        session.marker_state(handle),
        Some(MarkerState::Active)
    ));
    assert_eq!(
        session.tracker().tracked,
        vec![(TrackedId::Barcode(BarcodeId(63)), 0.08)]
    );
}

#[test]
fn multi_marker_sets_follow_roots_and_members() {
    let mut tracker = ScriptedTracker::new();
    tracker.multi_sub_count = 3;
    let mut session =
        ArSession::with_tracker(tracker, &FixedVideo(640, 480), ArConfig::default()).unwrap();

    let handle = session.add_marker(MarkerDescriptor::new(
        MarkerSource::Multi("markers.dat".into()),
        "root",
    ));
    session.process().unwrap();
    assert!(matches!(
        session.marker_state(handle),
        Some(MarkerState::Active)
    ));

    let multi = session.multi_anchor_mut(handle).unwrap();
    assert_eq!(multi.subs().len(), 3);
    multi.sub_mut(0).unwrap().set_content("axis");

    let root_pose = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -50.0));
    let local = Matrix4::new_translation(&Vector3::new(2.0, 0.0, 0.0));
    session.tracker_mut().script.push_back(vec![
        TrackerEvent::MultiMarker(MultiMarkerUpdate {
            id: MultiMarkerId(0),
            pose: root_pose,
        }),
        TrackerEvent::MultiMarkerSub(SubMarkerUpdate {
            set: MultiMarkerId(0),
            index: 0,
            pose: local,
            status: SubMarkerStatus(4),
        }),
        TrackerEvent::MultiMarkerSub(SubMarkerUpdate {
            set: MultiMarkerId(0),
            index: 1,
            pose: local,
            status: SubMarkerStatus(-1),
        }),
    ]);
    session.process().unwrap();

    let multi = session.multi_anchor(handle).unwrap();
    assert!(multi.node().visible());
    assert!(multi.subs()[0].visible());
    assert!(!multi.subs()[1].visible());

    let mut renderer = RecordingRenderer::new();
    session.render_on(&mut renderer);
    assert_eq!(renderer.drawn_contents(), vec!["root", "axis"]);
    let expected_model = root_pose * local;
    assert!(renderer.calls.iter().any(|call| matches!(
        call,
        DrawCall::Marker { content, model } if content == "axis" && *model == expected_model
    )));
}

#[test]
fn detection_mode_and_code_type_reach_the_tracker() {
    let config = ArConfig {
        detection_mode: DetectionMode::MatrixCode,
        matrix_code_type: Some(MatrixCodeType::Matrix3x3Hamming63),
        ..ArConfig::default()
    };
    let session: ArSession<ScriptedTracker, &'static str> =
        ArSession::with_tracker(ScriptedTracker::new(), &FixedVideo(640, 480), config).unwrap();
    assert_eq!(session.tracker().mode, Some(DetectionMode::MatrixCode));
    assert_eq!(
        session.tracker().code_type,
        Some(MatrixCodeType::Matrix3x3Hamming63)
    );
}

#[test]
fn build_failures_abort_construction() {
    let no_frames = ArSession::<ScriptedTracker, &'static str>::with_tracker(
        ScriptedTracker::new(),
        &FixedVideo(0, 480),
        ArConfig::default(),
    );
    assert!(matches!(
        no_frames,
        Err(BuildError::InvalidVideo { width: 0, height: 480 })
    ));

    struct BrokenCalibration;
    impl CalibrationSource for BrokenCalibration {
        fn locator(&self) -> &str {
            "camera.json"
        }
        fn load(&self) -> Result<CameraCalibration, CalibrationError> {
            Err(CalibrationError::Load {
                locator: "camera.json".to_owned(),
                reason: "404".to_owned(),
            })
        }
    }

    let bad_calibration = ArSession::<ScriptedTracker, &'static str>::build(
        &FixedVideo(640, 480),
        &BrokenCalibration,
        ArConfig::default(),
        |_, _| Ok(ScriptedTracker::new()),
    );
    assert!(matches!(bad_calibration, Err(BuildError::Calibration(_))));

    let calibration = CameraCalibration {
        projection: sample_projection(),
        width: 640,
        height: 480,
    };
    let bad_tracker = ArSession::<ScriptedTracker, &'static str>::build(
        &FixedVideo(640, 480),
        &calibration,
        ArConfig::default(),
        |_, _| Err(TrackerError::Construct("no device".to_owned())),
    );
    assert!(matches!(bad_tracker, Err(BuildError::Tracker(_))));
}
