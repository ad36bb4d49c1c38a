//! Drives a session without any camera or GPU: a scripted tracker plays
//! back a short marker trajectory and a console renderer prints what a real
//! backend would draw.
//!
//! Run with `cargo run --example scripted_overlay`.

use std::collections::VecDeque;

use ar_scene::core::{
    init_with_level, BarcodeId, LoadTicket, MarkerSnapshot, MarkerTracker, MarkerUpdate,
    PatternId, TrackedId, TrackerError, TrackerEvent, VideoSource,
};
use ar_scene::{
    ArCamera, ArConfig, ArRenderer, ArSession, MarkerDescriptor, MarkerInstance, MarkerSource,
    VideoBackground,
};
use log::LevelFilter;
use nalgebra::{Matrix4, Point2, Vector3};

/// Stand-in for a camera feed: fixed 640x480 frames.
struct CannedVideo;

impl VideoSource for CannedVideo {
    fn dimensions(&self) -> (u32, u32) {
        (640, 480)
    }
}

/// Tracker that "detects" one barcode marker sliding across the view.
struct OrbitTracker {
    frames: VecDeque<Vec<TrackerEvent>>,
    current: Vec<TrackerEvent>,
    next_ticket: u64,
}

impl OrbitTracker {
    fn new() -> Self {
        let frames = (0..5)
            .map(|i| {
                let t = f64::from(i);
                let pose = Matrix4::new_translation(&Vector3::new(t * 0.1, 0.0, -20.0));
                let x = 200.0 + t * 40.0;
                vec![TrackerEvent::Marker(MarkerUpdate {
                    id: TrackedId::Barcode(BarcodeId(20)),
                    pose,
                    vertices: [
                        Point2::new(x, 180.0),
                        Point2::new(x + 80.0, 180.0),
                        Point2::new(x + 80.0, 260.0),
                        Point2::new(x, 260.0),
                    ],
                })]
            })
            .collect();
        Self {
            frames,
            current: Vec::new(),
            next_ticket: 0,
        }
    }
}

impl MarkerTracker for OrbitTracker {
    fn set_detection_mode(&mut self, _mode: ar_scene::DetectionMode) {}

    fn set_matrix_code_type(&mut self, _code: ar_scene::MatrixCodeType) {}

    fn load_pattern_marker(&mut self, _source: &str) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn load_multi_marker(&mut self, _source: &str) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn track_pattern_marker(&mut self, _id: PatternId, _width: f64) {}

    fn track_barcode_marker(&mut self, _id: BarcodeId, _width: f64) {}

    fn process(&mut self) -> Result<(), TrackerError> {
        self.current = self.frames.pop_front().unwrap_or_default();
        Ok(())
    }

    fn drain_events(&mut self, into: &mut Vec<TrackerEvent>) {
        into.append(&mut self.current);
    }

    fn detected_markers(&self) -> Vec<MarkerSnapshot> {
        Vec::new()
    }

    fn projection_matrix(&self) -> Matrix4<f64> {
        Matrix4::new_perspective(640.0 / 480.0, 0.7, 0.1, 1000.0)
    }
}

/// Renderer that narrates draw calls instead of issuing them to a GPU.
struct ConsoleRenderer {
    auto_clear: bool,
}

impl ArRenderer<&'static str> for ConsoleRenderer {
    fn set_size(&mut self, width: u32, height: u32) {
        println!("viewport {width}x{height}");
    }

    fn auto_clear(&self) -> bool {
        self.auto_clear
    }

    fn set_auto_clear(&mut self, auto_clear: bool) {
        self.auto_clear = auto_clear;
    }

    fn clear(&mut self) {
        println!("clear");
    }

    fn draw_background(&mut self, background: &VideoBackground) {
        let (w, h) = background.size();
        println!(
            "background {w}x{h} (texture generation {})",
            background.texture_generation()
        );
    }

    fn draw_marker(&mut self, _camera: &ArCamera, instance: &MarkerInstance<'_, &'static str>) {
        let position = instance.pose.column(3);
        println!(
            "draw {:>8} at ({:.2}, {:.2}, {:.2}) spin {:.2} rad",
            instance.content, position[0], position[1], position[2], instance.spin_angle
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(LevelFilter::Info)?;

    let video = CannedVideo;
    let mut session = ArSession::with_tracker(OrbitTracker::new(), &video, ArConfig::default())?;

    session.add_marker(
        MarkerDescriptor::new(MarkerSource::Barcode(BarcodeId(20)), "teapot")
            .on_click(|turns| println!("teapot clicked, {turns} turn(s) queued")),
    );

    let mut renderer = ConsoleRenderer { auto_clear: true };
    let (width, height) = session.scene().geometry().renderer_size();
    renderer.set_size(width, height);

    for frame in 0..5 {
        session.tick(&mut renderer)?;
        if frame == 2 {
            // poke the marker mid-flight
            let hits = session.click(300.0, 220.0);
            println!("frame {frame}: {} click hit(s)", hits.len());
        }
    }

    Ok(())
}
