//! Video feed seam and processing geometry.

use serde::{Deserialize, Serialize};

/// Live video feed driving an AR session.
///
/// Playback, decoding and pixel upload stay on the host side; the glue only
/// needs the intrinsic size of the decoded frames.
pub trait VideoSource {
    /// Intrinsic (width, height) of the decoded video in pixels.
    fn dimensions(&self) -> (u32, u32);
}

/// Frame orientation relative to the tracker's landscape processing buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Angle in radians the background quad is rotated by at render time so
    /// the displayed video matches the swapped processing buffer.
    pub fn background_rotation(self) -> f64 {
        match self {
            Orientation::Landscape => 0.0,
            Orientation::Portrait => std::f64::consts::FRAC_PI_2,
        }
    }
}

/// Processing and display geometry derived from a video feed.
///
/// The tracker always consumes landscape buffers, so portrait feeds have
/// their dimensions swapped before tracker construction. `max_video_size`
/// caps the longest processing edge; the display size is never scaled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub orientation: Orientation,
    /// Width of the buffer handed to the tracker.
    pub processing_width: u32,
    /// Height of the buffer handed to the tracker.
    pub processing_height: u32,
    /// Width the renderer should present the video at.
    pub display_width: u32,
    /// Height the renderer should present the video at.
    pub display_height: u32,
}

impl FrameGeometry {
    /// Derive the geometry from raw video dimensions.
    ///
    /// Returns `None` when either dimension is zero, which means the video
    /// has no decoded frames yet.
    pub fn from_dimensions(width: u32, height: u32, max_video_size: Option<u32>) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let longest = width.max(height);
        let f = match max_video_size {
            Some(cap) => f64::from(cap) / f64::from(longest),
            None => 1.0,
        };
        let scaled_w = (f * f64::from(width)).round() as u32;
        let scaled_h = (f * f64::from(height)).round() as u32;

        let (orientation, processing, display) = if width < height {
            (
                Orientation::Portrait,
                (scaled_h, scaled_w),
                (height, width),
            )
        } else {
            (
                Orientation::Landscape,
                (scaled_w, scaled_h),
                (width, height),
            )
        };

        Some(Self {
            orientation,
            processing_width: processing.0,
            processing_height: processing.1,
            display_width: display.0,
            display_height: display.1,
        })
    }

    /// Derive the geometry from a live video source.
    pub fn from_video(video: &dyn VideoSource, max_video_size: Option<u32>) -> Option<Self> {
        let (width, height) = video.dimensions();
        Self::from_dimensions(width, height, max_video_size)
    }

    /// Size the renderer viewport should take, in display pixels.
    pub fn renderer_size(&self) -> (u32, u32) {
        (self.display_width, self.display_height)
    }

    pub fn is_portrait(&self) -> bool {
        self.orientation == Orientation::Portrait
    }
}
