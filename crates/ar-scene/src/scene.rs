//! Scene bridge: projection camera, video background and the anchor graph.

use ar_scene_core::{FrameGeometry, MarkerTracker, VideoSource};
use nalgebra::Matrix4;

use crate::config::ArConfig;
use crate::registry::MarkerRegistry;
use crate::renderer::{ArRenderer, MarkerInstance};
use crate::session::BuildError;

/// Camera whose projection comes from the tracker's calibration.
///
/// The projection is copied verbatim at build time; rendered content lines
/// up with the video only if the renderer uses it unmodified.
#[derive(Clone, Debug, PartialEq)]
pub struct ArCamera {
    projection: Matrix4<f64>,
}

impl ArCamera {
    pub fn from_projection(projection: Matrix4<f64>) -> Self {
        Self { projection }
    }

    pub fn projection(&self) -> &Matrix4<f64> {
        &self.projection
    }
}

/// Full-viewport quad textured with the live camera image.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoBackground {
    size: (u32, u32),
    rotation: f64,
    texture_generation: u64,
}

impl VideoBackground {
    fn new(geometry: &FrameGeometry) -> Self {
        Self {
            size: geometry.renderer_size(),
            rotation: geometry.orientation.background_rotation(),
            texture_generation: 0,
        }
    }

    /// Display size of the quad in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Rotation of the quad in radians. Portrait feeds draw turned by pi/2
    /// to undo the processing-buffer swap.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Bumped once per rendered frame. A change tells the host to re-upload
    /// the current video image into its texture.
    pub fn texture_generation(&self) -> u64 {
        self.texture_generation
    }

    pub(crate) fn mark_frame(&mut self) {
        self.texture_generation += 1;
    }
}

/// Renderer-facing bundle tying a video feed to a constructed tracker:
/// calibrated camera, video background and the marker anchor registry.
pub struct ArScene<C> {
    camera: ArCamera,
    background: VideoBackground,
    registry: MarkerRegistry<C>,
    geometry: FrameGeometry,
}

impl<C> ArScene<C> {
    /// Assemble the bundle around an already-constructed tracker.
    pub fn new<T: MarkerTracker + ?Sized>(geometry: FrameGeometry, tracker: &T) -> Self {
        Self {
            camera: ArCamera::from_projection(tracker.projection_matrix()),
            background: VideoBackground::new(&geometry),
            registry: MarkerRegistry::new(),
            geometry,
        }
    }

    /// Assemble the bundle from a live video feed. Fails when the video has
    /// no decoded frames yet.
    pub fn build<T: MarkerTracker + ?Sized>(
        video: &dyn VideoSource,
        tracker: &T,
        config: &ArConfig,
    ) -> Result<Self, BuildError> {
        let (width, height) = video.dimensions();
        let geometry = FrameGeometry::from_dimensions(width, height, config.max_video_size)
            .ok_or(BuildError::InvalidVideo { width, height })?;
        Ok(Self::new(geometry, tracker))
    }

    pub fn camera(&self) -> &ArCamera {
        &self.camera
    }

    pub fn background(&self) -> &VideoBackground {
        &self.background
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    pub fn registry(&self) -> &MarkerRegistry<C> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MarkerRegistry<C> {
        &mut self.registry
    }

    /// Draw one frame: clear once, video quad first, then every visible
    /// anchor. The renderer's auto-clear flag is restored afterwards.
    pub fn render_on<R: ArRenderer<C>>(&mut self, renderer: &mut R) {
        self.background.mark_frame();

        let saved_auto_clear = renderer.auto_clear();
        renderer.set_auto_clear(false);
        renderer.clear();
        renderer.draw_background(&self.background);

        for (_, anchor) in self.registry.singles() {
            if anchor.visible() {
                renderer.draw_marker(&self.camera, &MarkerInstance::from_anchor(anchor));
            }
        }
        for (_, multi) in self.registry.multis() {
            if !multi.node().visible() {
                continue;
            }
            renderer.draw_marker(&self.camera, &MarkerInstance::from_anchor(multi.node()));
            for sub in multi.subs() {
                if !sub.visible() {
                    continue;
                }
                if let Some(instance) = MarkerInstance::from_sub(multi.node(), sub) {
                    renderer.draw_marker(&self.camera, &instance);
                }
            }
        }

        renderer.set_auto_clear(saved_auto_clear);
    }
}
