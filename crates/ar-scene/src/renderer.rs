//! The renderer seam.

use nalgebra::{Matrix4, Rotation3, Vector3};

use crate::registry::{AnchorNode, SubNode};
use crate::scene::{ArCamera, VideoBackground};

/// One visible marker to draw: host content plus its composed placement.
pub struct MarkerInstance<'a, C> {
    /// Content the host registered for this marker.
    pub content: &'a C,
    /// Marker pose relative to the camera.
    pub pose: Matrix4<f64>,
    /// Spin of the content around the marker normal, in radians.
    pub spin_angle: f64,
    /// Scale of the content relative to the marker size.
    pub content_scale: Vector3<f64>,
}

impl<'a, C> MarkerInstance<'a, C> {
    pub(crate) fn from_anchor(anchor: &'a AnchorNode<C>) -> Self {
        Self {
            content: anchor.content(),
            pose: *anchor.transform(),
            spin_angle: anchor.spin().current(),
            content_scale: anchor.content_scale(),
        }
    }

    /// Instance for a multi-marker member. Its transform is local to the set
    /// root, so the root pose is folded in here. Returns `None` when the
    /// host attached no content to the slot.
    pub(crate) fn from_sub(root: &AnchorNode<C>, sub: &'a SubNode<C>) -> Option<Self> {
        Some(Self {
            content: sub.content()?,
            pose: root.transform() * sub.transform(),
            spin_angle: 0.0,
            content_scale: Vector3::new(1.0, 1.0, 1.0),
        })
    }

    /// Full model matrix: marker pose, then spin about the marker normal,
    /// then the content scale.
    pub fn model_matrix(&self) -> Matrix4<f64> {
        let spin = Rotation3::from_axis_angle(&Vector3::z_axis(), self.spin_angle).to_homogeneous();
        let scale = Matrix4::new_nonuniform_scaling(&self.content_scale);
        self.pose * spin * scale
    }
}

/// Interface the glue expects from a rendering backend.
///
/// The session never owns a graphics device; it hands the backend typed draw
/// requests in back-to-front order and leaves resource management to the
/// host. All calls arrive on the thread driving the frame loop.
pub trait ArRenderer<C> {
    /// Resize the output surface, in display pixels.
    fn set_size(&mut self, width: u32, height: u32);

    /// Whether the backend clears the target on its own before each draw.
    fn auto_clear(&self) -> bool;

    fn set_auto_clear(&mut self, auto_clear: bool);

    /// Clear the render target now.
    fn clear(&mut self);

    /// Draw the full-viewport video quad. Always requested before any
    /// marker content so the camera image stays behind the augmentation.
    fn draw_background(&mut self, background: &VideoBackground);

    /// Draw one marker's content under the session camera.
    fn draw_marker(&mut self, camera: &ArCamera, instance: &MarkerInstance<'_, C>);
}
