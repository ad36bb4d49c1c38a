//! Screen-space hit regions.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::marker::MarkerVertices;

/// Axis-aligned screen-space box spanned by a marker's projected corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitBox {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl HitBox {
    /// Bounding box of the four projected corners.
    pub fn from_vertices(vertices: &MarkerVertices) -> Self {
        let mut min = vertices[0];
        let mut max = vertices[0];
        for v in &vertices[1..] {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
        }
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    /// Shrink the box around its center to match content rendered at `scale`
    /// of the marker size. Each axis keeps `scale * extent`; scale 1 leaves
    /// the box unchanged, scale 0 collapses it to the center point.
    pub fn shrunk_by_scale(self, scale: Vector2<f64>) -> Self {
        let inset_x = self.width() * (1.0 - scale.x) * 0.5;
        let inset_y = self.height() * (1.0 - scale.y) * 0.5;
        Self {
            min: Point2::new(self.min.x + inset_x, self.min.y + inset_y),
            max: Point2::new(self.max.x - inset_x, self.max.y - inset_y),
        }
    }

    /// Whether `point` lies inside the box, boundary included.
    pub fn contains(&self, point: Point2<f64>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}
