use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Axis-aligned pixel-space box, `x1 <= x2` and `y1 <= y2` (y grows downward).
///
/// Anchors, label boxes and avoid regions all use this type. A data point is a
/// zero-size box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    #[must_use]
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    #[must_use]
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    pub fn validate(self, name: &str) -> ChartResult<Self> {
        if [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .any(|value| !value.is_finite())
        {
            return Err(ChartError::InvalidData(format!(
                "{name} bounds must be finite"
            )));
        }
        Ok(self)
    }

    #[must_use]
    pub fn width(self) -> f64 {
        self.x2 - self.x1
    }

    #[must_use]
    pub fn height(self) -> f64 {
        self.y2 - self.y1
    }

    #[must_use]
    pub fn center_x(self) -> f64 {
        0.5 * (self.x1 + self.x2)
    }

    #[must_use]
    pub fn center_y(self) -> f64 {
        0.5 * (self.y1 + self.y2)
    }

    /// Left edge, center or right edge for `dx` of -1, 0 or 1.
    #[must_use]
    pub fn x_at(self, dx: i8) -> f64 {
        match dx.signum() {
            -1 => self.x1,
            0 => self.center_x(),
            _ => self.x2,
        }
    }

    /// Top edge, center or bottom edge for `dy` of -1, 0 or 1.
    #[must_use]
    pub fn y_at(self, dy: i8) -> f64 {
        match dy.signum() {
            -1 => self.y1,
            0 => self.center_y(),
            _ => self.y2,
        }
    }

    /// Overlap test with inclusive edges: boxes that touch collide.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.x1 <= other.x2 && other.x1 <= self.x2 && other.y1 <= self.y2 && self.y1 <= other.y2
    }

    /// `true` when no part of the box lies inside `[0, width] x [0, height]`.
    #[must_use]
    pub fn lies_outside(self, width: f64, height: f64) -> bool {
        self.x2 < 0.0 || self.y2 < 0.0 || self.x1 > width || self.y1 > height
    }

    #[must_use]
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }
}
