use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Pixel-space box covering the whole canvas.
    #[must_use]
    pub fn bounds(self) -> super::BoundingBox {
        super::BoundingBox::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}
