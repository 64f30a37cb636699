pub mod geometry;
pub mod types;

pub use geometry::BoundingBox;
pub use types::Viewport;
