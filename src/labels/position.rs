use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::BoundingBox;
use crate::error::{ChartError, ChartResult};

/// Side of the mark a label is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelAnchor {
    TopLeft,
    Top,
    TopRight,
    Left,
    Middle,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl LabelAnchor {
    pub const ALL: [Self; 9] = [
        Self::TopLeft,
        Self::Top,
        Self::TopRight,
        Self::Left,
        Self::Middle,
        Self::Right,
        Self::BottomLeft,
        Self::Bottom,
        Self::BottomRight,
    ];

    /// Horizontal direction: -1 left, 0 center, 1 right.
    #[must_use]
    pub const fn dx(self) -> i8 {
        match self {
            Self::TopLeft | Self::Left | Self::BottomLeft => -1,
            Self::Top | Self::Middle | Self::Bottom => 0,
            Self::TopRight | Self::Right | Self::BottomRight => 1,
        }
    }

    /// Vertical direction: -1 above, 0 middle, 1 below.
    #[must_use]
    pub const fn dy(self) -> i8 {
        match self {
            Self::TopLeft | Self::Top | Self::TopRight => -1,
            Self::Left | Self::Middle | Self::Right => 0,
            Self::BottomLeft | Self::Bottom | Self::BottomRight => 1,
        }
    }

    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        self.dx() != 0 && self.dy() != 0
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::Top => "top",
            Self::TopRight => "top-right",
            Self::Left => "left",
            Self::Middle => "middle",
            Self::Right => "right",
            Self::BottomLeft => "bottom-left",
            Self::Bottom => "bottom",
            Self::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for LabelAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LabelAnchor {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|anchor| anchor.name() == value)
            .ok_or_else(|| ChartError::InvalidData(format!("unknown label anchor `{value}`")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBaseline {
    Top,
    Middle,
    Bottom,
}

/// Anchor direction plus pixel offset from the mark.
///
/// A negative offset places the label inside the mark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidatePosition {
    pub anchor: LabelAnchor,
    pub offset: f64,
}

/// Box and text alignment of a label at one candidate position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionedBox {
    pub bbox: BoundingBox,
    pub align: TextAlign,
    pub baseline: TextBaseline,
}

impl CandidatePosition {
    #[must_use]
    pub const fn new(anchor: LabelAnchor, offset: f64) -> Self {
        Self { anchor, offset }
    }

    /// Parses `"top"`, `"bottom-left"`, ... with the given offset.
    pub fn parse(anchor: &str, offset: f64) -> ChartResult<Self> {
        if !offset.is_finite() {
            return Err(ChartError::InvalidData(format!(
                "offset for label anchor `{anchor}` must be finite"
            )));
        }
        Ok(Self::new(anchor.parse()?, offset))
    }

    #[must_use]
    pub fn is_inside(self) -> bool {
        self.offset < 0.0
    }

    /// Label box of size `width` x `height` attached to `mark` at this position.
    #[must_use]
    pub fn place_box(self, mark: BoundingBox, width: f64, height: f64) -> PositionedBox {
        let dx = self.anchor.dx();
        let dy = self.anchor.dy();
        let size_factor = if self.anchor.is_diagonal() {
            FRAC_1_SQRT_2
        } else {
            1.0
        };
        let inside: i8 = if self.is_inside() { -1 } else { 1 };
        let fdx = f64::from(dx);
        let fdy = f64::from(dy);
        let finside = f64::from(inside);

        let yc = mark.y_at(dy) + finside * height * fdy / 2.0 + self.offset * fdy * size_factor;
        let x = mark.x_at(dx) + self.offset * fdx * size_factor;
        let xc = x + finside * width * fdx / 2.0;

        PositionedBox {
            bbox: BoundingBox::new(
                xc - width / 2.0,
                yc - height / 2.0,
                xc + width / 2.0,
                yc + height / 2.0,
            ),
            align: match dx * inside {
                -1 => TextAlign::Right,
                0 => TextAlign::Center,
                _ => TextAlign::Left,
            },
            baseline: match dy * inside {
                -1 => TextBaseline::Bottom,
                0 => TextBaseline::Middle,
                _ => TextBaseline::Top,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{CandidatePosition, LabelAnchor, TextAlign, TextBaseline};
    use crate::core::BoundingBox;

    #[test]
    fn anchors_round_trip_through_names() {
        for anchor in LabelAnchor::ALL {
            assert_eq!(anchor.name().parse::<LabelAnchor>().expect("known"), anchor);
        }
        assert!("above".parse::<LabelAnchor>().is_err());
    }

    #[test]
    fn top_position_sits_above_the_mark() {
        let mark = BoundingBox::new(10.0, 50.0, 30.0, 100.0);
        let placed = CandidatePosition::new(LabelAnchor::Top, 4.0).place_box(mark, 20.0, 10.0);
        assert_relative_eq!(placed.bbox.y2, 46.0);
        assert_relative_eq!(placed.bbox.y1, 36.0);
        assert_relative_eq!(placed.bbox.center_x(), 20.0);
        assert_eq!(placed.align, TextAlign::Center);
        assert_eq!(placed.baseline, TextBaseline::Bottom);
    }

    #[test]
    fn negative_offset_places_label_inside() {
        let mark = BoundingBox::new(0.0, 0.0, 40.0, 100.0);
        let placed = CandidatePosition::new(LabelAnchor::Top, -2.0).place_box(mark, 10.0, 10.0);
        assert_relative_eq!(placed.bbox.y1, 2.0);
        assert_relative_eq!(placed.bbox.y2, 12.0);
        assert_eq!(placed.baseline, TextBaseline::Top);
    }

    #[test]
    fn diagonal_offsets_are_scaled() {
        let mark = BoundingBox::point(100.0, 100.0);
        let placed =
            CandidatePosition::new(LabelAnchor::BottomRight, 10.0).place_box(mark, 20.0, 10.0);
        let step = 10.0 * std::f64::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(placed.bbox.x1, 100.0 + step);
        assert_relative_eq!(placed.bbox.y1, 100.0 + step);
        assert_eq!(placed.align, TextAlign::Left);
        assert_eq!(placed.baseline, TextBaseline::Top);
    }
}
