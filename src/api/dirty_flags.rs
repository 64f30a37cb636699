use std::fmt;

use serde::{Deserialize, Serialize};

/// Named recompute concern a mutation can invalidate.
///
/// Flags are grouped by the pipeline phase whose step normally consumes them:
/// data, scales, geometry, decorations, labels, accessibility, interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum DirtyFlag {
    PrepareData,
    TableData,
    LegendData,
    InteractionKeys,
    Layout,
    RecomputeScales,
    ResetRoot,
    EnterUpdateExit,
    RedrawGeometry,
    Colors,
    Textures,
    Strokes,
    RoundedCorners,
    Axes,
    Grid,
    Baseline,
    ReferenceLines,
    Annotations,
    Legend,
    LabelContent,
    RepositionLabels,
    LabelVisibility,
    LabelColor,
    LabelRemoval,
    RelabelAccessibility,
    DescriptionWrapper,
    AccessibilityMetadata,
    AccessibilityCount,
    AxisAccessibility,
    AnnotationAccessibility,
    InteractionState,
    SelectionClass,
    Cursor,
    BindInteractivity,
    LegendInteractivity,
}

impl DirtyFlag {
    pub const ALL: [Self; 35] = [
        Self::PrepareData,
        Self::TableData,
        Self::LegendData,
        Self::InteractionKeys,
        Self::Layout,
        Self::RecomputeScales,
        Self::ResetRoot,
        Self::EnterUpdateExit,
        Self::RedrawGeometry,
        Self::Colors,
        Self::Textures,
        Self::Strokes,
        Self::RoundedCorners,
        Self::Axes,
        Self::Grid,
        Self::Baseline,
        Self::ReferenceLines,
        Self::Annotations,
        Self::Legend,
        Self::LabelContent,
        Self::RepositionLabels,
        Self::LabelVisibility,
        Self::LabelColor,
        Self::LabelRemoval,
        Self::RelabelAccessibility,
        Self::DescriptionWrapper,
        Self::AccessibilityMetadata,
        Self::AccessibilityCount,
        Self::AxisAccessibility,
        Self::AnnotationAccessibility,
        Self::InteractionState,
        Self::SelectionClass,
        Self::Cursor,
        Self::BindInteractivity,
        Self::LegendInteractivity,
    ];

    const fn bit(self) -> u64 {
        1 << (self as u8)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PrepareData => "prepareData",
            Self::TableData => "tableData",
            Self::LegendData => "legendData",
            Self::InteractionKeys => "interactionKeys",
            Self::Layout => "layout",
            Self::RecomputeScales => "recomputeScales",
            Self::ResetRoot => "resetRoot",
            Self::EnterUpdateExit => "enterUpdateExit",
            Self::RedrawGeometry => "redrawGeometry",
            Self::Colors => "colors",
            Self::Textures => "textures",
            Self::Strokes => "strokes",
            Self::RoundedCorners => "roundedCorners",
            Self::Axes => "axes",
            Self::Grid => "grid",
            Self::Baseline => "baseline",
            Self::ReferenceLines => "referenceLines",
            Self::Annotations => "annotations",
            Self::Legend => "legend",
            Self::LabelContent => "labelContent",
            Self::RepositionLabels => "repositionLabels",
            Self::LabelVisibility => "labelVisibility",
            Self::LabelColor => "labelColor",
            Self::LabelRemoval => "labelRemoval",
            Self::RelabelAccessibility => "relabelAccessibility",
            Self::DescriptionWrapper => "descriptionWrapper",
            Self::AccessibilityMetadata => "accessibilityMetadata",
            Self::AccessibilityCount => "accessibilityCount",
            Self::AxisAccessibility => "axisAccessibility",
            Self::AnnotationAccessibility => "annotationAccessibility",
            Self::InteractionState => "interactionState",
            Self::SelectionClass => "selectionClass",
            Self::Cursor => "cursor",
            Self::BindInteractivity => "bindInteractivity",
            Self::LegendInteractivity => "legendInteractivity",
        }
    }
}

impl fmt::Display for DirtyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bitmask of dirty flags.
///
/// Serializes as the list of set flag names so pending state can be dumped
/// for debugging.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "Vec<DirtyFlag>", from = "Vec<DirtyFlag>")]
pub struct DirtyFlags {
    bits: u64,
}

impl DirtyFlags {
    #[must_use]
    pub const fn none() -> Self {
        Self { bits: 0 }
    }

    #[must_use]
    pub const fn all() -> Self {
        let mut bits = 0;
        let mut index = 0;
        while index < DirtyFlag::ALL.len() {
            bits |= DirtyFlag::ALL[index].bit();
            index += 1;
        }
        Self { bits }
    }

    #[must_use]
    pub const fn from_flag(flag: DirtyFlag) -> Self {
        Self { bits: flag.bit() }
    }

    #[must_use]
    pub const fn from_flags(flags: &[DirtyFlag]) -> Self {
        let mut bits = 0;
        let mut index = 0;
        while index < flags.len() {
            bits |= flags[index].bit();
            index += 1;
        }
        Self { bits }
    }

    #[must_use]
    pub const fn with_flag(self, flag: DirtyFlag) -> Self {
        Self {
            bits: self.bits | flag.bit(),
        }
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        (self.bits & other.bits) != 0
    }

    #[must_use]
    pub const fn contains_flag(self, flag: DirtyFlag) -> bool {
        (self.bits & flag.bit()) != 0
    }

    #[must_use]
    pub const fn contains_all(self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.bits == 0
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.is_none()
    }

    pub fn insert(&mut self, flag: DirtyFlag) {
        self.bits |= flag.bit();
    }

    pub fn merge(&mut self, other: Self) {
        self.bits |= other.bits;
    }

    pub fn remove_all(&mut self, other: Self) {
        self.bits &= !other.bits;
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    /// Set flags in declaration order.
    pub fn iter(self) -> impl Iterator<Item = DirtyFlag> {
        DirtyFlag::ALL
            .into_iter()
            .filter(move |flag| self.contains_flag(*flag))
    }
}

impl fmt::Debug for DirtyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl From<DirtyFlag> for DirtyFlags {
    fn from(flag: DirtyFlag) -> Self {
        Self::from_flag(flag)
    }
}

impl FromIterator<DirtyFlag> for DirtyFlags {
    fn from_iter<I: IntoIterator<Item = DirtyFlag>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with_flag)
    }
}

impl From<Vec<DirtyFlag>> for DirtyFlags {
    fn from(flags: Vec<DirtyFlag>) -> Self {
        flags.into_iter().collect()
    }
}

impl From<DirtyFlags> for Vec<DirtyFlag> {
    fn from(flags: DirtyFlags) -> Self {
        flags.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{DirtyFlag, DirtyFlags};

    #[test]
    fn every_flag_has_a_distinct_bit() {
        let all = DirtyFlags::all();
        assert_eq!(all.len(), DirtyFlag::ALL.len());
        for flag in DirtyFlag::ALL {
            assert!(all.contains_flag(flag));
        }
    }

    #[test]
    fn union_difference_and_contains_work() {
        let flags = DirtyFlags::from_flag(DirtyFlag::PrepareData).with_flag(DirtyFlag::Axes);
        assert!(flags.contains_flag(DirtyFlag::PrepareData));
        assert!(flags.contains_flag(DirtyFlag::Axes));
        assert!(!flags.contains_flag(DirtyFlag::Legend));

        let remaining = flags.difference(DirtyFlags::from_flag(DirtyFlag::Axes));
        assert_eq!(remaining, DirtyFlags::from_flag(DirtyFlag::PrepareData));
        assert!(flags.contains_all(remaining));
        assert!(!remaining.contains_all(flags));
    }

    #[test]
    fn iteration_follows_declaration_order() {
        let flags = DirtyFlags::from_flags(&[
            DirtyFlag::Cursor,
            DirtyFlag::PrepareData,
            DirtyFlag::RepositionLabels,
        ]);
        let collected = flags.iter().collect::<Vec<_>>();
        assert_eq!(
            collected,
            vec![
                DirtyFlag::PrepareData,
                DirtyFlag::RepositionLabels,
                DirtyFlag::Cursor
            ]
        );
    }

    #[test]
    fn serializes_as_flag_names() {
        let flags = DirtyFlags::from_flags(&[DirtyFlag::PrepareData, DirtyFlag::LabelColor]);
        let json = serde_json::to_string(&flags).expect("serialize flags");
        assert_eq!(json, r#"["prepareData","labelColor"]"#);

        let parsed: DirtyFlags = serde_json::from_str(&json).expect("deserialize flags");
        assert_eq!(parsed, flags);
    }
}
