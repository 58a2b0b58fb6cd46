use crate::data::Dimension;

/// Main-axis direction of a linear container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Cross-axis placement of a child inside a linear container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CrossAlign {
    #[default]
    Start,
    Center,
    End,
    /// Fill the container's cross extent, clamped by the child's own
    /// cross-axis min/max constraints.
    Stretch,
}

/// Main-axis distribution policy of a linear container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Justify {
    #[default]
    Start,
    Center,
    End,
    SpaceAround,
    SpaceBetween,
    SpaceEvenly,
}

/// Main-axis arrangement of a linear container's children.
///
/// `spacing` only applies for `Start`/`Center`/`End`; the `Space*` policies
/// derive their gaps from leftover space instead.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct LinearArrangement {
    pub justify: Justify,
    pub spacing: Dimension,
}

impl LinearArrangement {
    pub fn justified(justify: Justify) -> Self {
        Self {
            justify,
            spacing: Dimension::UNSET,
        }
    }

    /// Fixed spacing between children. A `Space*` justification makes no
    /// sense with fixed spacing and falls back to `Start`.
    pub fn spaced_by(spacing: impl Into<Dimension>, justify: Justify) -> Self {
        let justify = match justify {
            Justify::Start | Justify::Center | Justify::End => justify,
            _ => Justify::Start,
        };
        Self {
            justify,
            spacing: spacing.into(),
        }
    }

    pub fn is_spacing_relevant(&self) -> bool {
        matches!(self.justify, Justify::Start | Justify::Center | Justify::End)
    }
}

/// Per-child layout hint consumed by the linear container engine.
///
/// The variant must match the orientation of the containing element for the
/// growth factor to apply; a mismatched hint behaves as non-growing.
/// `HBox`/`VBox` are the legacy spellings of `Row`/`Column` with identical
/// semantics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ContainerSizing {
    Row { growth: f32, align: CrossAlign },
    Column { growth: f32, align: CrossAlign },
    HBox { growth: f32, align: CrossAlign },
    VBox { growth: f32, align: CrossAlign },
}

impl ContainerSizing {
    pub fn row(growth: f32) -> Self {
        Self::Row {
            growth,
            align: CrossAlign::default(),
        }
    }

    pub fn column(growth: f32) -> Self {
        Self::Column {
            growth,
            align: CrossAlign::default(),
        }
    }

    pub fn hbox(growth: f32) -> Self {
        Self::HBox {
            growth,
            align: CrossAlign::Stretch,
        }
    }

    pub fn vbox(growth: f32) -> Self {
        Self::VBox {
            growth,
            align: CrossAlign::Stretch,
        }
    }

    pub fn with_align(self, align: CrossAlign) -> Self {
        match self {
            Self::Row { growth, .. } => Self::Row { growth, align },
            Self::Column { growth, .. } => Self::Column { growth, align },
            Self::HBox { growth, .. } => Self::HBox { growth, align },
            Self::VBox { growth, .. } => Self::VBox { growth, align },
        }
    }

    pub fn orientation(&self) -> Orientation {
        match self {
            Self::Row { .. } | Self::HBox { .. } => Orientation::Horizontal,
            Self::Column { .. } | Self::VBox { .. } => Orientation::Vertical,
        }
    }

    /// Growth factor along `orientation`, or 0 when the hint targets the
    /// other axis. Negative factors make no sense and clamp to 0.
    pub fn growth_for(&self, orientation: Orientation) -> f32 {
        if self.orientation() != orientation {
            return 0.0;
        }
        let (Self::Row { growth, .. }
        | Self::Column { growth, .. }
        | Self::HBox { growth, .. }
        | Self::VBox { growth, .. }) = self;
        growth.max(0.0)
    }

    /// The child's cross-axis alignment override, only honored when the hint
    /// matches the container orientation.
    pub fn align_for(&self, orientation: Orientation) -> Option<CrossAlign> {
        if self.orientation() != orientation {
            return None;
        }
        let (Self::Row { align, .. }
        | Self::Column { align, .. }
        | Self::HBox { align, .. }
        | Self::VBox { align, .. }) = self;
        Some(*align)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_only_applies_along_the_matching_axis() {
        let sizing = ContainerSizing::row(2.0);
        assert_eq!(sizing.growth_for(Orientation::Horizontal), 2.0);
        assert_eq!(sizing.growth_for(Orientation::Vertical), 0.0);
    }

    #[test]
    fn legacy_box_variants_share_row_column_semantics() {
        assert_eq!(
            ContainerSizing::hbox(1.0).orientation(),
            ContainerSizing::row(1.0).orientation()
        );
        assert_eq!(
            ContainerSizing::vbox(1.0).growth_for(Orientation::Vertical),
            1.0
        );
    }

    #[test]
    fn negative_growth_clamps_to_zero() {
        assert_eq!(
            ContainerSizing::column(-3.0).growth_for(Orientation::Vertical),
            0.0
        );
    }

    #[test]
    fn spaced_by_rejects_space_justifications() {
        let arrangement = LinearArrangement::spaced_by(8.0, Justify::SpaceBetween);
        assert_eq!(arrangement.justify, Justify::Start);
        assert!(arrangement.is_spacing_relevant());
    }
}
