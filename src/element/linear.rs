use super::layout::AxisConstraints;
use super::sizing::{CrossAlign, Justify};

/// One child's main-axis inputs to the linear solver.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LinearSlot {
    pub preferred: f32,
    pub constraints: AxisConstraints,
    pub growth: f32,
}

/// Main-axis placement of one child, relative to the container's content
/// origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SlotPlacement {
    pub offset: f32,
    pub size: f32,
}

/// Distributes `extent` among `slots` along the main axis.
///
/// Non-growers take their clamped preferred size. Growers split the
/// remaining space proportionally to their growth factors, each clamped by
/// its own constraints; a clamped grower's surplus is not redistributed.
/// `spacing` is the resolved fixed gap and only applies to
/// `Start`/`Center`/`End`.
pub(crate) fn solve_main_axis(
    extent: f32,
    justify: Justify,
    spacing: f32,
    slots: &[LinearSlot],
) -> Vec<SlotPlacement> {
    if slots.is_empty() {
        return Vec::new();
    }
    let extent = extent.max(0.0);
    let spacing_relevant = matches!(justify, Justify::Start | Justify::Center | Justify::End);
    let spacing = if spacing_relevant { spacing.max(0.0) } else { 0.0 };
    let total_spacing = spacing * (slots.len() - 1) as f32;

    let mut used = total_spacing;
    let mut growth_sum = 0.0;
    for slot in slots {
        if slot.growth > 0.0 {
            growth_sum += slot.growth;
        } else {
            used += slot.constraints.clamp(slot.preferred);
        }
    }

    let unallocated = (extent - used).max(0.0);
    let sector = if growth_sum > 0.0 {
        unallocated / growth_sum
    } else {
        0.0
    };

    let sizes: Vec<f32> = slots
        .iter()
        .map(|slot| {
            if slot.growth > 0.0 {
                slot.constraints.clamp(sector * slot.growth)
            } else {
                slot.constraints.clamp(slot.preferred)
            }
        })
        .collect();

    let content: f32 = sizes.iter().sum::<f32>() + total_spacing;
    let leftover = (extent - content).max(0.0);

    // A lone child cannot be spaced apart from anything, so every Space*
    // policy collapses to Center.
    let justify = if slots.len() == 1 {
        match justify {
            Justify::SpaceAround | Justify::SpaceBetween | Justify::SpaceEvenly => Justify::Center,
            other => other,
        }
    } else {
        justify
    };

    let n = slots.len() as f32;
    let (mut cursor, gap) = match justify {
        Justify::Start => (0.0, spacing),
        Justify::Center => (leftover * 0.5, spacing),
        Justify::End => (leftover, spacing),
        Justify::SpaceAround => {
            let q = leftover / n;
            (q * 0.5, q)
        }
        Justify::SpaceBetween => (0.0, leftover / (n - 1.0)),
        Justify::SpaceEvenly => {
            let q = leftover / (n + 1.0);
            (q, q)
        }
    };

    let mut placements = Vec::with_capacity(slots.len());
    for size in sizes {
        placements.push(SlotPlacement {
            offset: cursor,
            size,
        });
        cursor += size + gap;
    }
    placements
}

/// Cross-axis placement of one child within the container extent.
pub(crate) fn place_cross(
    align: CrossAlign,
    container: f32,
    preferred: f32,
    constraints: AxisConstraints,
) -> SlotPlacement {
    let container = container.max(0.0);
    let size = match align {
        CrossAlign::Stretch => constraints.clamp(container),
        _ => constraints.clamp(preferred),
    };
    let offset = match align {
        CrossAlign::Start | CrossAlign::Stretch => 0.0,
        CrossAlign::Center => ((container - size) * 0.5).max(0.0),
        CrossAlign::End => (container - size).max(0.0),
    };
    SlotPlacement { offset, size }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free(preferred: f32, growth: f32) -> LinearSlot {
        LinearSlot {
            preferred,
            constraints: AxisConstraints::FREE,
            growth,
        }
    }

    #[test]
    fn growth_splits_unallocated_space_proportionally() {
        let slots = [free(400.0, 0.0), free(0.0, 1.0), free(0.0, 1.0), free(0.0, 2.0)];
        let placements = solve_main_axis(1000.0, Justify::Start, 0.0, &slots);
        let sizes: Vec<f32> = placements.iter().map(|p| p.size).collect();
        assert_eq!(sizes, vec![400.0, 150.0, 150.0, 300.0]);
        assert_eq!(placements[3].offset, 700.0);
    }

    #[test]
    fn clamped_grower_surplus_is_not_redistributed() {
        let slots = [
            LinearSlot {
                preferred: 0.0,
                constraints: AxisConstraints { min: 0.0, max: 100.0 },
                growth: 1.0,
            },
            free(0.0, 1.0),
        ];
        let placements = solve_main_axis(600.0, Justify::Start, 0.0, &slots);
        assert_eq!(placements[0].size, 100.0);
        assert_eq!(placements[1].size, 300.0);
    }

    #[test]
    fn space_between_spreads_leftover_into_inner_gaps() {
        let slots = [free(100.0, 0.0), free(100.0, 0.0), free(100.0, 0.0)];
        let placements = solve_main_axis(600.0, Justify::SpaceBetween, 0.0, &slots);
        assert_eq!(placements[0].offset, 0.0);
        assert_eq!(placements[1].offset, 250.0);
        assert_eq!(placements[2].offset, 500.0);
    }

    #[test]
    fn space_around_halves_the_edge_gaps() {
        let slots = [free(100.0, 0.0), free(100.0, 0.0)];
        let placements = solve_main_axis(600.0, Justify::SpaceAround, 0.0, &slots);
        assert_eq!(placements[0].offset, 100.0);
        assert_eq!(placements[1].offset, 400.0);
    }

    #[test]
    fn space_evenly_makes_all_gaps_equal() {
        let slots = [free(100.0, 0.0), free(100.0, 0.0)];
        let placements = solve_main_axis(700.0, Justify::SpaceEvenly, 0.0, &slots);
        assert!((placements[0].offset - 500.0 / 3.0).abs() < 1e-3);
        assert!((placements[1].offset - (1000.0 / 3.0 + 100.0)).abs() < 1e-3);
    }

    #[test]
    fn single_child_space_policies_center() {
        let slots = [free(100.0, 0.0)];
        for justify in [Justify::SpaceAround, Justify::SpaceBetween, Justify::SpaceEvenly] {
            let placements = solve_main_axis(500.0, justify, 0.0, &slots);
            assert_eq!(placements[0].offset, 200.0);
        }
    }

    #[test]
    fn fixed_spacing_counts_against_growers() {
        let slots = [free(100.0, 0.0), free(0.0, 1.0)];
        let placements = solve_main_axis(400.0, Justify::Start, 20.0, &slots);
        assert_eq!(placements[1].offset, 120.0);
        assert_eq!(placements[1].size, 280.0);
    }

    #[test]
    fn overflow_anchors_at_start_without_negative_gaps() {
        let slots = [free(400.0, 0.0), free(400.0, 0.0)];
        let placements = solve_main_axis(600.0, Justify::SpaceBetween, 0.0, &slots);
        assert_eq!(placements[0].offset, 0.0);
        assert_eq!(placements[1].offset, 400.0);

        let centered = solve_main_axis(600.0, Justify::Center, 0.0, &slots);
        assert_eq!(centered[0].offset, 0.0);
    }

    #[test]
    fn end_justification_pushes_the_block_to_the_far_edge() {
        let slots = [free(100.0, 0.0), free(100.0, 0.0)];
        let placements = solve_main_axis(500.0, Justify::End, 10.0, &slots);
        assert_eq!(placements[0].offset, 290.0);
        assert_eq!(placements[1].offset, 400.0);
    }

    #[test]
    fn no_children_yields_no_placements() {
        assert!(solve_main_axis(100.0, Justify::Start, 0.0, &[]).is_empty());
    }

    #[test]
    fn stretch_fills_the_cross_extent_up_to_its_limit() {
        let limited = AxisConstraints { min: 0.0, max: 80.0 };
        let placement = place_cross(CrossAlign::Stretch, 200.0, 10.0, limited);
        assert_eq!(placement.size, 80.0);
        assert_eq!(placement.offset, 0.0);

        let full = place_cross(CrossAlign::Stretch, 200.0, 10.0, AxisConstraints::FREE);
        assert_eq!(full.size, 200.0);
    }

    #[test]
    fn cross_center_and_end_anchor_within_the_container() {
        let center = place_cross(CrossAlign::Center, 100.0, 40.0, AxisConstraints::FREE);
        assert_eq!((center.offset, center.size), (30.0, 40.0));
        let end = place_cross(CrossAlign::End, 100.0, 40.0, AxisConstraints::FREE);
        assert_eq!((end.offset, end.size), (60.0, 40.0));
    }
}
