use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::geometry::{Point, Rect};
use super::links::derive_links;
use super::text::measure_label;
use super::{
    BandLayout, Layout, NodeKey, NodeKind, NodeLayout, NodeShape, Placed, TextBlock,
};
use crate::config::LayoutConfig;
use crate::ir::{AssemblyData, Group, Part, Step, StepKind};
use crate::theme::Theme;

const LEVEL_ROOT: usize = 0;
const LEVEL_GROUP: usize = 1;
const LEVEL_STEP: usize = 2;
const LEVEL_PART: usize = 3;

/// Midpoint of the extreme values, not the mean.
pub(super) fn centroid(values: impl IntoIterator<Item = f32>) -> Option<f32> {
    let mut iter = values.into_iter();
    let first = iter.next()?;
    let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    Some((min + max) / 2.0)
}

pub(super) fn group_column_x(config: &LayoutConfig) -> f32 {
    config.step_column_x + config.group_gap
}

pub(super) fn root_column_x(config: &LayoutConfig) -> f32 {
    group_column_x(config) + config.root_gap
}

/// Offset of a part's center from its step's left-center edge.
pub(super) fn part_offset(rank: usize, count: usize, config: &LayoutConfig) -> Point {
    let middle = (count.saturating_sub(1)) as f32 / 2.0;
    Point::new(
        -(config.part_gap + config.part_width / 2.0),
        (rank as f32 - middle) * config.part_spacing,
    )
}

pub(super) fn place_part(step: &NodeLayout, offset: Point) -> Point {
    let edge = step.in_anchor();
    Point::new(edge.x + offset.x, edge.y + offset.y)
}

/// Assigns every visible entity a position inside stacked swimlane bands.
///
/// Returns `None` when there is nothing to draw: no groups, no steps, or a
/// visibility filter that excludes every group. Pinned step coordinates are
/// used verbatim; everything else is derived from rank and band extent, so
/// two calls with identical inputs produce identical layouts.
pub fn compute_layout(
    data: &AssemblyData,
    visible_groups: Option<&BTreeSet<String>>,
    theme: &Theme,
    config: &LayoutConfig,
) -> Option<Layout> {
    if data.groups.is_empty() || data.steps.is_empty() {
        return None;
    }
    let groups: Vec<&Group> = data
        .sorted_groups()
        .into_iter()
        .filter(|group| visible_groups.is_none_or(|filter| filter.contains(&group.id)))
        .collect();
    if groups.is_empty() {
        return None;
    }

    let mut nodes: BTreeMap<NodeKey, NodeLayout> = BTreeMap::new();
    let mut bands: Vec<BandLayout> = Vec::with_capacity(groups.len());
    let mut group_ys: Vec<f32> = Vec::with_capacity(groups.len());
    let mut cursor = 0.0f32;
    let mut band_bottom = 0.0f32;
    let mut ordinal = 0usize;

    for (band_idx, group) in groups.iter().enumerate() {
        let steps = data.sorted_steps_in(&group.id);
        let max_parts = steps
            .iter()
            .map(|step| data.parts.iter().filter(|p| p.step_id == step.id).count())
            .max()
            .unwrap_or(0);
        let density = max_parts.div_ceil(config.parts_per_row.max(1));
        let rows = steps.len().max(density).max(1);
        let band_y = cursor;
        let band_height = rows as f32 * config.row_spacing + config.band_padding * 2.0;

        let mut step_ys = Vec::with_capacity(steps.len());
        for (rank, step) in steps.iter().enumerate() {
            ordinal += 1;
            let computed = Point::new(
                config.step_column_x,
                band_y + config.band_padding + rank as f32 * config.row_spacing,
            );
            let node = step_node(data, step, ordinal, computed, theme, config);
            step_ys.push(node.y);
            if config.show_parts {
                let parts = data.sorted_parts_of(&step.id);
                for (part_rank, part) in parts.iter().enumerate() {
                    let offset = part_offset(part_rank, parts.len(), config);
                    let part_node = part_node(data, part, &node, offset, theme, config);
                    nodes.insert(part_node.key.clone(), part_node);
                }
            }
            nodes.insert(node.key.clone(), node);
        }

        let group_y = centroid(step_ys).unwrap_or(band_y + band_height / 2.0);
        group_ys.push(group_y);
        let group_node = group_node(group, steps.len(), band_idx, group_y, theme, config);
        nodes.insert(group_node.key.clone(), group_node);

        bands.push(BandLayout {
            group_id: group.id.clone(),
            label: group.label.clone(),
            y: band_y,
            height: band_height,
            fill: theme.band_fill(band_idx),
        });
        band_bottom = band_y + band_height;
        cursor = band_bottom + config.band_gap;
    }

    let root_y = centroid(group_ys).unwrap_or(band_bottom / 2.0);
    let root = root_node(data, groups.len(), root_y, theme, config);
    let root_x = root.x;
    nodes.insert(NodeKey::Root, root);

    let links = derive_links(data, &nodes, theme, config);
    let bounds = Rect::from_corners(
        Point::new(0.0, 0.0),
        Point::new(
            root_x + config.trailing_margin,
            band_bottom + config.trailing_margin,
        ),
    );

    debug!(
        nodes = nodes.len(),
        links = links.len(),
        bands = bands.len(),
        "computed swimlane layout"
    );

    Some(Layout {
        nodes,
        links,
        bands,
        bounds,
        step_column_x: config.step_column_x,
    })
}

fn sized_height(base: f32, label: &TextBlock, config: &LayoutConfig) -> f32 {
    base.max(label.height + config.label_padding_y * 2.0)
}

fn step_node(
    data: &AssemblyData,
    step: &Step,
    ordinal: usize,
    computed: Point,
    theme: &Theme,
    config: &LayoutConfig,
) -> NodeLayout {
    let (position, pinned) = match step.position {
        Some(position) => (position, true),
        None => (computed, false),
    };
    let index_label = step
        .sequence_tag
        .as_deref()
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| ordinal.to_string());
    let label = measure_label(&step.label, theme, config);
    let shape = match step.kind {
        StepKind::Note => NodeShape::Diamond,
        StepKind::Ordinary | StepKind::Prep | StepKind::Complete => NodeShape::RoundedRect,
    };
    NodeLayout {
        key: NodeKey::step(&step.id),
        x: position.x,
        y: position.y,
        width: config.step_width,
        height: sized_height(config.step_height, &label, config),
        label,
        shape,
        fill: theme.level_color(LEVEL_STEP),
        pinned,
        kind: NodeKind::Step {
            step_id: step.id.clone(),
            group_id: step.group_id.clone(),
            step_kind: step.kind,
            index_label,
            change: step.change,
            part_count: data.parts.iter().filter(|p| p.step_id == step.id).count(),
            fastener_count: data.fasteners.iter().filter(|f| f.step_id == step.id).count(),
        },
    }
}

fn part_node(
    data: &AssemblyData,
    part: &Part,
    step: &NodeLayout,
    offset: Point,
    theme: &Theme,
    config: &LayoutConfig,
) -> NodeLayout {
    let text = if part.quantity > 1 {
        format!("{} x{}", part.part_number, part.quantity)
    } else {
        part.part_number.clone()
    };
    let label = measure_label(&text, theme, config);
    let position = place_part(step, offset);
    NodeLayout {
        key: NodeKey::part(&part.id),
        x: position.x,
        y: position.y,
        width: config.part_width,
        height: config.part_height,
        label,
        shape: NodeShape::Stadium,
        fill: theme.level_color(LEVEL_PART),
        pinned: false,
        kind: NodeKind::Part {
            part_id: part.id.clone(),
            step_id: part.step_id.clone(),
            part_number: part.part_number.clone(),
            quantity: part.quantity,
            name: data
                .part_catalog
                .get(&part.part_number)
                .map(|info| info.name.clone()),
            offset,
        },
    }
}

fn group_node(
    group: &Group,
    step_count: usize,
    band: usize,
    y: f32,
    theme: &Theme,
    config: &LayoutConfig,
) -> NodeLayout {
    let label = measure_label(&group.label, theme, config);
    NodeLayout {
        key: NodeKey::group(&group.id),
        x: group_column_x(config),
        y,
        width: config.group_width,
        height: sized_height(config.group_height, &label, config),
        label,
        shape: NodeShape::Hexagon,
        fill: group
            .color
            .clone()
            .unwrap_or_else(|| theme.level_color(LEVEL_GROUP)),
        pinned: false,
        kind: NodeKind::Group {
            group_id: group.id.clone(),
            step_count,
            icon: group.icon.clone(),
            band,
        },
    }
}

fn root_node(
    data: &AssemblyData,
    group_count: usize,
    y: f32,
    theme: &Theme,
    config: &LayoutConfig,
) -> NodeLayout {
    let label = measure_label(&data.assembly.tag, theme, config);
    NodeLayout {
        key: NodeKey::Root,
        x: root_column_x(config),
        y,
        width: config.root_width,
        height: sized_height(config.root_height, &label, config),
        label,
        shape: NodeShape::Octagon,
        fill: theme.level_color(LEVEL_ROOT),
        pinned: false,
        kind: NodeKind::Root {
            tag: data.assembly.tag.clone(),
            group_count,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Assembly, Part};
    use crate::layout::LinkKind;

    fn group(id: &str, sort_key: i64) -> Group {
        Group {
            id: id.to_string(),
            label: format!("Group {id}"),
            sort_key,
            color: None,
            icon: None,
        }
    }

    fn step(id: &str, group: &str, sort_key: i64) -> Step {
        Step {
            id: id.to_string(),
            group_id: group.to_string(),
            label: format!("Step {id}"),
            kind: StepKind::Ordinary,
            sort_key,
            position: None,
            sequence_tag: None,
            change: None,
        }
    }

    fn data() -> AssemblyData {
        AssemblyData {
            assembly: Assembly {
                id: "asm".to_string(),
                tag: "ASM-100".to_string(),
            },
            groups: vec![group("g1", 1)],
            steps: vec![step("s3", "g1", 3), step("s1", "g1", 1), step("s2", "g1", 2)],
            ..Default::default()
        }
    }

    fn layout(data: &AssemblyData) -> Layout {
        compute_layout(data, None, &Theme::classic(), &LayoutConfig::default()).unwrap()
    }

    #[test]
    fn centroid_is_midpoint_of_extremes() {
        assert_eq!(centroid([10.0, 11.0, 40.0]), Some(25.0));
        assert_eq!(centroid([7.0]), Some(7.0));
        assert_eq!(centroid(Vec::<f32>::new()), None);
    }

    #[test]
    fn empty_inputs_yield_no_layout() {
        let mut d = data();
        d.steps.clear();
        assert!(compute_layout(&d, None, &Theme::classic(), &LayoutConfig::default()).is_none());
        let mut d = data();
        d.groups.clear();
        assert!(compute_layout(&d, None, &Theme::classic(), &LayoutConfig::default()).is_none());
        let filter = BTreeSet::from(["missing".to_string()]);
        assert!(
            compute_layout(&data(), Some(&filter), &Theme::classic(), &LayoutConfig::default())
                .is_none()
        );
    }

    #[test]
    fn linear_chain_is_evenly_spaced_in_one_column() {
        let config = LayoutConfig::default();
        let l = layout(&data());
        let s1 = &l.nodes[&NodeKey::step("s1")];
        let s2 = &l.nodes[&NodeKey::step("s2")];
        let s3 = &l.nodes[&NodeKey::step("s3")];
        assert_eq!(s1.x, config.step_column_x);
        assert_eq!(s2.x, s1.x);
        assert_eq!(s3.x, s1.x);
        assert_eq!(s1.y, config.band_padding);
        assert_eq!(s2.y - s1.y, config.row_spacing);
        assert_eq!(s3.y - s2.y, config.row_spacing);
        assert_eq!(l.nodes[&NodeKey::group("g1")].y, s2.y);
        assert_eq!(l.nodes[&NodeKey::Root].y, s2.y);
    }

    #[test]
    fn group_and_root_columns_follow_gaps() {
        let config = LayoutConfig::default();
        let l = layout(&data());
        let g = &l.nodes[&NodeKey::group("g1")];
        let root = &l.nodes[&NodeKey::Root];
        assert_eq!(g.x, config.step_column_x + config.group_gap);
        assert_eq!(root.x, g.x + config.root_gap);
        assert_eq!(l.bounds.width, root.x + config.trailing_margin);
        let band = &l.bands[0];
        assert_eq!(band.height, 3.0 * config.row_spacing + 2.0 * config.band_padding);
        assert_eq!(l.bounds.height, band.height + config.trailing_margin);
    }

    #[test]
    fn pinned_coordinates_win() {
        let mut d = data();
        d.steps[0].position = Some(Point::new(12.0, 900.0));
        let l = layout(&d);
        let s3 = &l.nodes[&NodeKey::step("s3")];
        assert!(s3.pinned);
        assert_eq!((s3.x, s3.y), (12.0, 900.0));
        assert!(!l.nodes[&NodeKey::step("s1")].pinned);
        let s1y = l.nodes[&NodeKey::step("s1")].y;
        assert_eq!(l.nodes[&NodeKey::group("g1")].y, (s1y + 900.0) / 2.0);
    }

    #[test]
    fn part_density_grows_band() {
        let config = LayoutConfig::default();
        let mut d = data();
        for i in 0..9 {
            d.parts.push(Part {
                id: format!("p{i}"),
                step_id: "s1".to_string(),
                part_number: format!("PN-{i}"),
                quantity: 1,
                sort_key: i,
            });
        }
        let l = layout(&d);
        // ceil(9 / 2) = 5 rows beats 3 steps
        assert_eq!(
            l.bands[0].height,
            5.0 * config.row_spacing + 2.0 * config.band_padding
        );
        let s1 = &l.nodes[&NodeKey::step("s1")];
        let p0 = &l.nodes[&NodeKey::part("p0")];
        let p8 = &l.nodes[&NodeKey::part("p8")];
        assert_eq!(p0.x + config.part_width / 2.0 + config.part_gap, s1.x - s1.width / 2.0);
        assert_eq!(p0.y, s1.y - 4.0 * config.part_spacing);
        assert_eq!(p8.y, s1.y + 4.0 * config.part_spacing);
        let part_links = l
            .links
            .iter()
            .filter(|link| link.kind == LinkKind::PartToStep)
            .count();
        assert_eq!(part_links, 9);
    }

    #[test]
    fn empty_group_sits_at_band_center() {
        let mut d = data();
        d.groups.push(group("g0", 0));
        let l = layout(&d);
        let band = &l.bands[0];
        assert_eq!(band.group_id, "g0");
        assert_eq!(l.nodes[&NodeKey::group("g0")].y, band.y + band.height / 2.0);
        assert_eq!(l.bands[1].y, band.height + LayoutConfig::default().band_gap);
    }

    #[test]
    fn sequence_tag_overrides_ordinal() {
        let mut d = data();
        d.steps[1].sequence_tag = Some(" 1A ".to_string());
        let l = layout(&d);
        let index_of = |id: &str| match &l.nodes[&NodeKey::step(id)].kind {
            NodeKind::Step { index_label, .. } => index_label.clone(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(index_of("s1"), "1A");
        assert_eq!(index_of("s2"), "2");
        assert_eq!(index_of("s3"), "3");
    }
}
