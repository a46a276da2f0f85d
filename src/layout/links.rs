use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::geometry::{Curve, DEFAULT_LABEL_T};
use super::text::measure_lines;
use super::{LabelLayout, LabelOwner, LinkKind, LinkLayout, NodeKey, NodeLayout, Placed};
use crate::config::LayoutConfig;
use crate::ir::{AssemblyData, Fastener, FastenerSpec};
use crate::theme::Theme;

static NONE_SENTINEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(none|n/?a|-+)?\s*$").expect("sentinel pattern"));

/// True for blank or "none"-style torque and thread-locker values.
pub fn is_none_sentinel(value: &str) -> bool {
    NONE_SENTINEL.is_match(value)
}

/// Text content of a fastener label before measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct FastenerAnnotation {
    pub part_number: String,
    pub quantity: u32,
    pub thread_locker: Option<String>,
    pub torque: Option<String>,
    /// Fasteners on the step beyond the primary one.
    pub more: usize,
}

impl FastenerAnnotation {
    pub fn from_step_fasteners(fasteners: &[&Fastener]) -> Option<Self> {
        let primary = fasteners.first()?;
        Some(Self {
            part_number: primary.part_number.clone(),
            quantity: primary.quantity,
            thread_locker: primary.thread_locker.clone(),
            torque: primary.torque.clone(),
            more: fasteners.len() - 1,
        })
    }

    pub fn from_spec(spec: &FastenerSpec) -> Self {
        Self {
            part_number: spec.part_number.clone(),
            quantity: spec.quantity,
            thread_locker: spec.thread_locker.clone(),
            torque: spec.torque.clone(),
            more: 0,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(4);
        if self.quantity > 1 {
            lines.push(format!("{} x{}", self.part_number, self.quantity));
        } else {
            lines.push(self.part_number.clone());
        }
        for value in [&self.thread_locker, &self.torque].into_iter().flatten() {
            if !is_none_sentinel(value) {
                lines.push(value.trim().to_string());
            }
        }
        if self.more > 0 {
            lines.push(format!("+{} more", self.more));
        }
        lines
    }
}

pub(super) fn link_curve(from: &NodeLayout, to: &NodeLayout) -> Curve {
    Curve::new(from.out_anchor(), to.in_anchor())
}

pub(super) fn build_label(
    annotation: &FastenerAnnotation,
    t: f32,
    owner: Option<LabelOwner>,
    curve: &Curve,
    theme: &Theme,
    config: &LayoutConfig,
) -> LabelLayout {
    let block = measure_lines(annotation.lines(), theme, config);
    LabelLayout {
        anchor: curve.point_at(t),
        t,
        width: block.width + config.label_padding_x * 2.0,
        height: block.height + config.label_padding_y * 2.0,
        lines: block.lines,
        owner,
    }
}

/// Re-derives a link's curve and label anchor from the current node table.
/// The label keeps its `t`; only its placement follows the new curve.
/// Returns false when either endpoint is missing.
pub(super) fn refresh_link(link: &mut LinkLayout, nodes: &BTreeMap<NodeKey, NodeLayout>) -> bool {
    let (Some(from), Some(to)) = (nodes.get(&link.from), nodes.get(&link.to)) else {
        return false;
    };
    link.curve = link_curve(from, to);
    if let Some(label) = link.label.as_mut() {
        label.anchor = link.curve.point_at(label.t);
    }
    true
}

fn stored_t(t: Option<f32>) -> f32 {
    t.unwrap_or(DEFAULT_LABEL_T).clamp(0.0, 1.0)
}

/// Every link whose two endpoints are present in `nodes`, in a stable order:
/// step→group, group→root, step→step, part→step.
pub(super) fn derive_links(
    data: &AssemblyData,
    nodes: &BTreeMap<NodeKey, NodeLayout>,
    theme: &Theme,
    config: &LayoutConfig,
) -> Vec<LinkLayout> {
    let mut links = Vec::new();
    let mut push = |kind: LinkKind,
                    id: String,
                    from: NodeKey,
                    to: NodeKey,
                    label: Option<(FastenerAnnotation, f32, LabelOwner)>| {
        let (Some(from_node), Some(to_node)) = (nodes.get(&from), nodes.get(&to)) else {
            return;
        };
        let curve = link_curve(from_node, to_node);
        let label = label.map(|(annotation, t, owner)| {
            build_label(&annotation, t, Some(owner), &curve, theme, config)
        });
        links.push(LinkLayout {
            id,
            kind,
            from,
            to,
            curve,
            label,
        });
    };

    let groups = data.sorted_groups();

    if config.link_mode.hierarchy() {
        for group in &groups {
            for step in data.sorted_steps_in(&group.id) {
                let fasteners = data.sorted_fasteners_of(&step.id);
                let label = FastenerAnnotation::from_step_fasteners(&fasteners).map(|annotation| {
                    let primary = fasteners[0];
                    (
                        annotation,
                        stored_t(primary.label_t),
                        LabelOwner::Fastener(primary.id.clone()),
                    )
                });
                let from = NodeKey::step(&step.id);
                let to = NodeKey::group(&group.id);
                push(LinkKind::StepToGroup, format!("{from}->{to}"), from, to, label);
            }
        }
        for group in &groups {
            let from = NodeKey::group(&group.id);
            push(
                LinkKind::GroupToRoot,
                format!("{from}->root"),
                from,
                NodeKey::Root,
                None,
            );
        }
    }

    if config.link_mode.sequence() {
        for rel in &data.relationships {
            let label = rel.fastener.as_ref().map(|spec| {
                (
                    FastenerAnnotation::from_spec(spec),
                    stored_t(rel.label_t),
                    LabelOwner::Relationship(rel.id.clone()),
                )
            });
            push(
                LinkKind::StepToStep,
                format!("rel:{}", rel.id),
                NodeKey::step(&rel.from_step),
                NodeKey::step(&rel.to_step),
                label,
            );
        }
    }

    if config.show_parts {
        for group in &groups {
            for step in data.sorted_steps_in(&group.id) {
                for part in data.sorted_parts_of(&step.id) {
                    let from = NodeKey::part(&part.id);
                    let to = NodeKey::step(&step.id);
                    push(LinkKind::PartToStep, format!("{from}->{to}"), from, to, None);
                }
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation() -> FastenerAnnotation {
        FastenerAnnotation {
            part_number: "M6x20".to_string(),
            quantity: 4,
            thread_locker: Some("LT-243".to_string()),
            torque: Some("9 Nm".to_string()),
            more: 2,
        }
    }

    #[test]
    fn annotation_lines_in_order() {
        assert_eq!(
            annotation().lines(),
            vec!["M6x20 x4", "LT-243", "9 Nm", "+2 more"]
        );
    }

    #[test]
    fn single_quantity_and_sentinels_are_dropped() {
        let mut a = annotation();
        a.quantity = 1;
        a.thread_locker = Some("None".to_string());
        a.torque = Some(" n/a ".to_string());
        a.more = 0;
        assert_eq!(a.lines(), vec!["M6x20"]);
    }

    #[test]
    fn sentinel_matching() {
        for value in ["", "  ", "none", "NONE", "n/a", "NA", "-", "---"] {
            assert!(is_none_sentinel(value), "{value:?}");
        }
        for value in ["LT-243", "12 Nm", "nonel"] {
            assert!(!is_none_sentinel(value), "{value:?}");
        }
    }

    #[test]
    fn overflow_counts_remaining_fasteners() {
        let make = |id: &str| Fastener {
            id: id.to_string(),
            step_id: "s".to_string(),
            part_number: id.to_string(),
            quantity: 1,
            torque: None,
            thread_locker: None,
            sort_key: 0,
            label_t: None,
        };
        let (a, b, c) = (make("a"), make("b"), make("c"));
        let ann = FastenerAnnotation::from_step_fasteners(&[&a, &b, &c]).unwrap();
        assert_eq!(ann.part_number, "a");
        assert_eq!(ann.more, 2);
        assert!(FastenerAnnotation::from_step_fasteners(&[]).is_none());
    }
}
