use crate::layout::{FitTransform, Layout, LinkIndex, NodeKey, Rect};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub step_column_x: f32,
    pub fit: FitTransform,
    pub nodes: Vec<NodeDump>,
    pub links: Vec<LinkDump>,
    pub bands: Vec<BandDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub kind: &'static str,
    pub shape: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub pinned: bool,
    pub label_lines: Vec<String>,
    /// Nodes with a link into this one.
    pub incoming: Vec<String>,
    /// Nodes this one links out to.
    pub outgoing: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDump {
    pub id: String,
    pub from: String,
    pub to: String,
    pub points: Vec<[f32; 2]>,
    pub label_t: Option<f32>,
    pub label_anchor: Option<[f32; 2]>,
    pub label_lines: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandDump {
    pub group_id: String,
    pub label: String,
    pub y: f32,
    pub height: f32,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout, fit: FitTransform) -> Self {
        let index = LinkIndex::build(&layout.links);
        let keys = |list: &[NodeKey]| list.iter().map(ToString::to_string).collect::<Vec<_>>();
        let nodes = layout
            .nodes
            .values()
            .map(|node| NodeDump {
                id: node.key.to_string(),
                kind: match node.key {
                    NodeKey::Root => "root",
                    NodeKey::Group(_) => "group",
                    NodeKey::Step(_) => "step",
                    NodeKey::Part(_) => "part",
                },
                shape: format!("{:?}", node.shape),
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                pinned: node.pinned,
                label_lines: node.label.lines.clone(),
                incoming: keys(index.children(&node.key)),
                outgoing: keys(index.parents(&node.key)),
            })
            .collect();

        let links = layout
            .links
            .iter()
            .map(|link| LinkDump {
                id: link.id.clone(),
                from: link.from.to_string(),
                to: link.to.to_string(),
                points: link
                    .curve
                    .control_points()
                    .iter()
                    .map(|p| [p.x, p.y])
                    .collect(),
                label_t: link.label.as_ref().map(|label| label.t),
                label_anchor: link
                    .label
                    .as_ref()
                    .map(|label| [label.anchor.x, label.anchor.y]),
                label_lines: link
                    .label
                    .as_ref()
                    .map(|label| label.lines.clone())
                    .unwrap_or_default(),
            })
            .collect();

        let bands = layout
            .bands
            .iter()
            .map(|band| BandDump {
                group_id: band.group_id.clone(),
                label: band.label.clone(),
                y: band.y,
                height: band.height,
            })
            .collect();

        let Rect { width, height, .. } = layout.bounds;
        LayoutDump {
            width,
            height,
            step_column_x: layout.step_column_x,
            fit,
            nodes,
            links,
            bands,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout, fit: FitTransform) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout, fit);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{AssemblyData, Group, Step};
    use crate::layout::compute_layout;
    use crate::theme::Theme;

    #[test]
    fn dump_lists_every_node_and_link() {
        let data = AssemblyData {
            groups: vec![Group {
                id: "g".to_string(),
                label: "Frame".to_string(),
                sort_key: 0,
                color: None,
                icon: None,
            }],
            steps: vec![Step {
                id: "s".to_string(),
                group_id: "g".to_string(),
                label: "Bolt rail".to_string(),
                kind: Default::default(),
                sort_key: 0,
                position: None,
                sequence_tag: None,
                change: None,
            }],
            ..Default::default()
        };
        let layout =
            compute_layout(&data, None, &Theme::classic(), &LayoutConfig::default()).unwrap();
        let dump = LayoutDump::from_layout(&layout, FitTransform::IDENTITY);
        assert_eq!(dump.nodes.len(), 3);
        assert_eq!(dump.links.len(), 2);
        assert_eq!(dump.bands.len(), 1);
        let step = dump.nodes.iter().find(|n| n.id == "step:s").unwrap();
        assert_eq!(step.kind, "step");
        assert_eq!(step.x, LayoutConfig::default().step_column_x);
        assert_eq!(step.outgoing, vec!["group:g"]);
        assert!(step.incoming.is_empty());
        let group = dump.nodes.iter().find(|n| n.id == "group:g").unwrap();
        assert_eq!(group.incoming, vec!["step:s"]);
        assert_eq!(group.outgoing, vec!["root"]);

        let json = serde_json::to_value(&dump).unwrap();
        assert!(json["stepColumnX"].is_number());
        assert_eq!(json["fit"]["scale"], 1.0);
    }
}
