use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use super::geometry::{Curve, Point, Rect};
use crate::ir::{ChangeMarker, StepKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

/// Identifier of a node in the layout table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKey {
    Root,
    Group(String),
    Step(String),
    Part(String),
}

impl NodeKey {
    pub fn group(id: &str) -> Self {
        NodeKey::Group(id.to_string())
    }

    pub fn step(id: &str) -> Self {
        NodeKey::Step(id.to_string())
    }

    pub fn part(id: &str) -> Self {
        NodeKey::Part(id.to_string())
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Root => write!(f, "root"),
            NodeKey::Group(id) => write!(f, "group:{id}"),
            NodeKey::Step(id) => write!(f, "step:{id}"),
            NodeKey::Part(id) => write!(f, "part:{id}"),
        }
    }
}

impl Serialize for NodeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeShape {
    Stadium,
    Hexagon,
    Octagon,
    Diamond,
    RoundedRect,
}

/// Anything with a center position and a size.
pub trait Placed {
    fn center(&self) -> Point;
    fn size(&self) -> (f32, f32);

    fn bounds(&self) -> Rect {
        let c = self.center();
        let (w, h) = self.size();
        Rect {
            x: c.x - w / 2.0,
            y: c.y - h / 2.0,
            width: w,
            height: h,
        }
    }

    /// Right-center edge; where outgoing links start.
    fn out_anchor(&self) -> Point {
        let c = self.center();
        Point::new(c.x + self.size().0 / 2.0, c.y)
    }

    /// Left-center edge; where incoming links end.
    fn in_anchor(&self) -> Point {
        let c = self.center();
        Point::new(c.x - self.size().0 / 2.0, c.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    #[serde(rename_all = "camelCase")]
    Root {
        tag: String,
        group_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    Group {
        group_id: String,
        step_count: usize,
        icon: Option<String>,
        band: usize,
    },
    #[serde(rename_all = "camelCase")]
    Step {
        step_id: String,
        group_id: String,
        step_kind: StepKind,
        index_label: String,
        change: Option<ChangeMarker>,
        part_count: usize,
        fastener_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    Part {
        part_id: String,
        step_id: String,
        part_number: String,
        quantity: u32,
        name: Option<String>,
        /// Offset of the part's center from its step's left-center edge.
        offset: Point,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLayout {
    pub key: NodeKey,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: TextBlock,
    pub shape: NodeShape,
    pub fill: String,
    pub pinned: bool,
    pub kind: NodeKind,
}

impl Placed for NodeLayout {
    fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkKind {
    StepToGroup,
    GroupToRoot,
    StepToStep,
    PartToStep,
}

/// Record the persisted label position belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum LabelOwner {
    Fastener(String),
    Relationship(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelLayout {
    pub lines: Vec<String>,
    pub t: f32,
    pub anchor: Point,
    pub width: f32,
    pub height: f32,
    pub owner: Option<LabelOwner>,
}

impl Placed for LabelLayout {
    fn center(&self) -> Point {
        self.anchor
    }

    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkLayout {
    pub id: String,
    pub kind: LinkKind,
    pub from: NodeKey,
    pub to: NodeKey,
    pub curve: Curve,
    pub label: Option<LabelLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandLayout {
    pub group_id: String,
    pub label: String,
    pub y: f32,
    pub height: f32,
    pub fill: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub nodes: BTreeMap<NodeKey, NodeLayout>,
    pub links: Vec<LinkLayout>,
    pub bands: Vec<BandLayout>,
    pub bounds: Rect,
    pub step_column_x: f32,
}

impl Layout {
    /// Union of every node's box; `None` for an empty table.
    pub fn node_bounds(&self) -> Option<Rect> {
        self.nodes
            .values()
            .map(|node| node.bounds())
            .reduce(|acc, rect| acc.union(&rect))
    }

    pub fn link(&self, id: &str) -> Option<&LinkLayout> {
        self.links.iter().find(|link| link.id == id)
    }
}
