use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::geometry::{Point, clamp_label_t};
use super::index::{LinkIndex, MemberIndex};
use super::links::refresh_link;
use super::swimlane::{centroid, compute_layout, place_part};
use super::viewport::{FitTransform, compute_fit_transform};
use super::{LabelOwner, Layout, LinkLayout, NodeKey, NodeKind, NodeLayout};
use crate::config::LayoutConfig;
use crate::edit::Edit;
use crate::ir::{
    AssemblyData, FastenerSpec, Relationship, auto_generate_relationships, relationship_id,
};
use crate::store::{AssemblyStore, StoreError};
use crate::theme::Theme;

/// Geometry that changed during one drag step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DragUpdate {
    pub nodes: Vec<NodeLayout>,
    pub links: Vec<LinkLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelMove {
    pub link_id: String,
    pub owner: Option<LabelOwner>,
    pub t: f32,
    pub anchor: Point,
}

impl LabelMove {
    /// The field update that persists this move.
    pub fn to_edit(&self) -> Option<Edit> {
        self.owner.clone().map(|owner| Edit::LabelPosition { owner, t: self.t })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub attempted: usize,
    pub saved: usize,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool {
        self.saved == self.attempted
    }
}

/// Owns the entity graph and its materialized layout for one editing
/// session. Full layouts rebuild everything; drags patch the node table in
/// place.
#[derive(Debug, Clone)]
pub struct LayoutSession {
    data: AssemblyData,
    theme: Theme,
    config: LayoutConfig,
    filter: Option<BTreeSet<String>>,
    layout: Option<Layout>,
    links: LinkIndex,
    members: MemberIndex,
    pending: BTreeMap<String, Point>,
    dirty: bool,
}

impl LayoutSession {
    pub fn new(data: AssemblyData, theme: Theme, config: LayoutConfig) -> Self {
        let mut session = Self {
            data,
            theme,
            config,
            filter: None,
            layout: None,
            links: LinkIndex::default(),
            members: MemberIndex::default(),
            pending: BTreeMap::new(),
            dirty: false,
        };
        session.relayout();
        session
    }

    pub fn from_store(
        store: &impl AssemblyStore,
        theme: Theme,
        config: LayoutConfig,
    ) -> Result<Self, StoreError> {
        Ok(Self::new(store.load()?, theme, config))
    }

    /// Replaces the entity graph with a fresh load. Unsaved positions are dropped.
    pub fn reload(&mut self, store: &impl AssemblyStore) -> Result<(), StoreError> {
        self.data = store.load()?;
        self.pending.clear();
        self.dirty = false;
        self.relayout();
        Ok(())
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn data(&self) -> &AssemblyData {
        &self.data
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn link_index(&self) -> &LinkIndex {
        &self.links
    }

    /// Set whenever a pinned coordinate changes; cleared only by a complete save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn pending_positions(&self) -> &BTreeMap<String, Point> {
        &self.pending
    }

    pub fn group_filter(&self) -> Option<&BTreeSet<String>> {
        self.filter.as_ref()
    }

    pub fn set_group_filter(&mut self, filter: Option<BTreeSet<String>>) {
        self.filter = filter;
        self.relayout();
    }

    pub fn set_config(&mut self, config: LayoutConfig) {
        self.config = config;
        self.relayout();
    }

    /// Full re-derivation from the entity graph.
    pub fn relayout(&mut self) {
        self.layout = compute_layout(&self.data, self.filter.as_ref(), &self.theme, &self.config);
        match &self.layout {
            Some(layout) => {
                self.links = LinkIndex::build(&layout.links);
                self.members = MemberIndex::build(&layout.nodes);
            }
            None => {
                self.links = LinkIndex::default();
                self.members = MemberIndex::default();
            }
        }
    }

    /// Moves a step vertically and patches everything that depends on it:
    /// its group's centroid, the root's centroid, the step's parts, and every
    /// link touching any of those. The step stays locked to its column.
    ///
    /// Returns `None` when the step is not in the current layout.
    pub fn drag_step(&mut self, step_id: &str, y: f32) -> Option<DragUpdate> {
        let layout = self.layout.as_mut()?;
        let Layout {
            nodes,
            links,
            step_column_x,
            ..
        } = layout;

        let step_key = NodeKey::step(step_id);
        let step = nodes.get_mut(&step_key)?;
        let NodeKind::Step { group_id, .. } = &step.kind else {
            return None;
        };
        let group_id = group_id.clone();
        step.x = *step_column_x;
        step.y = y;
        step.pinned = true;

        let position = Point::new(*step_column_x, y);
        if let Some(step) = self.data.step_mut(step_id) {
            step.position = Some(position);
        }
        self.pending.insert(step_id.to_string(), position);
        self.dirty = true;

        let mut changed = vec![step_key.clone()];

        let group_key = NodeKey::group(&group_id);
        let group_y = centroid(
            self.members
                .steps_in(&group_id)
                .iter()
                .filter_map(|key| nodes.get(key))
                .map(|node| node.y),
        );
        if let (Some(group_y), Some(group)) = (group_y, nodes.get_mut(&group_key)) {
            group.y = group_y;
            changed.push(group_key);
        }

        let root_y = centroid(
            self.members
                .groups()
                .iter()
                .filter_map(|key| nodes.get(key))
                .map(|node| node.y),
        );
        if let (Some(root_y), Some(root)) = (root_y, nodes.get_mut(&NodeKey::Root)) {
            root.y = root_y;
            changed.push(NodeKey::Root);
        }

        if let Some(step) = nodes.get(&step_key).cloned() {
            for part_key in self.members.parts_of(step_id) {
                let Some(part) = nodes.get_mut(part_key) else {
                    continue;
                };
                let NodeKind::Part { offset, .. } = part.kind else {
                    continue;
                };
                let placed = place_part(&step, offset);
                part.x = placed.x;
                part.y = placed.y;
                changed.push(part_key.clone());
            }
        }

        let affected = self.links.links_touching(changed.iter());
        for &idx in &affected {
            refresh_link(&mut links[idx], nodes);
        }

        debug!(
            step = step_id,
            y,
            nodes = changed.len(),
            links = affected.len(),
            "propagated step drag"
        );

        Some(DragUpdate {
            nodes: changed
                .iter()
                .filter_map(|key| nodes.get(key).cloned())
                .collect(),
            links: affected.iter().map(|&idx| links[idx].clone()).collect(),
        })
    }

    /// Re-anchors a link's fastener label at the curve point nearest to
    /// `cursor`, clamped away from both endpoints.
    pub fn drag_label(&mut self, link_id: &str, cursor: Point) -> Option<LabelMove> {
        let layout = self.layout.as_mut()?;
        let link = layout.links.iter_mut().find(|link| link.id == link_id)?;
        let label = link.label.as_mut()?;
        let t = clamp_label_t(link.curve.nearest_t(cursor));
        label.t = t;
        label.anchor = link.curve.point_at(t);

        match &label.owner {
            Some(LabelOwner::Fastener(id)) => {
                if let Some(fastener) = self.data.fastener_mut(id) {
                    fastener.label_t = Some(t);
                }
            }
            Some(LabelOwner::Relationship(id)) => {
                if let Some(rel) = self.data.relationship_mut(id) {
                    rel.label_t = Some(t);
                }
            }
            None => {}
        }
        debug!(link = link_id, t, "moved link label");

        Some(LabelMove {
            link_id: link_id.to_string(),
            owner: label.owner.clone(),
            t,
            anchor: label.anchor,
        })
    }

    /// Framing for the current node table; identity when nothing is laid out.
    pub fn fit_transform(&self, viewport_width: f32, viewport_height: f32) -> FitTransform {
        let bounds = self
            .layout
            .as_ref()
            .and_then(|layout| layout.node_bounds())
            .unwrap_or_default();
        compute_fit_transform(bounds, viewport_width, viewport_height)
    }

    /// Applies an edit in memory and re-derives the layout.
    pub fn apply_edit(&mut self, edit: &Edit) -> Result<(), StoreError> {
        edit.apply(&mut self.data)?;
        debug!(?edit, "applied edit");
        self.relayout();
        Ok(())
    }

    /// Applies an edit optimistically, then forwards it to the store.
    pub fn commit_edit(
        &mut self,
        edit: &Edit,
        store: &mut impl AssemblyStore,
    ) -> Result<(), StoreError> {
        self.apply_edit(edit)?;
        store.update_field(edit).inspect_err(|err| {
            warn!(?edit, error = %err, "edit was not persisted");
        })
    }

    pub fn add_relationship(
        &mut self,
        from_step: &str,
        to_step: &str,
        fastener: Option<FastenerSpec>,
        store: &mut impl AssemblyStore,
    ) -> Result<Relationship, StoreError> {
        if from_step == to_step {
            return Err(StoreError::Invalid(format!("step {from_step} cannot link to itself")));
        }
        for id in [from_step, to_step] {
            if self.data.step(id).is_none() {
                return Err(StoreError::NotFound {
                    entity: "step",
                    id: id.to_string(),
                });
            }
        }
        if self.data.has_relationship(from_step, to_step) {
            return Err(StoreError::Invalid(format!(
                "{from_step} -> {to_step} already exists"
            )));
        }
        let relationship = Relationship {
            id: relationship_id("rel", from_step, to_step, &self.data.relationship_ids()),
            from_step: from_step.to_string(),
            to_step: to_step.to_string(),
            fastener,
            label_t: None,
        };
        // Memory only follows a store that accepted the row.
        store.create_relationship(&relationship)?;
        self.data.relationships.push(relationship.clone());
        self.relayout();
        Ok(relationship)
    }

    pub fn remove_relationship(
        &mut self,
        id: &str,
        store: &mut impl AssemblyStore,
    ) -> Result<(), StoreError> {
        let Some(idx) = self.data.relationships.iter().position(|rel| rel.id == id) else {
            return Err(StoreError::NotFound {
                entity: "relationship",
                id: id.to_string(),
            });
        };
        store.delete_relationship(id)?;
        self.data.relationships.remove(idx);
        self.relayout();
        Ok(())
    }

    /// Synthesizes the default chain when the assembly has no relationships
    /// yet. Returns how many the store accepted.
    pub fn auto_link(&mut self, store: &mut impl AssemblyStore) -> usize {
        if !self.data.relationships.is_empty() {
            return 0;
        }
        let generated = auto_generate_relationships(&self.data);
        let mut created = 0usize;
        for relationship in generated {
            match store.create_relationship(&relationship) {
                Ok(()) => {
                    self.data.relationships.push(relationship);
                    created += 1;
                }
                Err(err) => warn!(id = %relationship.id, error = %err, "auto-link create failed"),
            }
        }
        self.relayout();
        info!(created, "generated default relationships");
        created
    }

    /// Persists every pending step position. The dirty flag survives any
    /// failed row.
    pub fn save_positions(
        &mut self,
        store: &mut impl AssemblyStore,
    ) -> Result<SaveReport, StoreError> {
        let attempted = self.pending.len();
        let saved = store.save_positions(&self.pending)?;
        let report = SaveReport { attempted, saved };
        if report.is_complete() {
            self.pending.clear();
            self.dirty = false;
            info!(saved, "saved step positions");
        } else {
            warn!(saved, attempted, "some step positions were not saved");
        }
        Ok(report)
    }
}
