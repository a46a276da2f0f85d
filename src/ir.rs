use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::layout::Point;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assembly {
    pub id: String,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub sort_key: i64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    #[default]
    Ordinary,
    Prep,
    Complete,
    Note,
}

/// Pending engineering-change classification of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeMarker {
    Remove,
    Replace,
    Add,
    Modify,
}

impl ChangeMarker {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeMarker::Remove => "remove",
            ChangeMarker::Replace => "replace",
            ChangeMarker::Add => "add",
            ChangeMarker::Modify => "modify",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub group_id: String,
    pub label: String,
    #[serde(default)]
    pub kind: StepKind,
    #[serde(default)]
    pub sort_key: i64,
    /// Persisted coordinates. Present means the step is pinned.
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub sequence_tag: Option<String>,
    #[serde(default)]
    pub change: Option<ChangeMarker>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: String,
    pub step_id: String,
    pub part_number: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub sort_key: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fastener {
    pub id: String,
    pub step_id: String,
    pub part_number: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub torque: Option<String>,
    #[serde(default)]
    pub thread_locker: Option<String>,
    #[serde(default)]
    pub sort_key: i64,
    /// Where the step→group annotation sits along its curve.
    #[serde(default)]
    pub label_t: Option<f32>,
}

/// Fastener metadata carried directly on a step→step relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FastenerSpec {
    pub part_number: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub torque: Option<String>,
    #[serde(default)]
    pub thread_locker: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub from_step: String,
    pub to_step: String,
    #[serde(default)]
    pub fastener: Option<FastenerSpec>,
    #[serde(default)]
    pub label_t: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartInfo {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Everything a layout session needs, as returned by the bulk load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyData {
    pub assembly: Assembly,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub fasteners: Vec<Fastener>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub part_catalog: BTreeMap<String, PartInfo>,
}

fn default_quantity() -> u32 {
    1
}

fn by_sort_key(a: (i64, &str), b: (i64, &str)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1))
}

impl AssemblyData {
    /// Groups in swimlane order.
    pub fn sorted_groups(&self) -> Vec<&Group> {
        let mut groups: Vec<&Group> = self.groups.iter().collect();
        groups.sort_by(|a, b| by_sort_key((a.sort_key, &a.id), (b.sort_key, &b.id)));
        groups
    }

    pub fn sorted_steps_in(&self, group_id: &str) -> Vec<&Step> {
        let mut steps: Vec<&Step> = self
            .steps
            .iter()
            .filter(|step| step.group_id == group_id)
            .collect();
        steps.sort_by(|a, b| by_sort_key((a.sort_key, &a.id), (b.sort_key, &b.id)));
        steps
    }

    pub fn sorted_parts_of(&self, step_id: &str) -> Vec<&Part> {
        let mut parts: Vec<&Part> = self
            .parts
            .iter()
            .filter(|part| part.step_id == step_id)
            .collect();
        parts.sort_by(|a, b| by_sort_key((a.sort_key, &a.id), (b.sort_key, &b.id)));
        parts
    }

    pub fn sorted_fasteners_of(&self, step_id: &str) -> Vec<&Fastener> {
        let mut fasteners: Vec<&Fastener> = self
            .fasteners
            .iter()
            .filter(|fastener| fastener.step_id == step_id)
            .collect();
        fasteners.sort_by(|a, b| by_sort_key((a.sort_key, &a.id), (b.sort_key, &b.id)));
        fasteners
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|step| step.id == id)
    }

    pub fn part_mut(&mut self, id: &str) -> Option<&mut Part> {
        self.parts.iter_mut().find(|part| part.id == id)
    }

    pub fn fastener_mut(&mut self, id: &str) -> Option<&mut Fastener> {
        self.fasteners.iter_mut().find(|fastener| fastener.id == id)
    }

    pub fn relationship_mut(&mut self, id: &str) -> Option<&mut Relationship> {
        self.relationships.iter_mut().find(|rel| rel.id == id)
    }

    pub fn has_relationship(&self, from: &str, to: &str) -> bool {
        self.relationships
            .iter()
            .any(|rel| rel.from_step == from && rel.to_step == to)
    }

    pub fn relationship_ids(&self) -> BTreeSet<String> {
        self.relationships.iter().map(|rel| rel.id.clone()).collect()
    }
}

/// `{prefix}-{from}-{to}`, suffixed with `-2`, `-3`, ... until it is absent
/// from `taken`. Step ids may contain `-`, so two different pairs can share
/// the unsuffixed form.
pub fn relationship_id(prefix: &str, from: &str, to: &str, taken: &BTreeSet<String>) -> String {
    let base = format!("{prefix}-{from}-{to}");
    if !taken.contains(&base) {
        return base;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Synthesizes a linear chain inside each group plus a bridge from each
/// group's last step to the next group's first step. Pairs that already
/// exist as relationships are skipped.
pub fn auto_generate_relationships(data: &AssemblyData) -> Vec<Relationship> {
    let mut seen: BTreeSet<(String, String)> = data
        .relationships
        .iter()
        .map(|rel| (rel.from_step.clone(), rel.to_step.clone()))
        .collect();
    let mut taken = data.relationship_ids();
    let mut out = Vec::new();
    let mut push = |from: &str, to: &str, out: &mut Vec<Relationship>| {
        if !seen.insert((from.to_string(), to.to_string())) {
            return;
        }
        let id = relationship_id("auto", from, to, &taken);
        taken.insert(id.clone());
        out.push(Relationship {
            id,
            from_step: from.to_string(),
            to_step: to.to_string(),
            fastener: None,
            label_t: None,
        });
    };

    let mut previous_tail: Option<String> = None;
    for group in data.sorted_groups() {
        let steps = data.sorted_steps_in(&group.id);
        let Some(first) = steps.first() else {
            continue;
        };
        if let Some(tail) = previous_tail.take() {
            push(&tail, &first.id, &mut out);
        }
        for pair in steps.windows(2) {
            push(&pair[0].id, &pair[1].id, &mut out);
        }
        previous_tail = steps.last().map(|step| step.id.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, group: &str, sort_key: i64) -> Step {
        Step {
            id: id.to_string(),
            group_id: group.to_string(),
            label: id.to_string(),
            kind: StepKind::Ordinary,
            sort_key,
            position: None,
            sequence_tag: None,
            change: None,
        }
    }

    fn group(id: &str, sort_key: i64) -> Group {
        Group {
            id: id.to_string(),
            label: id.to_string(),
            sort_key,
            color: None,
            icon: None,
        }
    }

    #[test]
    fn sort_ties_break_on_identifier() {
        let data = AssemblyData {
            groups: vec![group("b", 1), group("a", 1), group("c", 0)],
            ..Default::default()
        };
        let order: Vec<&str> = data.sorted_groups().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn auto_generate_chains_and_bridges_groups() {
        let data = AssemblyData {
            groups: vec![group("g1", 0), group("g2", 1)],
            steps: vec![
                step("s2", "g1", 2),
                step("s1", "g1", 1),
                step("s3", "g2", 1),
                step("s4", "g2", 2),
            ],
            ..Default::default()
        };
        let rels = auto_generate_relationships(&data);
        let pairs: Vec<(&str, &str)> = rels
            .iter()
            .map(|r| (r.from_step.as_str(), r.to_step.as_str()))
            .collect();
        assert_eq!(pairs, vec![("s1", "s2"), ("s2", "s3"), ("s3", "s4")]);
    }

    #[test]
    fn auto_generate_skips_existing_pairs() {
        let mut data = AssemblyData {
            groups: vec![group("g1", 0)],
            steps: vec![step("a", "g1", 1), step("b", "g1", 2), step("c", "g1", 3)],
            ..Default::default()
        };
        data.relationships.push(Relationship {
            id: "r1".to_string(),
            from_step: "a".to_string(),
            to_step: "b".to_string(),
            fastener: None,
            label_t: None,
        });
        let rels = auto_generate_relationships(&data);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].from_step, "b");
        assert_eq!(rels[0].to_step, "c");
    }

    #[test]
    fn generated_ids_stay_unique_with_hyphenated_steps() {
        let data = AssemblyData {
            groups: vec![group("g1", 0), group("g2", 1)],
            steps: vec![
                step("a-b", "g1", 1),
                step("c", "g1", 2),
                step("a", "g2", 1),
                step("b-c", "g2", 2),
            ],
            ..Default::default()
        };
        let rels = auto_generate_relationships(&data);
        let ids: Vec<&str> = rels.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["auto-a-b-c", "auto-c-a", "auto-a-b-c-2"]);
    }

    #[test]
    fn relationship_id_skips_taken_ids() {
        let taken = BTreeSet::from(["rel-a-b".to_string(), "rel-a-b-2".to_string()]);
        assert_eq!(relationship_id("rel", "a", "b", &taken), "rel-a-b-3");
        assert_eq!(relationship_id("rel", "b", "a", &taken), "rel-b-a");
    }
}
