use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::edit::Edit;
use crate::ir::{AssemblyData, Relationship};
use crate::layout::Point;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse assembly snapshot: {0}")]
    Parse(#[from] json5::Error),

    #[error("failed to serialize assembly snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid request: {0}")]
    Invalid(String),
}

/// The persistence collaborator. Every operation succeeds or fails on its
/// own; nothing here retries.
pub trait AssemblyStore {
    fn load(&self) -> Result<AssemblyData, StoreError>;

    /// Writes step positions and returns how many rows were written.
    /// Unknown steps count as failed rows rather than an error.
    fn save_positions(&mut self, positions: &BTreeMap<String, Point>) -> Result<usize, StoreError>;

    fn update_field(&mut self, edit: &Edit) -> Result<(), StoreError>;

    fn create_relationship(&mut self, relationship: &Relationship) -> Result<(), StoreError>;

    fn delete_relationship(&mut self, id: &str) -> Result<(), StoreError>;
}

/// Snapshot store backed by a JSON file (read leniently as JSON5), or kept
/// purely in memory when no path is given.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: Option<PathBuf>,
    data: AssemblyData,
}

impl JsonStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        let data = parse_snapshot(&contents)?;
        debug!(path = %path.display(), steps = data.steps.len(), "loaded assembly snapshot");
        Ok(Self {
            path: Some(path.to_path_buf()),
            data,
        })
    }

    pub fn in_memory(data: AssemblyData) -> Self {
        Self { path: None, data }
    }

    pub fn data(&self) -> &AssemblyData {
        &self.data
    }

    fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

pub fn parse_snapshot(contents: &str) -> Result<AssemblyData, StoreError> {
    Ok(json5::from_str(contents)?)
}

impl AssemblyStore for JsonStore {
    fn load(&self) -> Result<AssemblyData, StoreError> {
        Ok(self.data.clone())
    }

    fn save_positions(&mut self, positions: &BTreeMap<String, Point>) -> Result<usize, StoreError> {
        let mut saved = 0usize;
        for (step_id, position) in positions {
            match self.data.step_mut(step_id) {
                Some(step) => {
                    step.position = Some(*position);
                    saved += 1;
                }
                None => warn!(step = %step_id, "position save skipped unknown step"),
            }
        }
        self.flush()?;
        Ok(saved)
    }

    fn update_field(&mut self, edit: &Edit) -> Result<(), StoreError> {
        edit.apply(&mut self.data)?;
        self.flush()
    }

    fn create_relationship(&mut self, relationship: &Relationship) -> Result<(), StoreError> {
        if self.data.relationships.iter().any(|rel| rel.id == relationship.id) {
            return Err(StoreError::Invalid(format!(
                "relationship {} already exists",
                relationship.id
            )));
        }
        self.data.relationships.push(relationship.clone());
        self.flush()
    }

    fn delete_relationship(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.data.relationships.len();
        self.data.relationships.retain(|rel| rel.id != id);
        if self.data.relationships.len() == before {
            return Err(StoreError::NotFound {
                entity: "relationship",
                id: id.to_string(),
            });
        }
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        // comments are fine
        assembly: { id: "a1", tag: "ASM-1" },
        groups: [{ id: "g1", label: "Frame", sortKey: 1 }],
        steps: [
            { id: "s1", groupId: "g1", label: "Base", sortKey: 1 },
            { id: "s2", groupId: "g1", label: "Rail", sortKey: 2, position: { x: 10, y: 20 } },
        ],
    }"#;

    #[test]
    fn parses_lenient_snapshot() {
        let data = parse_snapshot(SNAPSHOT).unwrap();
        assert_eq!(data.assembly.tag, "ASM-1");
        assert_eq!(data.steps.len(), 2);
        assert_eq!(data.steps[1].position, Some(Point::new(10.0, 20.0)));
        assert!(data.relationships.is_empty());
    }

    #[test]
    fn partial_position_save_counts_rows() {
        let mut store = JsonStore::in_memory(parse_snapshot(SNAPSHOT).unwrap());
        let positions = BTreeMap::from([
            ("s1".to_string(), Point::new(1.0, 2.0)),
            ("ghost".to_string(), Point::new(3.0, 4.0)),
        ]);
        assert_eq!(store.save_positions(&positions).unwrap(), 1);
        assert_eq!(store.data().steps[0].position, Some(Point::new(1.0, 2.0)));
    }

    #[test]
    fn relationship_create_and_delete() {
        let mut store = JsonStore::in_memory(parse_snapshot(SNAPSHOT).unwrap());
        let rel = Relationship {
            id: "r1".to_string(),
            from_step: "s1".to_string(),
            to_step: "s2".to_string(),
            fastener: None,
            label_t: None,
        };
        store.create_relationship(&rel).unwrap();
        assert!(matches!(
            store.create_relationship(&rel),
            Err(StoreError::Invalid(_))
        ));
        store.delete_relationship("r1").unwrap();
        assert!(matches!(
            store.delete_relationship("r1"),
            Err(StoreError::NotFound { .. })
        ));
    }
}
