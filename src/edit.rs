use serde::{Deserialize, Serialize};

use crate::ir::{AssemblyData, ChangeMarker};
use crate::layout::{LabelOwner, clamp_label_t};
use crate::store::StoreError;

/// A single-field change to a part, fastener, step or label position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "camelCase")]
pub enum Edit {
    #[serde(rename_all = "camelCase")]
    PartNumber { part_id: String, value: String },
    #[serde(rename_all = "camelCase")]
    PartQuantity { part_id: String, quantity: u32 },
    #[serde(rename_all = "camelCase")]
    FastenerPartNumber { fastener_id: String, value: String },
    #[serde(rename_all = "camelCase")]
    FastenerQuantity { fastener_id: String, quantity: u32 },
    #[serde(rename_all = "camelCase")]
    FastenerTorque { fastener_id: String, value: Option<String> },
    #[serde(rename_all = "camelCase")]
    FastenerThreadLocker { fastener_id: String, value: Option<String> },
    LabelPosition { owner: LabelOwner, t: f32 },
    #[serde(rename_all = "camelCase")]
    SequenceTag { step_id: String, value: Option<String> },
    #[serde(rename_all = "camelCase")]
    ChangeMarker {
        step_id: String,
        value: Option<ChangeMarker>,
    },
}

fn not_found(entity: &'static str, id: &str) -> StoreError {
    StoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}

impl Edit {
    /// Writes the edit into `data`. Label positions are clamped away from
    /// the curve endpoints; blank sequence tags clear the override.
    pub fn apply(&self, data: &mut AssemblyData) -> Result<(), StoreError> {
        match self {
            Edit::PartNumber { part_id, value } => {
                let part = data.part_mut(part_id).ok_or_else(|| not_found("part", part_id))?;
                part.part_number = value.trim().to_string();
            }
            Edit::PartQuantity { part_id, quantity } => {
                if *quantity == 0 {
                    return Err(StoreError::Invalid("quantity must be at least 1".to_string()));
                }
                let part = data.part_mut(part_id).ok_or_else(|| not_found("part", part_id))?;
                part.quantity = *quantity;
            }
            Edit::FastenerPartNumber { fastener_id, value } => {
                let fastener = data
                    .fastener_mut(fastener_id)
                    .ok_or_else(|| not_found("fastener", fastener_id))?;
                fastener.part_number = value.trim().to_string();
            }
            Edit::FastenerQuantity {
                fastener_id,
                quantity,
            } => {
                if *quantity == 0 {
                    return Err(StoreError::Invalid("quantity must be at least 1".to_string()));
                }
                let fastener = data
                    .fastener_mut(fastener_id)
                    .ok_or_else(|| not_found("fastener", fastener_id))?;
                fastener.quantity = *quantity;
            }
            Edit::FastenerTorque { fastener_id, value } => {
                let fastener = data
                    .fastener_mut(fastener_id)
                    .ok_or_else(|| not_found("fastener", fastener_id))?;
                fastener.torque = value.clone();
            }
            Edit::FastenerThreadLocker { fastener_id, value } => {
                let fastener = data
                    .fastener_mut(fastener_id)
                    .ok_or_else(|| not_found("fastener", fastener_id))?;
                fastener.thread_locker = value.clone();
            }
            Edit::LabelPosition { owner, t } => {
                let t = clamp_label_t(*t);
                match owner {
                    LabelOwner::Fastener(id) => {
                        data.fastener_mut(id)
                            .ok_or_else(|| not_found("fastener", id))?
                            .label_t = Some(t);
                    }
                    LabelOwner::Relationship(id) => {
                        data.relationship_mut(id)
                            .ok_or_else(|| not_found("relationship", id))?
                            .label_t = Some(t);
                    }
                }
            }
            Edit::SequenceTag { step_id, value } => {
                let step = data.step_mut(step_id).ok_or_else(|| not_found("step", step_id))?;
                step.sequence_tag = value
                    .as_deref()
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string);
            }
            Edit::ChangeMarker { step_id, value } => {
                let step = data.step_mut(step_id).ok_or_else(|| not_found("step", step_id))?;
                step.change = *value;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Fastener, Step, StepKind};

    fn data() -> AssemblyData {
        AssemblyData {
            steps: vec![Step {
                id: "s1".to_string(),
                group_id: "g1".to_string(),
                label: "Mount".to_string(),
                kind: StepKind::Ordinary,
                sort_key: 0,
                position: None,
                sequence_tag: None,
                change: None,
            }],
            fasteners: vec![Fastener {
                id: "f1".to_string(),
                step_id: "s1".to_string(),
                part_number: "M5".to_string(),
                quantity: 2,
                torque: None,
                thread_locker: None,
                sort_key: 0,
                label_t: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn label_position_is_clamped() {
        let mut d = data();
        Edit::LabelPosition {
            owner: LabelOwner::Fastener("f1".to_string()),
            t: 0.99,
        }
        .apply(&mut d)
        .unwrap();
        assert_eq!(d.fasteners[0].label_t, Some(0.95));
    }

    #[test]
    fn blank_sequence_tag_clears_override() {
        let mut d = data();
        d.steps[0].sequence_tag = Some("4B".to_string());
        Edit::SequenceTag {
            step_id: "s1".to_string(),
            value: Some("   ".to_string()),
        }
        .apply(&mut d)
        .unwrap();
        assert_eq!(d.steps[0].sequence_tag, None);
    }

    #[test]
    fn missing_targets_report_not_found() {
        let mut d = data();
        let err = Edit::PartNumber {
            part_id: "nope".to_string(),
            value: "X".to_string(),
        }
        .apply(&mut d)
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "part", .. }));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut d = data();
        let err = Edit::FastenerQuantity {
            fastener_id: "f1".to_string(),
            quantity: 0,
        }
        .apply(&mut d)
        .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert_eq!(d.fasteners[0].quantity, 2);
    }

    #[test]
    fn edits_deserialize_from_tagged_json() {
        let edit: Edit = serde_json::from_str(
            r#"{"field":"changeMarker","stepId":"s1","value":"replace"}"#,
        )
        .unwrap();
        let mut d = data();
        edit.apply(&mut d).unwrap();
        assert_eq!(d.steps[0].change, Some(ChangeMarker::Replace));
    }
}
