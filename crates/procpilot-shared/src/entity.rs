//! Typed entities extracted from raw input.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Process,
    Metric,
    Threshold,
    Action,
    Status,
}

/// A keyword or span found in the input. Transient, one set per turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub value: String,
    pub confidence: f32,
    /// Byte span `[start, end)` in the original input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<(usize, usize)>,
}

impl ExtractedEntity {
    pub fn new(entity_type: EntityType, value: impl Into<String>, confidence: f32) -> Self {
        Self {
            entity_type,
            value: value.into(),
            confidence,
            position: None,
        }
    }

    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    pub fn is(&self, entity_type: EntityType) -> bool {
        self.entity_type == entity_type
    }
}
