//! Pinned entity model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record the user explicitly kept available offline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedEntity {
    /// Caller-supplied identifier, e.g. a job id
    pub entity_id: String,
    /// Last known full representation of the entity
    pub snapshot_data: Option<Value>,
    /// Last pin timestamp (Unix ms); reset on every re-pin
    pub pinned_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl PinnedEntity {
    /// Create a pin stamped with the current time
    #[must_use]
    pub fn new(entity_id: impl Into<String>, snapshot_data: Option<Value>) -> Self {
        let now = crate::util::now_millis();
        Self {
            entity_id: entity_id.into(),
            snapshot_data,
            pinned_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_sets_both_timestamps() {
        let pin = PinnedEntity::new("job-42", Some(json!({"title": "X"})));
        assert_eq!(pin.entity_id, "job-42");
        assert_eq!(pin.pinned_at, pin.updated_at);
    }
}
