use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SyncError;
use crate::model::{Element, OfferGroup, Space, TaskGroup, lenient};
use crate::store::State;

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// The whole entity graph as exchanged with the persistence collaborator.
///
/// Every field is optional on the way in. Missing sections, `null` arrays
/// and entries that do not decode are replaced by defaults; the store then
/// backfills the per-entity invariants when the snapshot is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default = "empty_object", deserialize_with = "lenient::object")]
    pub general_info: Value,
    #[serde(default = "empty_object", deserialize_with = "lenient::object")]
    pub cash_info: Value,
    #[serde(default = "empty_object", deserialize_with = "lenient::object")]
    pub mjop: Value,
    #[serde(default, deserialize_with = "lenient::list")]
    pub global_elements: Vec<Element>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub global_spaces: Vec<Space>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub global_documents: Vec<Value>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub offer_groups: Vec<OfferGroup>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub task_groups: Vec<TaskGroup>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            general_info: empty_object(),
            cash_info: empty_object(),
            mjop: empty_object(),
            global_elements: Vec::new(),
            global_spaces: Vec::new(),
            global_documents: Vec::new(),
            offer_groups: Vec::new(),
            task_groups: Vec::new(),
        }
    }
}

impl From<&State> for Snapshot {
    fn from(state: &State) -> Self {
        Self {
            general_info: state.general_info.clone(),
            cash_info: state.cash_info.clone(),
            mjop: state.mjop.clone(),
            global_elements: state.elements.clone(),
            global_spaces: state.spaces.clone(),
            global_documents: state.documents.clone(),
            offer_groups: state.offer_groups.clone(),
            task_groups: state.task_groups.clone(),
        }
    }
}

impl Snapshot {
    pub fn from_json(raw: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build a repaired store state from this snapshot.
    pub fn into_state(self) -> State {
        let mut state = State::default();
        state.general_info = self.general_info;
        state.cash_info = self.cash_info;
        state.mjop = self.mjop;
        state.elements = self.global_elements;
        state.spaces = self.global_spaces;
        state.documents = self.global_documents;
        state.task_groups = self.task_groups;
        state.offer_groups = self.offer_groups;
        state.finish()
    }

    /// Number of entities across all collections, for logs.
    pub fn entity_count(&self) -> usize {
        self.global_elements.len()
            + self.global_spaces.len()
            + self.global_documents.len()
            + self.offer_groups.len()
            + self.task_groups.len()
    }
}
