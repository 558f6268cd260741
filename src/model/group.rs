use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::lenient;

/// Output of one scheduling action for a single point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGroup {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub base_cost: f64,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub assign_prices_individually: bool,
    #[serde(default, deserialize_with = "lenient::list")]
    pub subtasks: Vec<Subtask>,
}

/// One participating element of a task group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    #[serde(default, deserialize_with = "lenient::string")]
    pub element_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub task_id: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub individual_cost: f64,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub end_date: Option<NaiveDate>,
}

impl TaskGroup {
    pub fn subtask_for(&self, element_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.element_id == element_id)
    }

    pub fn element_ids(&self) -> impl Iterator<Item = &str> {
        self.subtasks.iter().map(|s| s.element_id.as_str())
    }

    pub fn total_cost(&self) -> f64 {
        super::round_cents(self.subtasks.iter().map(|s| s.individual_cost).sum())
    }
}

/// Commercial counterpart of one task-group entry, tracked per element so
/// offers can be approved element by element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferGroup {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub group_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub element_id: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub task_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub estimated_value: f64,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub work_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub offer_accepted: bool,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub invoice_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub offer_price: Option<f64>,
}
