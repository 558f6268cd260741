use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{lenient, new_id};

/// A scheduled piece of maintenance work on one element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    /// Nominal due date.
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub cost: f64,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_grouped: bool,
    /// Display copy of the owning element's name.
    #[serde(default, deserialize_with = "lenient::string")]
    pub element_name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub group_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub offer_group_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub planned: PlannedWork,
}

/// Execution details filled in once work is contracted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedWork {
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub work_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub offer_accepted: bool,
    #[serde(default, deserialize_with = "lenient::string")]
    pub comment: String,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub contract_cost: Option<f64>,
    /// Contracted duration in days.
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub contract_duration: Option<u32>,
    // Echo of the scheduling request that produced the task.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_periodic: bool,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub periodicity_months: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub total_years: Option<u32>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub indexation: bool,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub indexation_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub files: Vec<FileRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: String,
}

impl Task {
    pub fn new(name: &str, end_date: Option<NaiveDate>, cost: f64) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            end_date,
            cost,
            ..Default::default()
        }
    }

    /// The closed interval the task occupies: `planned.startDate` falling
    /// back to the nominal date, through `planned.endDate` falling back to
    /// the nominal date. `None` when neither end can be resolved.
    ///
    /// An inverted pair is returned in ascending order.
    pub fn effective_interval(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.planned.start_date.or(self.end_date)?;
        let end = self.planned.end_date.or(self.end_date)?;
        Some((start.min(end), start.max(end)))
    }

    /// Drop the group and offer links. The task itself stays.
    pub fn detach(&mut self) {
        self.group_id = None;
        self.offer_group_id = None;
        self.is_grouped = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_effective_interval_collapses_to_nominal_date() {
        let task = Task::new("Schilderwerk", Some(date(2025, 5, 1)), 100.0);
        assert_eq!(
            task.effective_interval(),
            Some((date(2025, 5, 1), date(2025, 5, 1)))
        );
    }

    #[test]
    fn test_effective_interval_prefers_planned_dates() {
        let mut task = Task::new("Schilderwerk", Some(date(2025, 5, 1)), 100.0);
        task.planned.start_date = Some(date(2025, 4, 20));
        task.planned.end_date = Some(date(2025, 5, 10));
        assert_eq!(
            task.effective_interval(),
            Some((date(2025, 4, 20), date(2025, 5, 10)))
        );
    }

    #[test]
    fn test_effective_interval_none_without_dates() {
        let task = Task::new("Onbekend", None, 0.0);
        assert_eq!(task.effective_interval(), None);
    }

    #[test]
    fn test_detach_clears_links() {
        let mut task = Task::new("Reinigen", Some(date(2025, 1, 1)), 50.0);
        task.group_id = Some("g1".into());
        task.offer_group_id = Some("o1".into());
        task.is_grouped = true;
        task.detach();
        assert_eq!(task.group_id, None);
        assert_eq!(task.offer_group_id, None);
        assert!(!task.is_grouped);
    }

    #[test]
    fn test_planned_null_becomes_default() {
        let task: Task = serde_json::from_str(r#"{"id": "t", "planned": null}"#).unwrap();
        assert_eq!(task.planned, PlannedWork::default());
    }
}
