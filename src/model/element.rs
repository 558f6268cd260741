//! Elements: the physical assets that carry defects, inspections and tasks.
//!
//! The shape invariants live here as `Element::sanitized`, which the store
//! runs on every write:
//! - `gebreken` always holds the three severity buckets
//! - at least one inspection report exists
//! - denormalized task fields (`elementName`, `isGrouped`) agree with the element

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::task::Task;
use super::{lenient, new_id};
use crate::errors::StoreError;

/// Defect severity buckets. The wire names are Dutch and fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Severe
    Ernstig,
    /// Serious
    Serieus,
    /// Minor
    Gering,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Ernstig, Severity::Serieus, Severity::Gering];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ernstig => "ernstig",
            Self::Serieus => "serieus",
            Self::Gering => "gering",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ernstig" => Ok(Self::Ernstig),
            "serieus" => Ok(Self::Serieus),
            "gering" => Ok(Self::Gering),
            other => Err(StoreError::UnknownSeverity {
                category: other.to_string(),
            }),
        }
    }
}

/// Per-element defect labels bucketed by severity.
///
/// Serializes as `{"ernstig": [...], "serieus": [...], "gering": [...]}` and
/// always emits all three keys. Deserialization accepts anything: missing or
/// non-array buckets become empty, non-string labels are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DefectLedger {
    pub ernstig: Vec<String>,
    pub serieus: Vec<String>,
    pub gering: Vec<String>,
}

impl<'de> Deserialize<'de> for DefectLedger {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        let mut ledger = DefectLedger::default();
        if let Some(Value::Object(map)) = value {
            for severity in Severity::ALL {
                if let Some(Value::Array(labels)) = map.get(severity.as_str()) {
                    *ledger.bucket_mut(severity) = labels
                        .iter()
                        .filter_map(|l| l.as_str().map(str::to_string))
                        .collect();
                }
            }
        }
        Ok(ledger)
    }
}

impl DefectLedger {
    pub fn bucket(&self, severity: Severity) -> &[String] {
        match severity {
            Severity::Ernstig => &self.ernstig,
            Severity::Serieus => &self.serieus,
            Severity::Gering => &self.gering,
        }
    }

    fn bucket_mut(&mut self, severity: Severity) -> &mut Vec<String> {
        match severity {
            Severity::Ernstig => &mut self.ernstig,
            Severity::Serieus => &mut self.serieus,
            Severity::Gering => &mut self.gering,
        }
    }

    pub fn contains(&self, severity: Severity, label: &str) -> bool {
        self.bucket(severity).iter().any(|l| l == label.trim())
    }

    /// Append `label` to the bucket. Returns `false` (and changes nothing)
    /// when the label is already present.
    pub fn add(&mut self, severity: Severity, label: &str) -> bool {
        let label = label.trim();
        if self.contains(severity, label) {
            return false;
        }
        self.bucket_mut(severity).push(label.to_string());
        true
    }

    /// Remove `label` from the bucket. Returns `false` when it was absent.
    pub fn remove(&mut self, severity: Severity, label: &str) -> bool {
        let label = label.trim();
        let bucket = self.bucket_mut(severity);
        let before = bucket.len();
        bucket.retain(|l| l != label);
        bucket.len() != before
    }

    pub fn len(&self) -> usize {
        self.ernstig.len() + self.serieus.len() + self.gering.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trim labels, drop blanks and duplicates, keeping first-seen order.
    pub fn normalize(&mut self) {
        for severity in Severity::ALL {
            let bucket = self.bucket_mut(severity);
            let mut seen = BTreeSet::new();
            let labels = std::mem::take(bucket);
            *bucket = labels
                .into_iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty() && seen.insert(l.clone()))
                .collect();
        }
    }
}

/// An inspection of an element. The nested `tasks` list predates scheduled
/// tasks and is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionReport {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub inspection_done: bool,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub inspection_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub tasks: Vec<Value>,
}

impl InspectionReport {
    pub fn new() -> Self {
        Self {
            id: new_id(),
            ..Default::default()
        }
    }
}

/// A physical asset subject to maintenance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    /// Free-form categories used to group elements when scheduling.
    #[serde(default, deserialize_with = "lenient::string_set")]
    pub categories: BTreeSet<String>,
    /// Weak reference; may point at a deleted space.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub space_id: Option<String>,
    #[serde(default)]
    pub gebreken: DefectLedger,
    #[serde(default, deserialize_with = "lenient::list")]
    pub inspection_reports: Vec<InspectionReport>,
    /// Scheduled maintenance. Authoritative list of the element's tasks.
    #[serde(default, deserialize_with = "lenient::list")]
    pub tasks: Vec<Task>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub acquisition_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub expected_lifetime_years: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub replacement_cost: Option<f64>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
        .sanitized()
    }

    pub fn with_space(mut self, space_id: &str) -> Self {
        self.space_id = Some(space_id.to_string());
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.categories.insert(category.to_string());
        self
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    /// Year the element is due for replacement, when its lifecycle fields
    /// allow computing one.
    pub fn replacement_year(&self) -> Option<i32> {
        use chrono::Datelike;
        let acquired = self.acquisition_date?;
        let lifetime = i32::try_from(self.expected_lifetime_years?).ok()?;
        Some(acquired.year() + lifetime)
    }

    /// Repair the shape invariants. Idempotent.
    pub fn sanitized(mut self) -> Self {
        if self.id.trim().is_empty() {
            self.id = new_id();
        }
        self.categories = std::mem::take(&mut self.categories)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        self.space_id = self.space_id.take().filter(|s| !s.trim().is_empty());
        self.gebreken.normalize();

        for report in &mut self.inspection_reports {
            if report.id.trim().is_empty() {
                report.id = new_id();
            }
        }
        if self.inspection_reports.is_empty() {
            self.inspection_reports.push(InspectionReport::new());
        }

        for task in &mut self.tasks {
            if task.id.trim().is_empty() {
                task.id = new_id();
            }
            task.element_name = self.name.clone();
            if task.group_id.is_none() {
                task.offer_group_id = None;
            }
            task.is_grouped = task.group_id.is_some();
        }
        self
    }
}
