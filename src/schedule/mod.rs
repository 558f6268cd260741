//! Maintenance scheduling engine.
//!
//! A scheduling request names a task, a base date and a cost, and optionally
//! a recurrence (`periodicityMonths` over `totalYears`) with yearly cost
//! indexation. The engine expands it over the selected elements into
//! `TaskGroup` + `OfferGroup` + `Task` triples.
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use mjop::model::Element;
//! use mjop::schedule::{Periodicity, ScheduleRequest, plan};
//!
//! let roof = Element::new("Dak");
//! let request = ScheduleRequest::one_off(
//!     "Onderhoud",
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     100.0,
//! )
//! .with_periodicity(Periodicity::new(12, 3).with_indexation(10.0));
//!
//! let plan = plan(&request, &[&roof]).unwrap();
//! let costs: Vec<f64> = plan.tasks.iter().map(|t| t.task.cost).collect();
//! assert_eq!(costs, vec![100.0, 110.0, 121.0]);
//! ```

pub mod calendar;
mod engine;
mod request;

pub use engine::{PlannedTask, SchedulePeriod, SchedulePlan, period_cost, periods, plan, request_echo};
pub(crate) use engine::mint_entry;
pub use request::{MAX_TOTAL_YEARS, Periodicity, ScheduleForm, ScheduleRequest};
