//! Scheduling requests and their validation.
//!
//! `ScheduleForm` is the raw, stringly-typed input as a host collects it;
//! `ScheduleForm::validate` turns it into a typed `ScheduleRequest` or a
//! field-level `ValidationErrors` map. Requests built in code go through
//! `ScheduleRequest::validate`, which applies the same range rules.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::add_months;
use crate::errors::ValidationErrors;
use crate::model::lenient::DATE_FORMAT;
use crate::model::round_cents;

/// Raw scheduling input. Numeric fields are kept as text so that "not a
/// number" can be reported per field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_date: String,
    #[serde(default)]
    pub cost: String,
    #[serde(default)]
    pub assign_prices_individually: bool,
    /// Element id -> cost text, used when prices are assigned individually.
    #[serde(default)]
    pub individual_costs: BTreeMap<String, String>,
    #[serde(default)]
    pub periodic: bool,
    #[serde(default)]
    pub periodicity_months: String,
    #[serde(default)]
    pub total_years: String,
    #[serde(default)]
    pub indexation: bool,
    #[serde(default)]
    pub indexation_rate: String,
}

/// Recurrence settings of a periodic request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Periodicity {
    pub periodicity_months: u32,
    pub total_years: u32,
    /// Yearly indexation in percent; `None` disables indexation.
    pub indexation_rate: Option<f64>,
}

impl Periodicity {
    pub fn new(periodicity_months: u32, total_years: u32) -> Self {
        Self {
            periodicity_months,
            total_years,
            indexation_rate: None,
        }
    }

    pub fn with_indexation(mut self, rate_percent: f64) -> Self {
        self.indexation_rate = Some(rate_percent);
        self
    }

    /// `floor(totalYears * 12 / periodicityMonths)`.
    pub fn total_periods(&self) -> u32 {
        if self.periodicity_months == 0 {
            return 0;
        }
        self.total_years.saturating_mul(12) / self.periodicity_months
    }
}

/// A validated scheduling request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_date: NaiveDate,
    pub base_cost: f64,
    /// Element id -> cost. When present, prices are assigned individually.
    #[serde(default)]
    pub per_element_cost: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub periodic: Option<Periodicity>,
}

impl ScheduleRequest {
    pub fn one_off(name: &str, base_date: NaiveDate, base_cost: f64) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            base_date,
            base_cost: round_cents(base_cost),
            per_element_cost: None,
            periodic: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_periodicity(mut self, periodicity: Periodicity) -> Self {
        self.periodic = Some(periodicity);
        self
    }

    pub fn with_individual_costs(mut self, costs: BTreeMap<String, f64>) -> Self {
        self.per_element_cost = Some(
            costs
                .into_iter()
                .map(|(id, cost)| (id, round_cents(cost)))
                .collect(),
        );
        self
    }

    pub fn assigns_prices_individually(&self) -> bool {
        self.per_element_cost.is_some()
    }

    /// Unindexed cost for one element: its individual price when prices are
    /// assigned individually, the base cost otherwise.
    pub fn cost_for(&self, element_id: &str) -> Option<f64> {
        match &self.per_element_cost {
            Some(costs) => costs.get(element_id).copied(),
            None => Some(self.base_cost),
        }
    }

    /// Range checks shared with `ScheduleForm::validate`.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, &self.name);
        let periodic = self.periodic.is_some();

        if self.per_element_cost.is_none() {
            check_cost(&mut errors, "cost", self.base_cost, periodic);
        } else {
            check_cost(&mut errors, "cost", self.base_cost, true);
        }
        for (element_id, cost) in self.per_element_cost.iter().flatten() {
            check_cost(
                &mut errors,
                &format!("individualCosts.{}", element_id),
                *cost,
                periodic,
            );
        }

        if let Some(periodicity) = &self.periodic {
            if periodicity.periodicity_months == 0 {
                errors.add("periodicityMonths", MSG_PERIODICITY);
            }
            if periodicity.total_years == 0 {
                errors.add("totalYears", MSG_TOTAL_YEARS);
            }
            if let Some(rate) = periodicity.indexation_rate
                && (!rate.is_finite() || rate < 0.0)
            {
                errors.add("indexationRate", MSG_INDEXATION);
            }
            check_horizon(&mut errors, Some(self.base_date), periodicity);
        }
        errors.into_result()
    }
}

const MSG_NAME: &str = "must not be empty";
const MSG_DATE: &str = "must be a valid date (YYYY-MM-DD)";
const MSG_POSITIVE: &str = "must be a positive number";
const MSG_NON_NEGATIVE: &str = "must be a non-negative number";
const MSG_PERIODICITY: &str = "must be a positive whole number of months";
const MSG_TOTAL_YEARS: &str = "must be a positive whole number of years";
const MSG_INDEXATION: &str = "must be a non-negative number";
pub(super) const MSG_PAST_CALENDAR: &str = "reaches past the last supported date";

/// Longest planning horizon a periodic request may cover.
pub const MAX_TOTAL_YEARS: u32 = 200;

fn check_name(errors: &mut ValidationErrors, name: &str) {
    if name.trim().is_empty() {
        errors.add("name", MSG_NAME);
    }
}

/// One-off costs must be positive; periodic costs may be zero.
fn check_cost(errors: &mut ValidationErrors, field: &str, cost: f64, periodic: bool) {
    if !cost.is_finite() {
        errors.add(field, MSG_POSITIVE);
    } else if periodic && cost < 0.0 {
        errors.add(field, MSG_NON_NEGATIVE);
    } else if !periodic && cost <= 0.0 {
        errors.add(field, MSG_POSITIVE);
    }
}

/// The horizon must hold at least one period, stay within
/// `MAX_TOTAL_YEARS` and end on a representable date.
fn check_horizon(
    errors: &mut ValidationErrors,
    base_date: Option<NaiveDate>,
    periodicity: &Periodicity,
) {
    if periodicity.periodicity_months == 0 || periodicity.total_years == 0 {
        return;
    }
    if periodicity.total_years > MAX_TOTAL_YEARS {
        errors.add(
            "totalYears",
            format!("must not exceed {} years", MAX_TOTAL_YEARS),
        );
        return;
    }
    let periods = periodicity.total_periods();
    if periods == 0 {
        errors.add(
            "periodicityMonths",
            format!(
                "must not exceed the planning horizon of {} months",
                periodicity.total_years * 12
            ),
        );
        return;
    }
    let last = (periods - 1)
        .checked_mul(periodicity.periodicity_months)
        .zip(base_date)
        .and_then(|(months, base)| add_months(base, months));
    if base_date.is_some() && last.is_none() {
        errors.add("totalYears", MSG_PAST_CALENDAR);
    }
}

/// Parse a decimal number, accepting a comma as decimal separator.
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

fn parse_whole(raw: &str) -> Option<u32> {
    parse_number(raw)
        .filter(|n| *n > 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32)
}

impl ScheduleForm {
    /// Validate every field and build the typed request. All failures are
    /// collected; nothing is returned partially.
    pub fn validate(&self) -> Result<ScheduleRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, &self.name);

        let base_date = NaiveDate::parse_from_str(self.base_date.trim(), DATE_FORMAT).ok();
        if base_date.is_none() {
            errors.add("baseDate", MSG_DATE);
        }

        let base_cost = if self.assign_prices_individually && self.cost.trim().is_empty() {
            Some(0.0)
        } else {
            parse_number(&self.cost)
        };
        let base_cost_periodic_rule = self.periodic || self.assign_prices_individually;
        match base_cost {
            Some(cost) => check_cost(&mut errors, "cost", cost, base_cost_periodic_rule),
            None if base_cost_periodic_rule => errors.add("cost", MSG_NON_NEGATIVE),
            None => errors.add("cost", MSG_POSITIVE),
        }

        let mut individual = BTreeMap::new();
        if self.assign_prices_individually {
            for (element_id, raw) in &self.individual_costs {
                let field = format!("individualCosts.{}", element_id);
                match parse_number(raw) {
                    Some(cost) => {
                        check_cost(&mut errors, &field, cost, self.periodic);
                        individual.insert(element_id.clone(), cost);
                    }
                    None if self.periodic => errors.add(&field, MSG_NON_NEGATIVE),
                    None => errors.add(&field, MSG_POSITIVE),
                }
            }
        }

        let mut periodicity = None;
        if self.periodic {
            let months = parse_whole(&self.periodicity_months);
            if months.is_none() {
                errors.add("periodicityMonths", MSG_PERIODICITY);
            }
            let years = parse_whole(&self.total_years);
            if years.is_none() {
                errors.add("totalYears", MSG_TOTAL_YEARS);
            }
            let rate = if self.indexation {
                let rate = parse_number(&self.indexation_rate).filter(|r| *r >= 0.0);
                if rate.is_none() {
                    errors.add("indexationRate", MSG_INDEXATION);
                }
                rate
            } else {
                None
            };
            if let (Some(months), Some(years)) = (months, years) {
                let p = Periodicity {
                    periodicity_months: months,
                    total_years: years,
                    indexation_rate: rate,
                };
                check_horizon(&mut errors, base_date, &p);
                periodicity = Some(p);
            }
        }

        errors.into_result()?;

        // Every branch above recorded an error when these were missing.
        let (Some(base_date), Some(base_cost)) = (base_date, base_cost) else {
            return Err(ValidationErrors::new());
        };
        let mut request = ScheduleRequest::one_off(self.name.trim(), base_date, base_cost)
            .with_description(self.description.trim());
        if self.assign_prices_individually {
            request = request.with_individual_costs(individual);
        }
        if let Some(p) = periodicity {
            request = request.with_periodicity(p);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_off_form() -> ScheduleForm {
        ScheduleForm {
            name: "Schilderwerk".to_string(),
            base_date: "2024-01-01".to_string(),
            cost: "100".to_string(),
            ..Default::default()
        }
    }

    fn periodic_form() -> ScheduleForm {
        ScheduleForm {
            periodic: true,
            periodicity_months: "12".to_string(),
            total_years: "3".to_string(),
            indexation: true,
            indexation_rate: "10".to_string(),
            ..one_off_form()
        }
    }

    #[test]
    fn test_valid_one_off_form() {
        let request = one_off_form().validate().unwrap();
        assert_eq!(request.base_cost, 100.0);
        assert_eq!(request.base_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(request.periodic.is_none());
        assert!(!request.assigns_prices_individually());
    }

    #[test]
    fn test_valid_periodic_form() {
        let request = periodic_form().validate().unwrap();
        let periodicity = request.periodic.unwrap();
        assert_eq!(periodicity.periodicity_months, 12);
        assert_eq!(periodicity.total_years, 3);
        assert_eq!(periodicity.indexation_rate, Some(10.0));
        assert_eq!(periodicity.total_periods(), 3);
    }

    #[test]
    fn test_one_off_cost_must_be_positive() {
        let form = ScheduleForm {
            cost: "0".to_string(),
            ..one_off_form()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("cost"), Some(MSG_POSITIVE));

        let form = ScheduleForm {
            cost: "abc".to_string(),
            ..one_off_form()
        };
        assert!(form.validate().unwrap_err().get("cost").is_some());
    }

    #[test]
    fn test_periodic_cost_may_be_zero() {
        let form = ScheduleForm {
            cost: "0".to_string(),
            ..periodic_form()
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_all_field_errors_are_collected() {
        let form = ScheduleForm {
            name: "  ".to_string(),
            base_date: "2024-13-01".to_string(),
            periodicity_months: "-6".to_string(),
            total_years: "1.5".to_string(),
            indexation_rate: "-1".to_string(),
            ..periodic_form()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("baseDate").is_some());
        assert!(errors.get("periodicityMonths").is_some());
        assert!(errors.get("totalYears").is_some());
        assert!(errors.get("indexationRate").is_some());
    }

    #[test]
    fn test_indexation_rate_ignored_when_disabled() {
        let form = ScheduleForm {
            indexation: false,
            indexation_rate: "garbage".to_string(),
            ..periodic_form()
        };
        let request = form.validate().unwrap();
        assert_eq!(request.periodic.unwrap().indexation_rate, None);
    }

    #[test]
    fn test_periodicity_beyond_horizon_is_rejected() {
        let form = ScheduleForm {
            periodicity_months: "24".to_string(),
            total_years: "1".to_string(),
            ..periodic_form()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("periodicityMonths").unwrap().contains("12 months"));
    }

    #[test]
    fn test_horizon_is_capped() {
        let form = ScheduleForm {
            total_years: "300000".to_string(),
            ..periodic_form()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("totalYears").unwrap().contains("200 years"));

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let request = ScheduleRequest::one_off("A", date, 10.0)
            .with_periodicity(Periodicity::new(12, 300_000));
        assert!(request.validate().unwrap_err().get("totalYears").is_some());

        let request = ScheduleRequest::one_off("A", date, 10.0)
            .with_periodicity(Periodicity::new(12, MAX_TOTAL_YEARS));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_horizon_past_calendar_end_is_rejected() {
        let base = NaiveDate::MAX - chrono::Months::new(6);
        let request = ScheduleRequest::one_off("A", base, 10.0)
            .with_periodicity(Periodicity::new(12, 2));
        let errors = request.validate().unwrap_err();
        assert_eq!(errors.get("totalYears"), Some(MSG_PAST_CALENDAR));
    }

    #[test]
    fn test_individual_costs_are_validated_per_element() {
        let mut form = ScheduleForm {
            assign_prices_individually: true,
            cost: String::new(),
            ..one_off_form()
        };
        form.individual_costs.insert("e1".to_string(), "250,50".to_string());
        form.individual_costs.insert("e2".to_string(), "x".to_string());

        let errors = form.validate().unwrap_err();
        assert!(errors.get("individualCosts.e2").is_some());
        assert!(errors.get("individualCosts.e1").is_none());
        assert!(errors.get("cost").is_none());

        form.individual_costs.insert("e2".to_string(), "75".to_string());
        let request = form.validate().unwrap();
        assert_eq!(request.cost_for("e1"), Some(250.5));
        assert_eq!(request.cost_for("e3"), None);
    }

    #[test]
    fn test_request_validate_matches_form_rules() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(ScheduleRequest::one_off("A", date, 10.0).validate().is_ok());
        assert!(ScheduleRequest::one_off("A", date, 0.0).validate().is_err());

        let request = ScheduleRequest::one_off("A", date, 10.0)
            .with_periodicity(Periodicity::new(0, 2).with_indexation(-1.0));
        let errors = request.validate().unwrap_err();
        assert!(errors.get("periodicityMonths").is_some());
        assert!(errors.get("indexationRate").is_some());
    }
}
