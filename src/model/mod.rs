//! Entity model for the maintenance planner.
//!
//! Spaces and elements are top-level. Tasks are owned by their element;
//! task groups and offer groups live beside the elements and refer to tasks
//! and elements by id. All types serialize to the camelCase snapshot format
//! and deserialize leniently (see [`lenient`]).

mod element;
mod group;
pub mod lenient;
mod space;
mod task;

pub use element::{DefectLedger, Element, InspectionReport, Severity};
pub use group::{OfferGroup, Subtask, TaskGroup};
pub use space::{Annotation, FloorDesignator, Space, UNKNOWN_SPACE};
pub use task::{FileRef, PlannedWork, Task};

/// Mint a fresh entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Round a monetary amount to cents.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(121.00000000000003), 121.0);
        assert_eq!(round_cents(110.00000000000001), 110.0);
        assert_eq!(round_cents(10.006), 10.01);
        assert_eq!(round_cents(-2.344), -2.34);
    }

    #[test]
    fn test_new_id_is_unique() {
        assert_ne!(new_id(), new_id());
    }
}
