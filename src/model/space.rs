use serde::{Deserialize, Serialize};

use super::lenient;

/// Label shown for elements whose `spaceId` no longer resolves.
pub const UNKNOWN_SPACE: &str = "Unknown space";

/// A physical area grouping elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    /// Set when the space spans every floor; `floor` is ignored then.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub all_floors: bool,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub floor: Option<i32>,
    /// Marker points on the space's reference image.
    #[serde(default, deserialize_with = "lenient::list")]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, deserialize_with = "lenient::number")]
    pub x: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub y: f64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloorDesignator {
    AllFloors,
    Floor(i32),
    Unspecified,
}

impl std::fmt::Display for FloorDesignator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllFloors => f.write_str("all floors"),
            Self::Floor(n) => write!(f, "floor {}", n),
            Self::Unspecified => f.write_str("-"),
        }
    }
}

impl Space {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    pub fn floor_designator(&self) -> FloorDesignator {
        match (self.all_floors, self.floor) {
            (true, _) => FloorDesignator::AllFloors,
            (false, Some(n)) => FloorDesignator::Floor(n),
            (false, None) => FloorDesignator::Unspecified,
        }
    }

    pub fn with_floor(mut self, floor: FloorDesignator) -> Self {
        match floor {
            FloorDesignator::AllFloors => {
                self.all_floors = true;
                self.floor = None;
            }
            FloorDesignator::Floor(n) => {
                self.all_floors = false;
                self.floor = Some(n);
            }
            FloorDesignator::Unspecified => {
                self.all_floors = false;
                self.floor = None;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_designator_all_floors_wins() {
        let space = Space {
            all_floors: true,
            floor: Some(3),
            ..Default::default()
        };
        assert_eq!(space.floor_designator(), FloorDesignator::AllFloors);
    }

    #[test]
    fn test_with_floor_clears_flag() {
        let space = Space::new("Hal", "")
            .with_floor(FloorDesignator::AllFloors)
            .with_floor(FloorDesignator::Floor(2));
        assert!(!space.all_floors);
        assert_eq!(space.floor_designator(), FloorDesignator::Floor(2));
    }

    #[test]
    fn test_space_deserializes_partial_json() {
        let space: Space =
            serde_json::from_str(r#"{"id": 7, "name": "Kelder", "annotations": null}"#).unwrap();
        assert_eq!(space.id, "7");
        assert!(space.annotations.is_empty());
        assert_eq!(space.floor_designator(), FloorDesignator::Unspecified);
    }
}
