//! Attribute location registry
//!
//! Raw stat blocks are not uniform: the same attribute may sit at the top
//! level of one block and inside an `Attributes` container of another. The
//! [`Locator`] records, per skin, where each attribute was first seen so every
//! later read and write for that attribute addresses the same place.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fmt;

/// Container holding free-form attributes
pub const ATTRIBUTES: &str = "Attributes";
/// Container holding the detection flags
pub const DETECTIONS: &str = "Detections";
/// Detection flags exposed as flat boolean attributes
pub const DETECTION_FLAGS: [&str; 3] = ["Hidden", "Flying", "Lead"];

/// Path of container keys leading to an attribute
///
/// An empty path addresses the top level of a stat block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location(Vec<String>);

impl Location {
    /// Create a location from a container path
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(path.into_iter().map(Into::into).collect())
    }

    /// The top level of a stat block
    pub fn top() -> Self {
        Self(Vec::new())
    }

    /// The `Attributes` container
    pub fn attributes() -> Self {
        Self::new([ATTRIBUTES])
    }

    /// The `Detections` container
    pub fn detections() -> Self {
        Self::new([DETECTIONS])
    }

    /// Container keys in descent order
    pub fn path(&self) -> &[String] {
        &self.0
    }

    /// Check if this addresses the top level
    pub fn is_top(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<top>")
        } else {
            write!(f, "{}", self.0.join("."))
        }
    }
}

/// Check if `name` is one of the three detection flags
pub fn is_detection_flag(name: &str) -> bool {
    DETECTION_FLAGS.contains(&name)
}

/// Per-skin registry of attribute locations
#[derive(Debug, Clone, Default)]
pub struct Locator {
    locations: IndexMap<String, Location>,
    detections: IndexSet<String>,
}

impl Locator {
    /// Create an empty locator
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `name` from `data` by descending `location`
    ///
    /// Returns `None` if any container on the path or the final key is absent.
    pub fn locate<'a>(data: &'a Json, name: &str, location: &Location) -> Option<&'a Json> {
        Self::target(data, location)?.get(name)
    }

    /// Descend `location` and return the container for reading
    pub fn target<'a>(data: &'a Json, location: &Location) -> Option<&'a Map<String, Json>> {
        let mut current = data;
        for key in location.path() {
            current = current.as_object()?.get(key)?;
        }
        current.as_object()
    }

    /// Descend `location` and return the container for an in-place write
    ///
    /// Missing containers are not created.
    pub fn get_target_data<'a>(
        data: &'a mut Json,
        location: &Location,
    ) -> Option<&'a mut Map<String, Json>> {
        let mut current = data;
        for key in location.path() {
            current = current.as_object_mut()?.get_mut(key)?;
        }
        current.as_object_mut()
    }

    /// Record the location of `name`; the first recorded location wins
    ///
    /// Returns `true` if the location was recorded by this call.
    pub fn add_location(&mut self, name: impl Into<String>, location: Location) -> bool {
        let name = name.into();
        if self.locations.contains_key(&name) {
            return false;
        }
        self.locations.insert(name, location);
        true
    }

    /// Check if `name` has a recorded location
    pub fn has_location(&self, name: &str) -> bool {
        self.locations.contains_key(name)
    }

    /// Get the recorded location of `name`
    pub fn get_location(&self, name: &str) -> Option<&Location> {
        self.locations.get(name)
    }

    /// Track a detection flag
    pub fn add_detection(&mut self, name: impl Into<String>) {
        self.detections.insert(name.into());
    }

    /// Check if `name` is a tracked detection flag
    pub fn has_detection(&self, name: &str) -> bool {
        self.detections.contains(name)
    }

    /// Iterate over recorded locations in discovery order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Location)> {
        self.locations.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of located attributes
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Check if nothing has been located yet
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
