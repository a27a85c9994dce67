//! Residents as supplied by the directory.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a resident (e.g. `user1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResidentId(String);

impl ResidentId {
    /// Wrap an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResidentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ResidentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A resident of the facility.
///
/// Only `id` and `name` are read by the recorder; any other fields the
/// directory keeps are carried along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resident {
    /// Identifier.
    pub id: ResidentId,
    /// Display name.
    pub name: String,
    /// Directory-owned fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resident {
    /// Create a resident with no extra fields.
    #[must_use]
    pub fn new(id: impl Into<ResidentId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extra: Map::new(),
        }
    }

    /// First character of the name, shown as the avatar initial.
    #[must_use]
    pub fn initial(&self) -> Option<char> {
        self.name.chars().next()
    }
}

/// Changes requested for a resident.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentPatch {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ResidentPatch {
    /// A patch that renames the resident.
    #[must_use]
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Apply the patch in place.
    pub fn apply(&self, resident: &mut Resident) {
        if let Some(name) = &self.name {
            resident.name.clone_from(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resident_keeps_extra_fields() {
        let raw = json!({"id": "user1", "name": "田中", "room": "201"});
        let resident: Resident = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(resident.id.as_str(), "user1");
        assert_eq!(resident.initial(), Some('田'));
        assert_eq!(serde_json::to_value(&resident).unwrap(), raw);
    }

    #[test]
    fn test_patch_apply() {
        let mut resident = Resident::new("user1", "田中");
        ResidentPatch::default().apply(&mut resident);
        assert_eq!(resident.name, "田中");

        ResidentPatch::rename("田中 太郎").apply(&mut resident);
        assert_eq!(resident.name, "田中 太郎");
    }

    #[test]
    fn test_resident_id_display() {
        assert_eq!(ResidentId::from("user2").to_string(), "user2");
    }
}
