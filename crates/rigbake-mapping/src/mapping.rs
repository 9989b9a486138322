//! Joint mapping type.
//!
//! A [`JointMapping`] is an ordered table from joint (or control) name to a
//! retargeting slot id. The on-disk form is a single JSON object; entry order
//! is preserved through a load/save cycle so files stay diff-friendly.

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::slots::{SlotId, ROOT_SLOT};

/// A single name -> slot binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    /// Joint or control name, without namespace.
    pub name: String,
    /// Retargeting slot id.
    pub slot: SlotId,
}

/// Ordered mapping from joint/control name to retargeting slot id.
///
/// Names are unique; slot ids are not required to be.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JointMapping {
    entries: Vec<MappingEntry>,
}

impl JointMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a binding. A replaced name keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, slot: SlotId) {
        let name = name.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.slot = slot,
            None => self.entries.push(MappingEntry { name, slot }),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, slot: SlotId) -> Self {
        self.insert(name, slot);
        self
    }

    /// Returns the slot bound to `name`.
    pub fn get(&self, name: &str) -> Option<SlotId> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.slot)
    }

    /// Returns true if `name` is mapped.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the first name bound to `slot`, in file order.
    ///
    /// `None` means the slot is undefined for this mapping; callers treat
    /// that as a lookup miss rather than a failure.
    pub fn element(&self, slot: SlotId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.slot == slot)
            .map(|e| e.name.as_str())
    }

    /// Returns the name bound to the root slot (1).
    pub fn root(&self) -> Option<&str> {
        self.element(ROOT_SLOT)
    }

    /// Iterates entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }

    /// Iterates mapped names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, SlotId)> for JointMapping {
    fn from_iter<I: IntoIterator<Item = (N, SlotId)>>(iter: I) -> Self {
        let mut mapping = JointMapping::new();
        for (name, slot) in iter {
            mapping.insert(name, slot);
        }
        mapping
    }
}

impl<'a> IntoIterator for &'a JointMapping {
    type Item = &'a MappingEntry;
    type IntoIter = std::slice::Iter<'a, MappingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for JointMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, &entry.slot)?;
        }
        map.end()
    }
}

struct JointMappingVisitor;

impl<'de> Visitor<'de> for JointMappingVisitor {
    type Value = JointMapping;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object mapping names to positive integer slot ids")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut mapping = JointMapping::new();
        while let Some((name, slot)) = access.next_entry::<String, SlotId>()? {
            if slot == 0 {
                return Err(de::Error::custom(format!(
                    "slot id for '{}' must be positive",
                    name
                )));
            }
            mapping.insert(name, slot);
        }
        Ok(mapping)
    }
}

impl<'de> Deserialize<'de> for JointMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(JointMappingVisitor)
    }
}

/// The skeleton and control-rig mappings that share one name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappingSet {
    /// Skeleton joints (`<name>.sk.json`).
    pub skeleton: JointMapping,
    /// Animation controls (`<name>.cr.json`).
    pub controls: JointMapping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_root_and_element() {
        let mapping = JointMapping::new()
            .with("LThigh", 2)
            .with("Hip", 1)
            .with("LShin", 3);

        assert_eq!(mapping.root(), Some("Hip"));
        assert_eq!(mapping.element(3), Some("LShin"));
        assert_eq!(mapping.element(40), None);
    }

    #[test]
    fn test_root_missing_is_none() {
        let mapping = JointMapping::new().with("LThigh", 2);
        assert_eq!(mapping.root(), None);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut mapping = JointMapping::new().with("A", 1).with("B", 2);
        mapping.insert("A", 5);
        let names: Vec<_> = mapping.names().collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(mapping.get("A"), Some(5));
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_deserialize_preserves_file_order() {
        let json = r#"{"Spine": 8, "Hip": 1, "Head": 15}"#;
        let mapping: JointMapping = serde_json::from_str(json).unwrap();
        let names: Vec<_> = mapping.names().collect();
        assert_eq!(names, vec!["Spine", "Hip", "Head"]);

        let out = serde_json::to_string(&mapping).unwrap();
        assert_eq!(out, r#"{"Spine":8,"Hip":1,"Head":15}"#);
    }

    #[test]
    fn test_deserialize_rejects_bad_slots() {
        assert!(serde_json::from_str::<JointMapping>(r#"{"Hip": 0}"#).is_err());
        assert!(serde_json::from_str::<JointMapping>(r#"{"Hip": -1}"#).is_err());
        assert!(serde_json::from_str::<JointMapping>(r#"{"Hip": "1"}"#).is_err());
        assert!(serde_json::from_str::<JointMapping>(r#"["Hip"]"#).is_err());
    }

    #[test]
    fn test_duplicate_slots_allowed() {
        let mapping: JointMapping =
            serde_json::from_str(r#"{"FKSpine1_M": 8, "FKChest_M": 8}"#).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.element(8), Some("FKSpine1_M"));
    }
}
