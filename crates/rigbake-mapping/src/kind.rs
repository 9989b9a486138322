//! Mapping kinds and their file suffixes.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::MappingError;

/// The two independent slot numbering spaces a mapping can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    /// Skeleton joints bound to characterization slots (`.sk.json`).
    Skeleton,
    /// Animation controls bound to control-rig retargeting slots (`.cr.json`).
    ControlRig,
}

impl MappingKind {
    /// All mapping kinds, skeleton first.
    pub const ALL: [MappingKind; 2] = [MappingKind::Skeleton, MappingKind::ControlRig];

    /// Returns the short suffix used in file names.
    pub fn suffix(&self) -> &'static str {
        match self {
            MappingKind::Skeleton => "sk",
            MappingKind::ControlRig => "cr",
        }
    }

    /// Returns the full file extension including the json part (e.g., ".sk.json").
    pub fn file_extension(&self) -> String {
        format!(".{}.json", self.suffix())
    }

    /// Builds the file name for a mapping of this kind.
    pub fn file_name(&self, name: &str) -> String {
        format!("{}{}", name, self.file_extension())
    }

    /// Extracts the mapping name from a file name of this kind, if it matches.
    pub fn strip_file_name<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        file_name
            .strip_suffix(self.file_extension().as_str())
            .filter(|name| !name.is_empty())
    }
}

impl std::fmt::Display for MappingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

impl FromStr for MappingKind {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sk" | "skeleton" => Ok(MappingKind::Skeleton),
            "cr" | "control_rig" | "controls" => Ok(MappingKind::ControlRig),
            other => Err(MappingError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(MappingKind::Skeleton.file_name("iPi"), "iPi.sk.json");
        assert_eq!(
            MappingKind::ControlRig.file_name("AdvancedSkeleton"),
            "AdvancedSkeleton.cr.json"
        );
    }

    #[test]
    fn test_strip_file_name() {
        assert_eq!(
            MappingKind::Skeleton.strip_file_name("iPi.sk.json"),
            Some("iPi")
        );
        assert_eq!(
            MappingKind::Skeleton.strip_file_name("rig.v2.sk.json"),
            Some("rig.v2")
        );
        assert_eq!(MappingKind::Skeleton.strip_file_name("iPi.cr.json"), None);
        assert_eq!(MappingKind::ControlRig.strip_file_name(".cr.json"), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("sk".parse::<MappingKind>().unwrap(), MappingKind::Skeleton);
        assert_eq!("cr".parse::<MappingKind>().unwrap(), MappingKind::ControlRig);
        assert!("xx".parse::<MappingKind>().is_err());
    }
}
