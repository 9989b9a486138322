//! File-backed mapping store.
//!
//! Mappings live in a single directory as `<name>.<sk|cr>.json`. Nothing is
//! cached: every load re-reads the file.

use std::path::{Path, PathBuf};

use crate::error::{MappingError, MappingResult};
use crate::kind::MappingKind;
use crate::mapping::{JointMapping, MappingSet};

/// Environment variable overriding the mappings directory.
pub const MAPPINGS_DIR_ENV: &str = "RIGBAKE_MAPPINGS_DIR";

/// Directory used when nothing else is configured.
pub const DEFAULT_MAPPINGS_DIR: &str = "mappings";

/// Reads and writes named mappings under one root directory.
#[derive(Debug, Clone)]
pub struct MappingStore {
    root: PathBuf,
}

impl MappingStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the store root: explicit override, then `RIGBAKE_MAPPINGS_DIR`,
    /// then `./mappings`.
    pub fn resolve(override_dir: Option<&Path>) -> Self {
        if let Some(dir) = override_dir {
            return Self::new(dir);
        }
        if let Ok(dir) = std::env::var(MAPPINGS_DIR_ENV) {
            if !dir.is_empty() {
                return Self::new(dir);
            }
        }
        Self::new(DEFAULT_MAPPINGS_DIR)
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path a mapping of `name` and `kind` lives at.
    pub fn path_for(&self, name: &str, kind: MappingKind) -> MappingResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(kind.file_name(name)))
    }

    /// Loads a mapping.
    pub fn load(&self, name: &str, kind: MappingKind) -> MappingResult<JointMapping> {
        let path = self.path_for(name, kind)?;
        if !path.is_file() {
            return Err(MappingError::NotFound {
                name: name.to_string(),
                kind,
                path,
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|e| MappingError::ReadFailed {
            path: path.clone(),
            source: e,
        })?;
        let mapping = serde_json::from_str(&content)
            .map_err(|e| MappingError::ParseFailed { path: path.clone(), source: e })?;

        log::debug!("loaded mapping {}", path.display());
        Ok(mapping)
    }

    /// Loads the skeleton and control-rig mappings sharing `name`.
    pub fn load_set(&self, name: &str) -> MappingResult<MappingSet> {
        Ok(MappingSet {
            skeleton: self.load(name, MappingKind::Skeleton)?,
            controls: self.load(name, MappingKind::ControlRig)?,
        })
    }

    /// Writes a mapping, silently overwriting any existing file.
    ///
    /// Returns the path written.
    pub fn save(
        &self,
        mapping: &JointMapping,
        name: &str,
        kind: MappingKind,
    ) -> MappingResult<PathBuf> {
        let path = self.path_for(name, kind)?;
        std::fs::create_dir_all(&self.root).map_err(|e| MappingError::WriteFailed {
            path: self.root.clone(),
            source: e,
        })?;

        let mut json =
            serde_json::to_string_pretty(mapping).map_err(MappingError::SerializeFailed)?;
        json.push('\n');
        std::fs::write(&path, json).map_err(|e| MappingError::WriteFailed {
            path: path.clone(),
            source: e,
        })?;

        log::debug!("saved mapping {}", path.display());
        Ok(path)
    }

    /// Lazily enumerates the names of stored mappings of `kind`.
    ///
    /// A missing root directory yields no names. Unreadable directory
    /// entries are skipped.
    pub fn names(&self, kind: MappingKind) -> MappingResult<impl Iterator<Item = String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => Some(entries),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(MappingError::ScanFailed {
                    path: self.root.clone(),
                    source: e,
                })
            }
        };

        Ok(entries.into_iter().flatten().filter_map(move |entry| {
            let entry = entry.ok()?;
            if !entry.file_type().ok()?.is_file() {
                return None;
            }
            let file_name = entry.file_name();
            kind.strip_file_name(file_name.to_str()?)
                .map(str::to_string)
        }))
    }

    /// Returns the names of stored mappings of `kind`, sorted.
    pub fn list_names(&self, kind: MappingKind) -> MappingResult<Vec<String>> {
        let mut names: Vec<String> = self.names(kind)?.collect();
        names.sort();
        Ok(names)
    }
}

impl Default for MappingStore {
    fn default() -> Self {
        Self::resolve(None)
    }
}

fn validate_name(name: &str) -> MappingResult<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(MappingError::invalid_name(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> JointMapping {
        JointMapping::new()
            .with("Hip", 1)
            .with("LThigh", 2)
            .with("LShin", 3)
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path());
        let err = store.load("iPi", MappingKind::Skeleton).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path());

        let path = store.save(&sample(), "iPi", MappingKind::Skeleton).unwrap();
        assert_eq!(path, dir.path().join("iPi.sk.json"));

        let loaded = store.load("iPi", MappingKind::Skeleton).unwrap();
        assert_eq!(loaded, sample());

        // Saving what was loaded leaves the mapping unchanged.
        store.save(&loaded, "iPi", MappingKind::Skeleton).unwrap();
        assert_eq!(store.load("iPi", MappingKind::Skeleton).unwrap(), sample());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path());
        store.save(&sample(), "rig", MappingKind::ControlRig).unwrap();

        let replacement = JointMapping::new().with("RootX_M", 1);
        store.save(&replacement, "rig", MappingKind::ControlRig).unwrap();
        assert_eq!(
            store.load("rig", MappingKind::ControlRig).unwrap(),
            replacement
        );
    }

    #[test]
    fn test_save_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("nested").join("mappings"));
        store.save(&sample(), "iPi", MappingKind::Skeleton).unwrap();
        assert!(store.root().join("iPi.sk.json").is_file());
    }

    #[test]
    fn test_list_names_filters_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path());
        store.save(&sample(), "iPi", MappingKind::Skeleton).unwrap();
        store.save(&sample(), "AdvancedSkeleton", MappingKind::Skeleton).unwrap();
        store.save(&sample(), "AdvancedSkeleton", MappingKind::ControlRig).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(
            store.list_names(MappingKind::Skeleton).unwrap(),
            vec!["AdvancedSkeleton".to_string(), "iPi".to_string()]
        );
        assert_eq!(
            store.list_names(MappingKind::ControlRig).unwrap(),
            vec!["AdvancedSkeleton".to_string()]
        );
    }

    #[test]
    fn test_list_names_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("absent"));
        assert!(store.list_names(MappingKind::Skeleton).unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.sk.json"), "{not json").unwrap();
        let store = MappingStore::new(dir.path());
        let err = store.load("bad", MappingKind::Skeleton).unwrap_err();
        assert!(matches!(err, MappingError::ParseFailed { .. }));
        assert!(err.to_string().contains("bad.sk.json"));
    }

    #[test]
    fn test_rejects_path_names() {
        let store = MappingStore::new("mappings");
        assert!(store.path_for("../x", MappingKind::Skeleton).is_err());
        assert!(store.path_for("", MappingKind::Skeleton).is_err());
    }

    #[test]
    fn test_load_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path());
        store.save(&sample(), "rig", MappingKind::Skeleton).unwrap();
        let controls = JointMapping::new().with("RootX_M", 1).with("IKLeg_L", 4);
        store.save(&controls, "rig", MappingKind::ControlRig).unwrap();

        let set = store.load_set("rig").unwrap();
        assert_eq!(set.skeleton, sample());
        assert_eq!(set.controls, controls);
    }
}
