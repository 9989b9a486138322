//! Namespaces and rig/mocap namespace resolution.

use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{HikError, HikResult};
use crate::scene::{ReferenceInfo, Scene};

/// Node type the host gives nodes from plug-ins it cannot load.
pub const UNKNOWN_NODE_TYPE: &str = "unknown";

/// Node-name prefix scoping one imported or referenced asset.
///
/// Always empty (root) or terminated by `:`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Namespace(String);

impl Namespace {
    /// The root namespace.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Normalizes `raw`: strips a leading `:` and guarantees a trailing one.
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim().trim_start_matches(':');
        if trimmed.is_empty() {
            Self::root()
        } else if trimmed.ends_with(':') {
            Self(trimmed.to_string())
        } else {
            Self(format!("{}:", trimmed))
        }
    }

    /// Namespace of a node name (everything up to the last `:`).
    pub fn of_node(node: &str) -> Self {
        match node.rfind(':') {
            Some(idx) => Self::new(&node[..=idx]),
            None => Self::root(),
        }
    }

    /// Strips every namespace from a node name.
    pub fn strip(node: &str) -> &str {
        node.rsplit(':').next().unwrap_or(node)
    }

    /// The prefix, including the trailing `:`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without the trailing `:`.
    pub fn name(&self) -> &str {
        self.0.trim_end_matches(':')
    }

    /// Returns true for the root namespace.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Prefixes a node name.
    pub fn qualify(&self, name: &str) -> String {
        format!("{}{}", self.0, name)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, ":")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Namespace an import or new reference of `path` is given: the file stem.
pub fn namespace_for_file(path: &Path) -> Namespace {
    Namespace::new(
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default(),
    )
}

/// Lexically normalizes a path for comparison: separators unified, `.` and
/// `..` resolved, case folded on Windows.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut parts: Vec<String> = Vec::new();
    let mut prefix = String::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Prefix(p) => prefix = p.as_os_str().to_string_lossy().to_string(),
            Component::RootDir => prefix.push('/'),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().map(|p| p != "..").unwrap_or(false) {
                    parts.pop();
                } else {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
        }
    }
    let normalized = format!("{}{}", prefix, parts.join("/"));
    if cfg!(windows) {
        normalized.to_lowercase()
    } else {
        normalized
    }
}

/// Finds the scene reference whose file is `path`.
pub fn find_reference(scene: &mut Scene<'_>, path: &Path) -> HikResult<Option<ReferenceInfo>> {
    let wanted = normalize_path(&path.to_string_lossy());
    Ok(scene
        .list_references()?
        .into_iter()
        .find(|r| normalize_path(&r.path) == wanted))
}

/// Namespace of the reference whose file is `path`.
pub fn namespace_for_reference_path(
    scene: &mut Scene<'_>,
    path: &Path,
) -> HikResult<Option<Namespace>> {
    Ok(find_reference(scene, path)?.map(|r| r.namespace))
}

/// File path of the reference loaded under `namespace`.
pub fn reference_path_for_namespace(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
) -> HikResult<Option<PathBuf>> {
    Ok(scene
        .list_references()?
        .into_iter()
        .find(|r| r.namespace == *namespace)
        .map(|r| PathBuf::from(r.path)))
}

/// Namespace of the first selected node.
pub fn namespace_from_selection(scene: &mut Scene<'_>) -> HikResult<Namespace> {
    let selection = scene.selection()?;
    let first = selection.first().ok_or(HikError::NoRigNamespace)?;
    Ok(Namespace::of_node(first))
}

/// Brings a rig into the scene: loads an existing reference of `path`, or
/// references it fresh under a namespace named after the file.
pub fn reference_rig(scene: &mut Scene<'_>, path: &Path) -> HikResult<Namespace> {
    if let Some(reference) = find_reference(scene, path)? {
        log::info!(
            "rig {} already referenced as {}",
            path.display(),
            reference.namespace
        );
        scene.load_reference(&reference.node)?;
        return Ok(reference.namespace);
    }

    if !path.exists() {
        return Err(HikError::RigPathNotFound {
            path: path.to_path_buf(),
        });
    }
    let namespace = namespace_for_file(path);
    scene.reference_file(path, &namespace)?;
    log::info!("referenced rig {} as {}", path.display(), namespace);
    Ok(namespace)
}

/// Result of turning a reference into imported scene nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedReference {
    /// Namespace the reference was loaded under.
    pub namespace: Namespace,
    /// True if that namespace was merged into the root.
    pub merged: bool,
    /// `unknown` nodes deleted afterwards.
    pub deleted_unknown: Vec<String>,
}

/// Imports the contents of the reference of `path` into the scene.
///
/// With `cleanup`, the reference namespace is merged into the root and every
/// `unknown` node is deleted. Returns `None` when `path` is not referenced.
pub fn import_reference_contents(
    scene: &mut Scene<'_>,
    path: &Path,
    cleanup: bool,
) -> HikResult<Option<ImportedReference>> {
    let Some(reference) = find_reference(scene, path)? else {
        log::warn!("{} is not referenced in the scene", path.display());
        return Ok(None);
    };
    scene.import_reference(&reference.path)?;
    log::info!("imported contents of {}", reference.path);

    let mut imported = ImportedReference {
        namespace: reference.namespace,
        merged: false,
        deleted_unknown: Vec::new(),
    };
    if !cleanup {
        return Ok(Some(imported));
    }
    if !imported.namespace.is_root() {
        scene.merge_namespace_into_root(&imported.namespace)?;
        imported.merged = true;
    }
    let unknown = scene.list_nodes_of_type(UNKNOWN_NODE_TYPE)?;
    if !unknown.is_empty() {
        scene.delete(&unknown)?;
        log::info!("deleted {} unknown nodes", unknown.len());
    }
    imported.deleted_unknown = unknown;
    Ok(Some(imported))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeAsset, FakeHost};

    #[test]
    fn test_normalization() {
        assert_eq!(Namespace::new("rig").as_str(), "rig:");
        assert_eq!(Namespace::new("rig:").as_str(), "rig:");
        assert_eq!(Namespace::new(":rig").as_str(), "rig:");
        assert_eq!(Namespace::new("").as_str(), "");
        assert_eq!(Namespace::new(":").as_str(), "");
        assert_eq!(Namespace::new("a:b").as_str(), "a:b:");
    }

    #[test]
    fn test_of_node_and_strip() {
        assert_eq!(Namespace::of_node("rig:IKLeg_L").as_str(), "rig:");
        assert_eq!(Namespace::of_node("a:b:Hip").as_str(), "a:b:");
        assert!(Namespace::of_node("Hip").is_root());
        assert_eq!(Namespace::strip("a:b:Hip"), "Hip");
        assert_eq!(Namespace::strip("Hip"), "Hip");
    }

    #[test]
    fn test_qualify() {
        assert_eq!(Namespace::new("take1").qualify("Hip"), "take1:Hip");
        assert_eq!(Namespace::root().qualify("Hip"), "Hip");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/a/./b/../c.ma"), "/a/c.ma");
        assert_eq!(normalize_path("/a//b/c.ma"), "/a/b/c.ma");
        assert_eq!(normalize_path("rel/x/../y.mb"), "rel/y.mb");
    }

    #[test]
    fn test_namespace_for_file() {
        assert_eq!(
            namespace_for_file(Path::new("/takes/walk_01.fbx")).as_str(),
            "walk_01:"
        );
    }

    #[test]
    fn test_namespace_from_selection() {
        let mut host = FakeHost::new();
        host.add_control("hero:RootX_M")
            .set_selection(&["hero:RootX_M"]);
        let mut scene = Scene::new(&mut host);
        assert_eq!(namespace_from_selection(&mut scene).unwrap().as_str(), "hero:");
    }

    #[test]
    fn test_namespace_from_empty_selection_is_fatal() {
        let mut host = FakeHost::new();
        let mut scene = Scene::new(&mut host);
        assert!(matches!(
            namespace_from_selection(&mut scene),
            Err(HikError::NoRigNamespace)
        ));
    }

    #[test]
    fn test_existing_reference_is_reused() {
        let mut host = FakeHost::new();
        host.add_reference(
            "/rigs/hero.ma",
            "hero",
            FakeAsset::new().control("RootX_M"),
        );
        let mut scene = Scene::new(&mut host);

        let ns = reference_rig(&mut scene, Path::new("/rigs/./hero.ma")).unwrap();
        assert_eq!(ns.as_str(), "hero:");
        assert_eq!(
            reference_path_for_namespace(&mut scene, &ns).unwrap(),
            Some(PathBuf::from("/rigs/hero.ma"))
        );
        drop(scene);
        assert_eq!(host.command_count("file"), 1);
        assert_eq!(host.nodes_of_type("reference").len(), 1);
    }

    #[test]
    fn test_new_reference_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let rig_path = dir.path().join("villain.ma");
        std::fs::write(&rig_path, "").unwrap();

        let mut host = FakeHost::new();
        host.register_file(
            &rig_path.to_string_lossy(),
            FakeAsset::new().control("RootX_M"),
        );
        let mut scene = Scene::new(&mut host);
        let ns = reference_rig(&mut scene, &rig_path).unwrap();
        assert_eq!(ns.as_str(), "villain:");
        drop(scene);
        assert!(host.node("villain:RootX_M").is_some());
    }

    fn hero_reference(host: &mut FakeHost) {
        host.add_reference(
            "/rigs/hero.ma",
            "hero",
            FakeAsset::new()
                .control("RootX_M")
                .control("IKLeg_L")
                .node("mayaUsdLayerManager1", UNKNOWN_NODE_TYPE),
        );
    }

    #[test]
    fn test_import_reference_contents_with_cleanup() {
        let mut host = FakeHost::new();
        hero_reference(&mut host);
        let mut scene = Scene::new(&mut host);

        let imported = import_reference_contents(&mut scene, Path::new("/rigs/hero.ma"), true)
            .unwrap()
            .unwrap();
        assert_eq!(imported.namespace.as_str(), "hero:");
        assert!(imported.merged);
        assert_eq!(imported.deleted_unknown, vec!["mayaUsdLayerManager1".to_string()]);
        assert!(find_reference(&mut scene, Path::new("/rigs/hero.ma")).unwrap().is_none());
        drop(scene);

        assert!(host.node("RootX_M").is_some());
        assert!(host.node("hero:RootX_M").is_none());
        assert!(host.nodes_of_type(UNKNOWN_NODE_TYPE).is_empty());
        assert!(host.reference_namespaces().is_empty());
    }

    #[test]
    fn test_import_reference_contents_keeps_namespace() {
        let mut host = FakeHost::new();
        hero_reference(&mut host);
        let mut scene = Scene::new(&mut host);

        let imported = import_reference_contents(&mut scene, Path::new("/rigs/hero.ma"), false)
            .unwrap()
            .unwrap();
        assert!(!imported.merged);
        assert!(imported.deleted_unknown.is_empty());
        drop(scene);

        assert!(host.node("hero:IKLeg_L").is_some());
        assert!(host.node("hero:mayaUsdLayerManager1").is_some());
        assert_eq!(host.command_count("namespace"), 0);
    }

    #[test]
    fn test_import_of_unreferenced_path_is_a_no_op() {
        let mut host = FakeHost::new();
        hero_reference(&mut host);
        let mut scene = Scene::new(&mut host);
        assert_eq!(
            import_reference_contents(&mut scene, Path::new("/rigs/villain.ma"), true).unwrap(),
            None
        );
        drop(scene);
        assert_eq!(host.reference_namespaces(), vec!["hero".to_string()]);
    }
}
