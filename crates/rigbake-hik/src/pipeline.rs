//! The full mocap-to-rig retarget operation.
//!
//! [`apply`] walks the stages of [`RetargetStage`] in order. Fatal problems
//! (no mocap path, missing mocap root, no rig namespace) abort with an
//! error and leave completed steps in the scene. Individual joints and
//! controls that fail to bind only produce warnings in the summary.

use rigbake_mapping::{MappingKind, MappingStore};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::bake::{self, BakeOptions, CleanupReport, ControlSelection};
use crate::controls;
use crate::coverage;
use crate::definition::{MOCAP_DEFINITION_BASE, RIG_DEFINITION_BASE};
use crate::error::{HikError, HikResult};
use crate::namespace::{self, Namespace};
use crate::outcome::MappingReport;
use crate::scene::{FrameRange, Scene};
use crate::skeleton::{self, Characterization, SkeletonRole};

/// Default mocap skeleton mapping.
pub const DEFAULT_MOCAP_MAPPING: &str = "iPi";

/// Default rig skeleton and control mapping.
pub const DEFAULT_RIG_MAPPING: &str = "AdvancedSkeleton";

/// Asks the user for a file path.
pub trait PathPrompt {
    /// Returns the chosen path, or `None` if the user declined.
    fn prompt_path(&mut self, title: &str) -> Option<PathBuf>;
}

/// Progress of a retarget operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetargetStage {
    Start,
    MappingsLoaded,
    MocapImported,
    MocapCharacterized,
    RigCharacterized,
    ControlsMapped,
    Linked,
    RangeResolved,
    Baked,
    CleanedUp,
}

impl RetargetStage {
    /// Returns the string identifier for this stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            RetargetStage::Start => "START",
            RetargetStage::MappingsLoaded => "MAPPINGS_LOADED",
            RetargetStage::MocapImported => "MOCAP_IMPORTED",
            RetargetStage::MocapCharacterized => "MOCAP_CHARACTERIZED",
            RetargetStage::RigCharacterized => "RIG_CHARACTERIZED",
            RetargetStage::ControlsMapped => "CONTROLS_MAPPED",
            RetargetStage::Linked => "LINKED",
            RetargetStage::RangeResolved => "RANGE_RESOLVED",
            RetargetStage::Baked => "BAKED",
            RetargetStage::CleanedUp => "CLEANED_UP",
        }
    }
}

impl fmt::Display for RetargetStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one retarget operation.
#[derive(Debug, Clone)]
pub struct RetargetRequest {
    /// Mocap file to import. Prompted for when absent.
    pub mocap_path: Option<PathBuf>,
    /// Namespace of the rig already in the scene.
    pub rig_namespace: Option<String>,
    /// Rig file to reference (or reuse if already referenced).
    pub rig_path: Option<PathBuf>,
    /// Skeleton mapping of the mocap.
    pub mocap_mapping: String,
    /// Skeleton and control mapping of the rig.
    pub rig_mapping: String,
    /// Frame characterization happens on.
    pub start_frame: f64,
    /// Base name of the mocap definition.
    pub mocap_definition: String,
    /// Base name of the rig definition.
    pub rig_definition: String,
    /// Whether to bake onto the controls.
    pub bake: bool,
    /// Whether to remove definitions and mocap after baking.
    pub cleanup: bool,
    /// Bake command flags.
    pub bake_options: BakeOptions,
}

impl Default for RetargetRequest {
    fn default() -> Self {
        Self {
            mocap_path: None,
            rig_namespace: None,
            rig_path: None,
            mocap_mapping: DEFAULT_MOCAP_MAPPING.to_string(),
            rig_mapping: DEFAULT_RIG_MAPPING.to_string(),
            start_frame: 0.0,
            mocap_definition: MOCAP_DEFINITION_BASE.to_string(),
            rig_definition: RIG_DEFINITION_BASE.to_string(),
            bake: true,
            cleanup: true,
            bake_options: BakeOptions::default(),
        }
    }
}

impl RetargetRequest {
    /// Creates a request for a mocap file with default mappings.
    pub fn new(mocap_path: impl Into<PathBuf>) -> Self {
        Self {
            mocap_path: Some(mocap_path.into()),
            ..Default::default()
        }
    }

    /// Sets the rig namespace.
    pub fn rig_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.rig_namespace = Some(namespace.into());
        self
    }

    /// Sets the rig file.
    pub fn rig_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rig_path = Some(path.into());
        self
    }

    /// Sets the mocap skeleton mapping name.
    pub fn mocap_mapping(mut self, name: impl Into<String>) -> Self {
        self.mocap_mapping = name.into();
        self
    }

    /// Sets the rig mapping name.
    pub fn rig_mapping(mut self, name: impl Into<String>) -> Self {
        self.rig_mapping = name.into();
        self
    }

    /// Sets the start frame.
    pub fn start_frame(mut self, frame: f64) -> Self {
        self.start_frame = frame;
        self
    }

    /// Enables or disables baking.
    pub fn bake(mut self, bake: bool) -> Self {
        self.bake = bake;
        self
    }

    /// Enables or disables cleanup after baking.
    pub fn cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }
}

/// Result of a retarget operation that ran to its last requested stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetargetSummary {
    /// Every stage reached, in order.
    pub stages: Vec<RetargetStage>,
    pub mocap_namespace: Namespace,
    pub rig_namespace: Namespace,
    pub mocap_root: String,
    pub mocap: Characterization,
    pub rig: Characterization,
    pub controls: MappingReport,
    pub range: FrameRange,
    /// Present when baking ran.
    pub baked: Option<ControlSelection>,
    /// Present when cleanup ran.
    pub cleanup: Option<CleanupReport>,
}

impl RetargetSummary {
    /// Last stage reached.
    pub fn stage(&self) -> RetargetStage {
        self.stages.last().copied().unwrap_or(RetargetStage::Start)
    }

    /// Every non-fatal warning, in the order it arose.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = self.mocap.report.warnings();
        warnings.extend(self.rig.report.warnings());
        warnings.extend(self.controls.warnings());
        if let Some(selection) = &self.baked {
            warnings.extend(selection.warnings());
        }
        warnings
    }
}

struct StageLog(Vec<RetargetStage>);

impl StageLog {
    fn new() -> Self {
        log::info!("retarget stage {}", RetargetStage::Start);
        Self(vec![RetargetStage::Start])
    }

    fn reach(&mut self, stage: RetargetStage) {
        log::info!("retarget stage {}", stage);
        self.0.push(stage);
    }
}

/// Resolves the rig namespace: explicit value, then the rig file's
/// reference, then the first selected node.
pub fn resolve_rig_namespace(
    scene: &mut Scene<'_>,
    request: &RetargetRequest,
) -> HikResult<Namespace> {
    if let Some(namespace) = &request.rig_namespace {
        return Ok(Namespace::new(namespace));
    }
    if let Some(path) = &request.rig_path {
        return namespace::reference_rig(scene, path);
    }
    namespace::namespace_from_selection(scene)
}

/// Resolves the mocap path, prompting when the request has none.
///
/// Without a prompt a missing path is an error; a declined prompt cancels.
pub fn resolve_mocap_path(
    request: &RetargetRequest,
    prompt: Option<&mut dyn PathPrompt>,
) -> HikResult<PathBuf> {
    let path = match (&request.mocap_path, prompt) {
        (Some(path), _) => path.clone(),
        (None, Some(prompt)) => prompt
            .prompt_path("Mocap Skeleton Path")
            .ok_or(HikError::Cancelled)?,
        (None, None) => return Err(HikError::MocapPathMissing),
    };
    check_mocap_path(&path)?;
    Ok(path)
}

fn check_mocap_path(path: &Path) -> HikResult<()> {
    if path.as_os_str().is_empty() {
        return Err(HikError::MocapPathMissing);
    }
    if !path.exists() {
        return Err(HikError::MocapPathNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Imports the mocap under a namespace named after the file.
pub fn import_mocap(scene: &mut Scene<'_>, path: &Path) -> HikResult<Namespace> {
    let namespace = namespace::namespace_for_file(path);
    scene.import_file(path, &namespace)?;
    log::info!("imported mocap {} as {}", path.display(), namespace);
    Ok(namespace)
}

/// Retargets a mocap file onto a rig and bakes the result.
pub fn apply(
    scene: &mut Scene<'_>,
    store: &MappingStore,
    request: &RetargetRequest,
    prompt: Option<&mut dyn PathPrompt>,
) -> HikResult<RetargetSummary> {
    let mut stages = StageLog::new();

    let mocap_skeleton = store.load(&request.mocap_mapping, MappingKind::Skeleton)?;
    let rig_mappings = store.load_set(&request.rig_mapping)?;
    let mocap_root_name = mocap_skeleton
        .root()
        .ok_or_else(|| HikError::RootUndefined {
            mapping: request.mocap_mapping.clone(),
        })?
        .to_string();
    stages.reach(RetargetStage::MappingsLoaded);

    let mocap_path = resolve_mocap_path(request, prompt)?;
    let rig_namespace = resolve_rig_namespace(scene, request)?;

    scene.set_current_time(request.start_frame)?;
    let mocap_namespace = import_mocap(scene, &mocap_path)?;
    let mocap_root = coverage::find_mapping_root(scene, &mocap_skeleton, &mocap_namespace)?
        .ok_or_else(|| HikError::MocapRootNotFound {
            node: mocap_namespace.qualify(&mocap_root_name),
        })?;
    let imported_range = bake::anim_range(scene, &mocap_root)?;
    scene.set_playback_range(imported_range)?;
    stages.reach(RetargetStage::MocapImported);

    let mocap = skeleton::characterize(
        scene,
        &mocap_namespace,
        &mocap_skeleton,
        SkeletonRole::Source,
        &request.mocap_definition,
        request.start_frame,
    )?;
    stages.reach(RetargetStage::MocapCharacterized);

    let rig = skeleton::characterize(
        scene,
        &rig_namespace,
        &rig_mappings.skeleton,
        SkeletonRole::Destination,
        &request.rig_definition,
        request.start_frame,
    )?;
    stages.reach(RetargetStage::RigCharacterized);

    let controls = controls::map_controls(
        scene,
        &rig_namespace,
        &rig_mappings.controls,
        &rig.definition.name,
    )?;
    stages.reach(RetargetStage::ControlsMapped);

    bake::link(scene, &rig.definition.name, &mocap.definition.name)?;
    stages.reach(RetargetStage::Linked);

    let range = bake::anim_range(scene, &mocap_root)?;
    stages.reach(RetargetStage::RangeResolved);

    let mut baked = None;
    let mut cleanup = None;
    if request.bake {
        let selection = bake::select_controls(scene, &rig_namespace, &rig_mappings.controls)?;
        bake::bake(scene, &selection.nodes, range, &request.bake_options)?;
        baked = Some(selection);
        stages.reach(RetargetStage::Baked);

        if request.cleanup {
            cleanup = Some(bake::cleanup(
                scene,
                &[mocap.definition.name.as_str(), rig.definition.name.as_str()],
                Some(mocap_root.as_str()),
            )?);
            stages.reach(RetargetStage::CleanedUp);
        }
    }

    Ok(RetargetSummary {
        stages: stages.0,
        mocap_namespace,
        rig_namespace,
        mocap_root,
        mocap,
        rig,
        controls,
        range,
        baked,
        cleanup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeAsset, FakeHost};
    use rigbake_mapping::JointMapping;

    struct Declined;

    impl PathPrompt for Declined {
        fn prompt_path(&mut self, _title: &str) -> Option<PathBuf> {
            None
        }
    }

    struct Answer(PathBuf);

    impl PathPrompt for Answer {
        fn prompt_path(&mut self, _title: &str) -> Option<PathBuf> {
            Some(self.0.clone())
        }
    }

    struct Setup {
        _dir: tempfile::TempDir,
        store: MappingStore,
        mocap_path: PathBuf,
    }

    fn setup(host: &mut FakeHost) -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::new(dir.path().join("mappings"));
        store
            .save(
                &JointMapping::new().with("Hip", 1).with("LThigh", 2),
                DEFAULT_MOCAP_MAPPING,
                MappingKind::Skeleton,
            )
            .unwrap();
        store
            .save(
                &JointMapping::new().with("Root_M", 1).with("Hip_L", 2),
                DEFAULT_RIG_MAPPING,
                MappingKind::Skeleton,
            )
            .unwrap();
        store
            .save(
                &JointMapping::new()
                    .with("RootX_M", 1)
                    .with("IKLeg_L", 4)
                    .with("FKHip_L", 2),
                DEFAULT_RIG_MAPPING,
                MappingKind::ControlRig,
            )
            .unwrap();

        let mocap_path = dir.path().join("walk.fbx");
        std::fs::write(&mocap_path, "").unwrap();
        host.register_file(
            &mocap_path.to_string_lossy(),
            FakeAsset::new()
                .joint("Hip")
                .child_joint("LThigh", "Hip")
                .keys("Hip", "rotateX", &[1.0, 48.0]),
        );
        host.add_joint("rig:Root_M")
            .add_joint("rig:Hip_L")
            .add_control("rig:RootX_M")
            .add_control("rig:FKHip_L")
            .set_selection(&["rig:RootX_M"]);

        Setup {
            _dir: dir,
            store,
            mocap_path,
        }
    }

    #[test]
    fn test_full_run_reaches_cleanup() {
        let mut host = FakeHost::new();
        let setup = setup(&mut host);
        let request = RetargetRequest::new(&setup.mocap_path);
        let mut scene = Scene::new(&mut host);
        let summary = apply(&mut scene, &setup.store, &request, None).unwrap();

        assert_eq!(summary.stage(), RetargetStage::CleanedUp);
        assert_eq!(summary.stages.len(), 10);
        assert_eq!(summary.rig_namespace.as_str(), "rig:");
        assert_eq!(summary.mocap_namespace.as_str(), "walk:");
        assert_eq!(summary.range, FrameRange::new(1.0, 48.0));
        assert_eq!(summary.warnings(), vec![
            "rig:IKLeg_L not found".to_string(),
            "rig:IKLeg_L not found".to_string(),
        ]);
        drop(scene);

        let bake = &host.bakes()[0];
        assert_eq!(
            bake.nodes,
            vec!["rig:RootX_M".to_string(), "rig:FKHip_L".to_string()]
        );
        assert!(host.definitions().is_empty());
        assert!(host.node("walk:Hip").is_none());
    }

    #[test]
    fn test_without_bake_keeps_scaffolding() {
        let mut host = FakeHost::new();
        let setup = setup(&mut host);
        let request = RetargetRequest::new(&setup.mocap_path).bake(false);
        let mut scene = Scene::new(&mut host);
        let summary = apply(&mut scene, &setup.store, &request, None).unwrap();
        assert_eq!(summary.stage(), RetargetStage::RangeResolved);
        drop(scene);
        assert!(host.bakes().is_empty());
        assert_eq!(host.definitions().len(), 2);
        assert_eq!(
            host.character_input(&summary.rig.definition.name),
            Some(summary.mocap.definition.name.as_str())
        );
    }

    #[test]
    fn test_declined_prompt_cancels_before_mutation() {
        let mut host = FakeHost::new();
        let setup = setup(&mut host);
        let request = RetargetRequest::default();
        let mut scene = Scene::new(&mut host);
        let err = apply(&mut scene, &setup.store, &request, Some(&mut Declined)).unwrap_err();
        assert!(err.is_cancelled());
        drop(scene);
        assert!(host.commands().is_empty());
    }

    #[test]
    fn test_prompted_path_is_used() {
        let mut host = FakeHost::new();
        let setup = setup(&mut host);
        let request = RetargetRequest::default().cleanup(false);
        let mut prompt = Answer(setup.mocap_path.clone());
        let mut scene = Scene::new(&mut host);
        let summary = apply(&mut scene, &setup.store, &request, Some(&mut prompt)).unwrap();
        assert_eq!(summary.stage(), RetargetStage::Baked);
    }

    #[test]
    fn test_missing_path_without_prompt() {
        let mut host = FakeHost::new();
        let setup = setup(&mut host);
        let mut scene = Scene::new(&mut host);
        let err = apply(&mut scene, &setup.store, &RetargetRequest::default(), None).unwrap_err();
        assert!(matches!(err, HikError::MocapPathMissing));

        let request = RetargetRequest::new(setup.mocap_path.with_file_name("nope.fbx"));
        let err = apply(&mut scene, &setup.store, &request, None).unwrap_err();
        assert!(matches!(err, HikError::MocapPathNotFound { .. }));
    }

    #[test]
    fn test_no_rig_namespace_is_fatal() {
        let mut host = FakeHost::new();
        let setup = setup(&mut host);
        host.set_selection(&[]);
        let mut scene = Scene::new(&mut host);
        let err = apply(&mut scene, &setup.store, &RetargetRequest::new(&setup.mocap_path), None)
            .unwrap_err();
        assert!(matches!(err, HikError::NoRigNamespace));
        drop(scene);
        assert_eq!(host.command_count("file"), 0);
    }

    #[test]
    fn test_missing_mocap_root_aborts_without_cleanup() {
        let mut host = FakeHost::new();
        let setup = setup(&mut host);
        host.register_file(
            &setup.mocap_path.to_string_lossy(),
            FakeAsset::new().joint("Pelvis"),
        );
        let mut scene = Scene::new(&mut host);
        let err = apply(&mut scene, &setup.store, &RetargetRequest::new(&setup.mocap_path), None)
            .unwrap_err();
        assert!(matches!(err, HikError::MocapRootNotFound { ref node } if node == "walk:Hip"));
        drop(scene);
        assert!(host.node("walk:Pelvis").is_some());
    }
}
