//! Test fixtures: the shipped mapping files and fake scene content matching them.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use rigbake_hik::fake::FakeAsset;
use rigbake_mapping::MappingStore;

/// iPi skeleton joints with their parents, root first.
pub const IPI_JOINTS: &[(&str, Option<&str>)] = &[
    ("Hip", None),
    ("LowerSpine", Some("Hip")),
    ("MiddleSpine", Some("LowerSpine")),
    ("Chest", Some("MiddleSpine")),
    ("Neck", Some("Chest")),
    ("Head", Some("Neck")),
    ("LClavicle", Some("Chest")),
    ("LShoulder", Some("LClavicle")),
    ("LForearm", Some("LShoulder")),
    ("LHand", Some("LForearm")),
    ("RClavicle", Some("Chest")),
    ("RShoulder", Some("RClavicle")),
    ("RForearm", Some("RShoulder")),
    ("RHand", Some("RForearm")),
    ("LThigh", Some("Hip")),
    ("LShin", Some("LThigh")),
    ("LFoot", Some("LShin")),
    ("LToe", Some("LFoot")),
    ("RThigh", Some("Hip")),
    ("RShin", Some("RThigh")),
    ("RFoot", Some("RShin")),
    ("RToe", Some("RFoot")),
];

/// AdvancedSkeleton deformation joints with their parents, root first.
pub const ADVANCED_SKELETON_JOINTS: &[(&str, Option<&str>)] = &[
    ("Root_M", None),
    ("Spine1_M", Some("Root_M")),
    ("Chest_M", Some("Spine1_M")),
    ("Neck_M", Some("Chest_M")),
    ("Head_M", Some("Neck_M")),
    ("Scapula_L", Some("Chest_M")),
    ("Shoulder_L", Some("Scapula_L")),
    ("Elbow_L", Some("Shoulder_L")),
    ("Wrist_L", Some("Elbow_L")),
    ("Scapula_R", Some("Chest_M")),
    ("Shoulder_R", Some("Scapula_R")),
    ("Elbow_R", Some("Shoulder_R")),
    ("Wrist_R", Some("Elbow_R")),
    ("Hip_L", Some("Root_M")),
    ("Knee_L", Some("Hip_L")),
    ("Ankle_L", Some("Knee_L")),
    ("Toes_L", Some("Ankle_L")),
    ("Hip_R", Some("Root_M")),
    ("Knee_R", Some("Hip_R")),
    ("Ankle_R", Some("Knee_R")),
    ("Toes_R", Some("Ankle_R")),
];

/// AdvancedSkeleton animation controls.
pub const ADVANCED_SKELETON_CONTROLS: &[&str] = &[
    "RootX_M",
    "FKHip_L",
    "FKKnee_L",
    "IKLeg_L",
    "FKHip_R",
    "FKKnee_R",
    "IKLeg_R",
    "FKSpine1_M",
    "FKShoulder_L",
    "FKElbow_L",
    "FKWrist_L",
    "FKShoulder_R",
    "FKElbow_R",
    "FKWrist_R",
    "FKHead_M",
    "FKToes_L",
    "FKToes_R",
    "FKScapula_L",
    "FKScapula_R",
    "FKNeck_M",
    "FKChest_M",
];

/// Directory of the mapping files shipped with the workspace.
pub fn shipped_mappings_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("mappings")
}

/// An iPi take: every joint except `missing`, with rotateX keys on the hip.
pub fn ipi_take(missing: &[&str], hip_keys: &[f64]) -> FakeAsset {
    let mut asset = skeleton_asset(IPI_JOINTS, missing);
    if !hip_keys.is_empty() && !missing.contains(&"Hip") {
        asset = asset.keys("Hip", "rotateX", hip_keys);
    }
    asset
}

/// An AdvancedSkeleton rig: every joint and control except `missing`.
pub fn advanced_skeleton_rig(missing: &[&str]) -> FakeAsset {
    let mut asset = skeleton_asset(ADVANCED_SKELETON_JOINTS, missing);
    for control in ADVANCED_SKELETON_CONTROLS {
        if !missing.contains(control) {
            asset = asset.control(control);
        }
    }
    asset
}

fn skeleton_asset(joints: &[(&str, Option<&str>)], missing: &[&str]) -> FakeAsset {
    joints
        .iter()
        .filter(|(name, _)| !missing.contains(name))
        .fold(FakeAsset::new(), |asset, (name, parent)| match parent {
            Some(parent) => asset.child_joint(name, parent),
            None => asset.joint(name),
        })
}

/// A writable copy of the shipped mapping directory.
pub struct MappingFixture {
    pub root: TempDir,
    pub store: MappingStore,
}

impl MappingFixture {
    /// Create a fixture holding every shipped mapping file.
    pub fn new() -> Self {
        let fixture = Self::empty();
        let entries = fs::read_dir(shipped_mappings_dir()).expect("Failed to read shipped mappings");
        for entry in entries {
            let path = entry.expect("Failed to read mapping entry").path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                let name = path.file_name().expect("mapping file has a name");
                fs::copy(&path, fixture.path().join(name)).expect("Failed to copy mapping");
            }
        }
        fixture
    }

    /// Create a fixture with no mapping files.
    pub fn empty() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let store = MappingStore::new(root.path());
        Self { root, store }
    }

    /// Get the mapping directory path.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Write a raw mapping file, e.g. `("broken.sk.json", "{")`.
    pub fn write_raw(&self, file_name: &str, content: &str) -> PathBuf {
        let path = self.path().join(file_name);
        fs::write(&path, content).expect("Failed to write mapping file");
        path
    }
}

impl Default for MappingFixture {
    fn default() -> Self {
        Self::new()
    }
}
