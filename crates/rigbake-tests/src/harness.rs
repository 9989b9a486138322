//! Test harness for running retargets against an in-memory scene.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use rigbake_hik::fake::{FakeAsset, FakeHost};
use rigbake_hik::{apply, HikResult, PathPrompt, RetargetRequest, RetargetSummary, Scene};

use crate::fixtures::MappingFixture;

/// A scene, the shipped mappings and a directory of takes.
pub struct RetargetHarness {
    /// The in-memory scene.
    pub host: FakeHost,
    /// Mapping files the retarget loads.
    pub mappings: MappingFixture,
    /// Directory holding mocap files on disk.
    pub takes: TempDir,
}

impl RetargetHarness {
    /// Create a harness with an empty scene and the shipped mappings.
    pub fn new() -> Self {
        Self::with_mappings(MappingFixture::new())
    }

    /// Create a harness around a prepared mapping fixture.
    pub fn with_mappings(mappings: MappingFixture) -> Self {
        Self {
            host: FakeHost::new(),
            mappings,
            takes: TempDir::new().expect("Failed to create takes dir"),
        }
    }

    /// Write `<name>.fbx` to disk and make it importable with `asset`.
    pub fn add_take(&mut self, name: &str, asset: FakeAsset) -> PathBuf {
        let path = self.takes.path().join(format!("{}.fbx", name));
        fs::write(&path, "").expect("Failed to write take");
        self.host.register_file(&path.to_string_lossy(), asset);
        path
    }

    /// Write `<name>.ma` to disk and make it referenceable with `asset`.
    pub fn add_rig_file(&mut self, name: &str, asset: FakeAsset) -> PathBuf {
        let path = self.takes.path().join(format!("{}.ma", name));
        fs::write(&path, "").expect("Failed to write rig file");
        self.host.register_file(&path.to_string_lossy(), asset);
        path
    }

    /// Put a rig in the scene under `namespace`.
    pub fn add_rig(&mut self, namespace: &str, asset: FakeAsset) {
        self.host.instantiate(&asset, namespace);
    }

    /// Select nodes in the scene.
    pub fn select(&mut self, nodes: &[&str]) {
        self.host.set_selection(nodes);
    }

    /// Borrow the scene.
    pub fn scene(&mut self) -> Scene<'_> {
        Scene::new(&mut self.host)
    }

    /// Run a retarget with no prompt.
    pub fn apply(&mut self, request: &RetargetRequest) -> HikResult<RetargetSummary> {
        let mut scene = Scene::new(&mut self.host);
        apply(&mut scene, &self.mappings.store, request, None)
    }

    /// Run a retarget that may prompt for the mocap path.
    pub fn apply_with_prompt(
        &mut self,
        request: &RetargetRequest,
        prompt: &mut dyn PathPrompt,
    ) -> HikResult<RetargetSummary> {
        let mut scene = Scene::new(&mut self.host);
        apply(&mut scene, &self.mappings.store, request, Some(prompt))
    }
}

impl Default for RetargetHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A prompt that always answers with the same path, or declines.
pub struct ScriptedPrompt {
    answer: Option<PathBuf>,
    /// Titles the prompt was shown with.
    pub asked: Vec<String>,
}

impl ScriptedPrompt {
    /// A prompt answering `path`.
    pub fn answering(path: impl Into<PathBuf>) -> Self {
        Self {
            answer: Some(path.into()),
            asked: Vec::new(),
        }
    }

    /// A prompt the user dismisses.
    pub fn declining() -> Self {
        Self {
            answer: None,
            asked: Vec::new(),
        }
    }
}

impl PathPrompt for ScriptedPrompt {
    fn prompt_path(&mut self, title: &str) -> Option<PathBuf> {
        self.asked.push(title.to_string());
        self.answer.clone()
    }
}
