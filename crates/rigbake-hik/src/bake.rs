//! Retarget linking, frame-range resolution, baking, and cleanup.

use rigbake_mapping::JointMapping;
use serde::Serialize;
use serde_json::{json, Value};

use crate::definition;
use crate::error::{HikResult, HostResult};
use crate::namespace::Namespace;
use crate::scene::{Direction, FrameRange, Scene};

/// Node type prefix matching every animation curve type.
pub const ANIM_CURVE_TYPE: &str = "animCurve";

/// Flags passed to the host's bake command.
///
/// The defaults sample the live solver on every frame, keep keys outside the
/// range, and write no layer or shape data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BakeOptions {
    pub simulation: bool,
    pub sample_by: i64,
    pub disable_implicit_control: bool,
    pub preserve_outside_keys: bool,
    pub sparse_anim_curve_bake: bool,
    pub remove_baked_attribute_from_layer: bool,
    pub remove_baked_anim_from_layer: bool,
    pub bake_on_override_layer: bool,
    pub minimize_rotation: bool,
    pub control_points: bool,
    pub shape: bool,
}

impl Default for BakeOptions {
    fn default() -> Self {
        Self {
            simulation: true,
            sample_by: 1,
            disable_implicit_control: true,
            preserve_outside_keys: true,
            sparse_anim_curve_bake: false,
            remove_baked_attribute_from_layer: false,
            remove_baked_anim_from_layer: false,
            bake_on_override_layer: false,
            minimize_rotation: true,
            control_points: false,
            shape: false,
        }
    }
}

impl BakeOptions {
    /// Behavior flags after `-simulation`, `-time` and `-sampleBy`, in
    /// command order.
    pub fn flags(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("disableImplicitControl", json!(self.disable_implicit_control)),
            ("preserveOutsideKeys", json!(self.preserve_outside_keys)),
            ("sparseAnimCurveBake", json!(self.sparse_anim_curve_bake)),
            (
                "removeBakedAttributeFromLayer",
                json!(self.remove_baked_attribute_from_layer),
            ),
            (
                "removeBakedAnimFromLayer",
                json!(self.remove_baked_anim_from_layer),
            ),
            ("bakeOnOverrideLayer", json!(self.bake_on_override_layer)),
            ("minimizeRotation", json!(self.minimize_rotation)),
            ("controlPoints", json!(self.control_points)),
            ("shape", json!(self.shape)),
        ]
    }
}

/// Makes `source` the live input of `destination`, locking both first.
pub fn link(scene: &mut Scene<'_>, destination: &str, source: &str) -> HostResult<()> {
    definition::lock(scene, source)?;
    definition::lock(scene, destination)?;
    scene.set_current_character(destination)?;
    scene.set_character_input(destination, source)?;
    log::info!("linked {} -> {}", source, destination);
    Ok(())
}

/// Frame range of the animation on `mocap_root`.
///
/// Spans the earliest first key to the latest last key over every curve
/// driving the root. Without keyed curves the playback range is returned
/// unchanged.
pub fn anim_range(scene: &mut Scene<'_>, mocap_root: &str) -> HostResult<FrameRange> {
    let curves = scene.list_connections(mocap_root, Direction::Incoming, Some(ANIM_CURVE_TYPE))?;
    let mut range: Option<FrameRange> = None;
    for curve in &curves {
        let times = scene.keyframe_times(curve)?;
        let (Some(first), Some(last)) = (times.first().copied(), times.last().copied()) else {
            continue;
        };
        range = Some(match range {
            Some(r) => FrameRange::new(r.start.min(first), r.end.max(last)),
            None => FrameRange::new(first, last),
        });
    }
    match range {
        Some(range) => Ok(range),
        None => {
            log::info!("{} has no keys, using the playback range", mocap_root);
            scene.playback_range()
        }
    }
}

/// Bake targets: the mapped controls present in the scene.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControlSelection {
    /// Qualified controls found, in mapping order.
    pub nodes: Vec<String>,
    /// Qualified controls not in the scene.
    pub missing: Vec<String>,
}

impl ControlSelection {
    /// Warning text for every missing control.
    pub fn warnings(&self) -> Vec<String> {
        self.missing
            .iter()
            .map(|node| format!("{} not found", node))
            .collect()
    }
}

/// Selects the mapped controls present in the scene.
pub fn select_controls(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
    controls: &JointMapping,
) -> HostResult<ControlSelection> {
    let mut selection = ControlSelection::default();
    for name in controls.names() {
        let node = namespace.qualify(name);
        if scene.exists(&node)? {
            selection.nodes.push(node);
        } else {
            log::warn!("{} not found", node);
            selection.missing.push(node);
        }
    }
    scene.select(&selection.nodes)?;
    Ok(selection)
}

/// Bakes the solved animation onto `nodes` over `range`.
///
/// The playback range is set to `range` first. Nothing is baked when
/// `nodes` is empty.
pub fn bake(
    scene: &mut Scene<'_>,
    nodes: &[String],
    range: FrameRange,
    options: &BakeOptions,
) -> HikResult<()> {
    scene.set_playback_range(range)?;
    if nodes.is_empty() {
        log::warn!("no controls to bake");
        return Ok(());
    }
    scene.bake_results(nodes, range, options)?;
    log::info!(
        "baked {} controls over {}..{}",
        nodes.len(),
        range.start,
        range.end
    );
    Ok(())
}

/// What cleanup deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub retargeters: Vec<String>,
    pub definitions: Vec<String>,
    pub mocap_root: Option<String>,
}

impl CleanupReport {
    /// Returns true if nothing was left to delete.
    pub fn is_empty(&self) -> bool {
        self.retargeters.is_empty() && self.definitions.is_empty() && self.mocap_root.is_none()
    }
}

/// Removes retarget scaffolding: each definition's retargeter, the
/// definitions, then the mocap hierarchy. Anything already gone is skipped.
pub fn cleanup(
    scene: &mut Scene<'_>,
    definitions: &[&str],
    mocap_root: Option<&str>,
) -> HostResult<CleanupReport> {
    let mut report = CleanupReport::default();

    for definition in definitions {
        if !scene.exists(definition)? {
            continue;
        }
        let retargeter = scene.retargeter_name(definition)?;
        if scene.retargeter_exists(&retargeter)? {
            scene.delete_retargeter(&retargeter)?;
            report.retargeters.push(retargeter);
        }
    }

    for definition in definitions {
        if scene.exists(definition)? {
            scene.delete(&[definition.to_string()])?;
            report.definitions.push(definition.to_string());
        }
    }

    if let Some(root) = mocap_root {
        if scene.exists(root)? {
            scene.delete(&[root.to_string()])?;
            report.mocap_root = Some(root.to_string());
        }
    }

    log::info!(
        "cleanup removed {} retargeters, {} definitions{}",
        report.retargeters.len(),
        report.definitions.len(),
        if report.mocap_root.is_some() { " and the mocap skeleton" } else { "" }
    );
    Ok(report)
}
