//! Skeleton mapper: binds scene joints to definition slots.

use rigbake_mapping::{JointMapping, SlotId};
use serde::Serialize;
use serde_json::json;

use crate::definition::{self, Definition};
use crate::error::{HikResult, HostResult};
use crate::namespace::Namespace;
use crate::outcome::{EntryOutcome, EntryStatus, MappingReport};
use crate::scene::Scene;

/// Draw style that hides a joint.
const HIDDEN_DRAW_STYLE: i64 = 2;

const ROTATE_ATTRS: [&str; 3] = ["rotateX", "rotateY", "rotateZ"];

/// Which side of the retarget a skeleton is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonRole {
    /// The mocap performance.
    Source,
    /// The rig being driven. Bound joints are hidden.
    Destination,
}

/// A characterized skeleton.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Characterization {
    pub definition: Definition,
    pub report: MappingReport,
}

/// Binds every mapped joint to its slot on `definition`.
///
/// Entries are independent: a missing joint or a rejected binding is
/// recorded and the rest continue. The definition must be unlocked.
pub fn map_skeleton(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
    mapping: &JointMapping,
    definition: &str,
    role: SkeletonRole,
) -> MappingReport {
    let mut report = MappingReport::new();
    for entry in mapping {
        let node = namespace.qualify(&entry.name);
        let status = bind_joint(scene, &node, definition, entry.slot, role);
        report.record(EntryOutcome::new(&entry.name, &node, entry.slot, status));
    }
    report
}

fn bind_joint(
    scene: &mut Scene<'_>,
    node: &str,
    definition: &str,
    slot: SlotId,
    role: SkeletonRole,
) -> EntryStatus {
    match scene.exists(node) {
        Ok(true) => {}
        Ok(false) => return EntryStatus::NotFound,
        Err(e) => return EntryStatus::Rejected(e.to_string()),
    }
    if let Err(e) = scene.set_character_object(node, definition, slot) {
        return EntryStatus::Rejected(e.to_string());
    }
    if role == SkeletonRole::Destination {
        let plug = format!("{}.drawStyle", node);
        if let Err(e) = scene.set_attribute(&plug, json!(HIDDEN_DRAW_STYLE)) {
            log::debug!("could not hide {}: {}", node, e);
        }
    }
    EntryStatus::Bound
}

/// Characterizes a skeleton from start to lock.
///
/// Moves to `start_frame`, resolves or creates the definition (an existing
/// one is made current and unlocked), binds the joints, then locks. The
/// selection is restored afterwards.
pub fn characterize(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
    mapping: &JointMapping,
    role: SkeletonRole,
    base_name: &str,
    start_frame: f64,
) -> HikResult<Characterization> {
    scene.set_current_time(start_frame)?;
    scene.preserve_selection(|scene| -> HikResult<Characterization> {
        let definition = definition::resolve_or_create(scene, namespace, mapping, base_name)?;
        if !definition.created {
            scene.set_current_character(&definition.name)?;
            definition::unlock(scene, &definition.name)?;
        }
        let report = map_skeleton(scene, namespace, mapping, &definition.name, role);
        definition::lock(scene, &definition.name)?;
        log::info!(
            "characterized {} into {} ({} bound, {} missing or rejected)",
            namespace,
            definition.name,
            report.bound_count(),
            report.failure_count()
        );
        Ok(Characterization { definition, report })
    })?
}

/// Sets rotateX/Y/Z to zero on every mapped joint present in the scene.
pub fn zero_rotations(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
    mapping: &JointMapping,
) -> MappingReport {
    apply_to_rotations(scene, namespace, mapping, |scene, plug| {
        scene.set_attribute(plug, json!(0.0))
    })
}

/// Keys rotateX/Y/Z at the current time on every mapped joint present.
pub fn key_rotations(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
    mapping: &JointMapping,
) -> MappingReport {
    apply_to_rotations(scene, namespace, mapping, |scene, plug| scene.set_keyframe(plug))
}

fn apply_to_rotations<F>(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
    mapping: &JointMapping,
    mut op: F,
) -> MappingReport
where
    F: FnMut(&mut Scene<'_>, &str) -> HostResult<()>,
{
    let mut report = MappingReport::new();
    for entry in mapping {
        let node = namespace.qualify(&entry.name);
        let status = match scene.exists(&node) {
            Ok(false) => EntryStatus::NotFound,
            Err(e) => EntryStatus::Rejected(e.to_string()),
            Ok(true) => ROTATE_ATTRS
                .iter()
                .map(|attr| op(scene, &format!("{}.{}", node, attr)))
                .find_map(Result::err)
                .map(|e| EntryStatus::Rejected(e.to_string()))
                .unwrap_or(EntryStatus::Bound),
        };
        report.record(EntryOutcome::new(&entry.name, &node, entry.slot, status));
    }
    report
}
