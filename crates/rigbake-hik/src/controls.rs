//! Control mapper: drives rig animation controls from the destination
//! definition through its control-rig retargeter.

use rigbake_mapping::{JointMapping, SlotId};

use crate::definition;
use crate::error::{HikResult, HostResult};
use crate::namespace::Namespace;
use crate::outcome::{Channel, ChannelOutcome, ChannelStatus, EntryOutcome, EntryStatus, MappingReport};
use crate::scene::Scene;

/// Name marker of rotation-only controls.
pub const ROTATION_ONLY_MARKER: &str = "FK";

/// Returns true if a control only takes a rotation channel.
pub fn is_rotation_only(control: &str) -> bool {
    control.contains(ROTATION_ONLY_MARKER)
}

/// Ensures the retargeter of `definition` exists and returns its name.
///
/// An existing retargeter is kept with its mappings.
pub fn ensure_retargeter(scene: &mut Scene<'_>, definition: &str) -> HostResult<String> {
    let existing = scene.retargeter_name(definition)?;
    if scene.retargeter_exists(&existing)? {
        log::debug!("reusing retargeter {}", existing);
        return Ok(existing);
    }
    scene.create_retargeter(definition)?;
    let created = scene.retargeter_name(definition)?;
    log::info!("created retargeter {} for {}", created, definition);
    Ok(created)
}

/// Binds every mapped control to the destination definition's retargeter.
///
/// Locks the definition and creates the retargeter if needed. Each control
/// gets a rotation channel, plus a translation channel unless it is
/// rotation-only. Channels whose attribute is locked are left alone.
/// Failing controls are recorded and the rest continue.
pub fn map_controls(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
    controls: &JointMapping,
    definition: &str,
) -> HikResult<MappingReport> {
    definition::lock(scene, definition)?;
    let retargeter = ensure_retargeter(scene, definition)?;

    let mut report = MappingReport::new();
    for entry in controls {
        let node = namespace.qualify(&entry.name);
        let outcome = match scene.exists(&node) {
            Ok(true) => bind_control(scene, &retargeter, definition, &entry.name, &node, entry.slot),
            Ok(false) => EntryOutcome::new(&entry.name, &node, entry.slot, EntryStatus::NotFound),
            Err(e) => EntryOutcome::new(
                &entry.name,
                &node,
                entry.slot,
                EntryStatus::Rejected(e.to_string()),
            ),
        };
        report.record(outcome);
    }
    log::info!(
        "mapped controls of {} ({} bound, {} missing or rejected)",
        namespace,
        report.bound_count(),
        report.failure_count()
    );
    Ok(report)
}

fn bind_control(
    scene: &mut Scene<'_>,
    retargeter: &str,
    definition: &str,
    name: &str,
    node: &str,
    slot: SlotId,
) -> EntryOutcome {
    let mut outcome = EntryOutcome::new(name, node, slot, EntryStatus::Bound);
    match map_channels(scene, retargeter, definition, name, node, slot) {
        Ok(channels) => {
            if !channels.iter().any(|c| c.status == ChannelStatus::Mapped) {
                outcome.status = EntryStatus::Skipped("every channel is locked".to_string());
            }
            outcome.channels = channels;
        }
        Err(e) => outcome.status = EntryStatus::Rejected(e.to_string()),
    }
    outcome
}

fn map_channels(
    scene: &mut Scene<'_>,
    retargeter: &str,
    definition: &str,
    name: &str,
    node: &str,
    slot: SlotId,
) -> HostResult<Vec<ChannelOutcome>> {
    let body_part = scene.custom_rig_element_name(definition, slot)?;
    let mut channels = Vec::with_capacity(2);
    for channel in [Channel::Rotate, Channel::Translate] {
        let status = if channel == Channel::Translate && is_rotation_only(name) {
            ChannelStatus::RotationOnly
        } else if scene.is_locked(node, channel.attribute())? {
            log::debug!("{}.{} is locked, skipping", node, channel.attribute());
            ChannelStatus::Locked
        } else {
            scene.add_retargeter_mapping(retargeter, &body_part, channel, node, slot)?;
            ChannelStatus::Mapped
        };
        channels.push(ChannelOutcome { channel, status });
    }
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeHost;
    use crate::host::{Command, Host};
    use pretty_assertions::assert_eq;

    fn host_with_definition() -> FakeHost {
        let mut host = FakeHost::new();
        host.run_command(&Command::new("hikCreateCharacter").arg("Rig1"))
            .unwrap();
        host
    }

    fn channels_of(host: &FakeHost, node: &str) -> Vec<String> {
        host.retargeter("Rig1")
            .map(|r| {
                r.mappings
                    .iter()
                    .filter(|m| m.node == node)
                    .map(|m| m.channel.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_missing_control_is_a_warning() {
        let mut host = host_with_definition();
        host.add_control("rig:RootX_M");
        let controls = JointMapping::new().with("RootX_M", 1).with("IKLeg_L", 4);
        let mut scene = Scene::new(&mut host);
        let report = map_controls(&mut scene, &Namespace::new("rig"), &controls, "Rig1").unwrap();

        assert!(report.get("RootX_M").unwrap().is_bound());
        assert_eq!(report.warnings(), vec!["rig:IKLeg_L not found".to_string()]);
        drop(scene);
        assert!(host.is_definition_locked("Rig1"));
        assert_eq!(channels_of(&host, "rig:RootX_M"), vec!["R", "T"]);
    }

    #[test]
    fn test_fk_controls_get_rotation_only() {
        let mut host = host_with_definition();
        host.add_control("FKShoulder_L").add_control("FKElbow_L");
        let controls = JointMapping::new().with("FKShoulder_L", 9).with("FKElbow_L", 10);
        let mut scene = Scene::new(&mut host);
        let report = map_controls(&mut scene, &Namespace::root(), &controls, "Rig1").unwrap();

        let outcome = report.get("FKShoulder_L").unwrap();
        assert_eq!(outcome.channel(Channel::Rotate), Some(ChannelStatus::Mapped));
        assert_eq!(
            outcome.channel(Channel::Translate),
            Some(ChannelStatus::RotationOnly)
        );
        drop(scene);
        assert_eq!(channels_of(&host, "FKShoulder_L"), vec!["R"]);
        assert_eq!(channels_of(&host, "FKElbow_L"), vec!["R"]);
    }

    #[test]
    fn test_locked_channels_are_skipped() {
        let mut host = host_with_definition();
        host.add_control("IKLeg_L")
            .lock_attribute("IKLeg_L.rotateY")
            .add_control("RootX_M")
            .lock_attribute("RootX_M.translate")
            .add_control("Pole_L")
            .lock_attribute("Pole_L.rotate")
            .lock_attribute("Pole_L.translateZ");
        let controls = JointMapping::new()
            .with("IKLeg_L", 4)
            .with("RootX_M", 1)
            .with("Pole_L", 5);
        let mut scene = Scene::new(&mut host);
        let report = map_controls(&mut scene, &Namespace::root(), &controls, "Rig1").unwrap();

        assert_eq!(
            report.get("IKLeg_L").unwrap().channel(Channel::Rotate),
            Some(ChannelStatus::Locked)
        );
        assert_eq!(
            report.get("RootX_M").unwrap().channel(Channel::Translate),
            Some(ChannelStatus::Locked)
        );
        assert!(matches!(
            report.get("Pole_L").unwrap().status,
            EntryStatus::Skipped(_)
        ));
        assert!(report.is_complete());
        drop(scene);
        assert_eq!(channels_of(&host, "IKLeg_L"), vec!["T"]);
        assert_eq!(channels_of(&host, "RootX_M"), vec!["R"]);
        assert!(channels_of(&host, "Pole_L").is_empty());
    }

    #[test]
    fn test_rejection_names_the_control() {
        let mut host = host_with_definition();
        host.add_control("IKArm_R").reject_node("IKArm_R", "bad control");
        let controls = JointMapping::new().with("IKArm_R", 14);
        let mut scene = Scene::new(&mut host);
        let report = map_controls(&mut scene, &Namespace::root(), &controls, "Rig1").unwrap();
        let warnings = report.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("problem in mapping to IKArm_R: "));
    }

    #[test]
    fn test_existing_retargeter_is_kept() {
        let mut host = host_with_definition();
        host.add_control("RootX_M").add_control("Chest_M");
        let mut scene = Scene::new(&mut host);
        map_controls(
            &mut scene,
            &Namespace::root(),
            &JointMapping::new().with("RootX_M", 1),
            "Rig1",
        )
        .unwrap();
        map_controls(
            &mut scene,
            &Namespace::root(),
            &JointMapping::new().with("Chest_M", 8),
            "Rig1",
        )
        .unwrap();
        drop(scene);
        assert_eq!(host.command_count("RetargeterCreate"), 1);
        assert_eq!(channels_of(&host, "RootX_M"), vec!["R", "T"]);
        assert_eq!(channels_of(&host, "Chest_M"), vec!["R", "T"]);
    }
}
