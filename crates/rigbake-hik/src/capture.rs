//! Authoring skeleton mappings from a characterized definition.

use rigbake_mapping::{JointMapping, MAX_NODE_ID, REFERENCE_SLOT};

use crate::error::HostResult;
use crate::namespace::Namespace;
use crate::scene::{Direction, Scene};

const JOINT_TYPE: &str = "joint";

/// Reads back which joint every slot of `definition` is bound to.
///
/// Joint names are stored without namespace, so the mapping applies to any
/// import of the same skeleton. The reference slot is never captured.
pub fn capture_mapping(scene: &mut Scene<'_>, definition: &str) -> HostResult<JointMapping> {
    let mut mapping = JointMapping::new();
    for slot in 0..MAX_NODE_ID {
        if slot == REFERENCE_SLOT {
            continue;
        }
        let Some(body_part) = scene.hik_node_name(slot)? else {
            continue;
        };
        let plug = format!("{}.{}", definition, body_part);
        let joints = scene.list_connections(&plug, Direction::Incoming, Some(JOINT_TYPE))?;
        if let Some(joint) = joints.first() {
            mapping.insert(Namespace::strip(joint), slot);
        }
    }
    log::info!("captured {} joints from {}", mapping.len(), definition);
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeHost;
    use crate::host::{Command, Host};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_capture_strips_namespaces() {
        let mut host = FakeHost::new();
        host.add_joint("take:Hip")
            .add_joint("take:LThigh")
            .add_joint("take:Head");
        host.run_command(&Command::new("hikCreateCharacter").arg("Mocap1"))
            .unwrap();
        for (joint, slot) in [("take:Hip", 1), ("take:LThigh", 2), ("take:Head", 15)] {
            host.run_command(
                &Command::new("setCharacterObject")
                    .arg(joint)
                    .arg("Mocap1")
                    .arg(slot)
                    .arg(0),
            )
            .unwrap();
        }

        let mut scene = Scene::new(&mut host);
        let mapping = capture_mapping(&mut scene, "Mocap1").unwrap();
        assert_eq!(
            mapping,
            JointMapping::new()
                .with("Hip", 1)
                .with("LThigh", 2)
                .with("Head", 15)
        );
    }

    #[test]
    fn test_capture_of_missing_definition_fails() {
        let mut host = FakeHost::new();
        let mut scene = Scene::new(&mut host);
        assert!(capture_mapping(&mut scene, "Nope").is_err());
    }
}
