//! Arm leveling for T-pose characterization.
//!
//! Characterization expects a T-pose with horizontal upper arms. Rigs and
//! captures that stand in an A-pose are fixed by swinging each upper arm in
//! world space until the elbow lies level with the shoulder, keeping the
//! arm's heading. On rigs, the arm IK control is then moved onto the wrist
//! and given the same swing so IK and FK agree.

use glam::{DQuat, DVec3, EulerRot};
use rigbake_mapping::{body_part_name, JointMapping, SlotId};
use serde::Serialize;

use crate::error::HostResult;
use crate::namespace::Namespace;
use crate::scene::Scene;

/// One side of the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

struct ArmSlots {
    shoulder: SlotId,
    upper_arm: SlotId,
    forearm: SlotId,
    hand: SlotId,
}

impl Side {
    /// Both sides, left first.
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    fn slots(self) -> ArmSlots {
        match self {
            Side::Left => ArmSlots {
                shoulder: 18,
                upper_arm: 9,
                forearm: 10,
                hand: 11,
            },
            Side::Right => ArmSlots {
                shoulder: 19,
                upper_arm: 12,
                forearm: 13,
                hand: 14,
            },
        }
    }

    fn label(self) -> &'static str {
        match self {
            Side::Left => "left arm",
            Side::Right => "right arm",
        }
    }
}

/// What was done to one arm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmAdjustment {
    pub side: Side,
    /// Node the leveling rotation was applied to.
    pub control: String,
    /// World-space X/Y/Z rotation in degrees.
    pub rotation: [f64; 3],
    /// IK control moved onto the wrist, for rigs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ik_control: Option<String>,
}

/// Outcome of a T-pose fix. Arms that could not be leveled are warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TposeReport {
    pub arms: Vec<ArmAdjustment>,
    pub warnings: Vec<String>,
}

impl TposeReport {
    /// Returns the adjustment made to one side.
    pub fn arm(&self, side: Side) -> Option<&ArmAdjustment> {
        self.arms.iter().find(|a| a.side == side)
    }
}

/// World-space rotation, as X/Y/Z degrees, that swings the direction
/// `shoulder -> elbow` onto its horizontal projection.
///
/// Returns `None` when the arm points straight up or down, or the two
/// points coincide, since no heading can be kept.
pub fn leveling_rotation(shoulder: DVec3, elbow: DVec3) -> Option<[f64; 3]> {
    let direction = (elbow - shoulder).try_normalize()?;
    let level = DVec3::new(direction.x, 0.0, direction.z).try_normalize()?;
    let (z, y, x) = DQuat::from_rotation_arc(direction, level).to_euler(EulerRot::ZYX);
    Some([x.to_degrees(), y.to_degrees(), z.to_degrees()])
}

/// Levels the arm running from `shoulder` to `elbow` by rotating `control`.
///
/// Returns the applied rotation, or `None` if the arm has no heading.
pub fn level_arm(
    scene: &mut Scene<'_>,
    shoulder: &str,
    elbow: &str,
    control: &str,
) -> HostResult<Option<[f64; 3]>> {
    let start = DVec3::from_array(scene.world_translation(shoulder)?);
    let end = DVec3::from_array(scene.world_translation(elbow)?);
    let Some(rotation) = leveling_rotation(start, end) else {
        return Ok(None);
    };
    scene.rotate_world_relative(control, rotation)?;
    log::info!("leveled {} by {:?}", control, rotation);
    Ok(Some(rotation))
}

/// Moves `control` onto the world position of `target`, then rotates it by
/// `rotation` in world space.
pub fn follow(
    scene: &mut Scene<'_>,
    target: &str,
    control: &str,
    rotation: [f64; 3],
) -> HostResult<()> {
    let position = scene.world_translation(target)?;
    scene.set_world_translation(control, position)?;
    scene.rotate_world_relative(control, rotation)
}

fn element(mapping: &JointMapping, namespace: &Namespace, slot: SlotId) -> Result<String, String> {
    mapping.element(slot).map(|name| namespace.qualify(name)).ok_or_else(|| {
        format!(
            "no node mapped to slot {} ({})",
            slot,
            body_part_name(slot).unwrap_or("?")
        )
    })
}

fn level_side(
    scene: &mut Scene<'_>,
    side: Side,
    shoulder: &str,
    elbow: &str,
    control: &str,
) -> Result<[f64; 3], String> {
    match level_arm(scene, shoulder, elbow, control) {
        Ok(Some(rotation)) => Ok(rotation),
        Ok(None) => Err(format!("{} is vertical, left as is", shoulder)),
        Err(e) => Err(format!("{} not leveled: {}", side.label(), e)),
    }
}

fn fix_rig_arm(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
    skeleton: &JointMapping,
    controls: &JointMapping,
    side: Side,
) -> Result<ArmAdjustment, String> {
    let slots = side.slots();
    let shoulder = element(skeleton, namespace, slots.upper_arm)?;
    let elbow = element(skeleton, namespace, slots.forearm)?;
    let control = element(controls, namespace, slots.upper_arm)?;
    let wrist = element(skeleton, namespace, slots.hand)?;
    let ik_control = element(controls, namespace, slots.hand)?;

    let rotation = level_side(scene, side, &shoulder, &elbow, &control)?;
    follow(scene, &wrist, &ik_control, rotation)
        .map_err(|e| format!("{} IK not aligned: {}", side.label(), e))?;
    Ok(ArmAdjustment {
        side,
        control,
        rotation,
        ik_control: Some(ik_control),
    })
}

fn fix_mocap_arm(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
    skeleton: &JointMapping,
    side: Side,
) -> Result<ArmAdjustment, String> {
    let slots = side.slots();
    let shoulder = element(skeleton, namespace, slots.upper_arm)?;
    let elbow = element(skeleton, namespace, slots.forearm)?;
    let control = element(skeleton, namespace, slots.shoulder)?;

    let rotation = level_side(scene, side, &shoulder, &elbow, &control)?;
    Ok(ArmAdjustment {
        side,
        control,
        rotation,
        ik_control: None,
    })
}

fn collect(
    mut fix: impl FnMut(Side) -> Result<ArmAdjustment, String>,
) -> TposeReport {
    let mut report = TposeReport::default();
    for side in Side::BOTH {
        match fix(side) {
            Ok(adjustment) => report.arms.push(adjustment),
            Err(warning) => {
                let warning = if warning.starts_with(side.label()) {
                    warning
                } else {
                    format!("{}: {}", side.label(), warning)
                };
                log::warn!("{}", warning);
                report.warnings.push(warning);
            }
        }
    }
    report
}

/// Puts a rig into T-pose: levels each FK upper-arm control, then snaps the
/// arm IK control onto the wrist with the same rotation.
pub fn fix_rig_tpose(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
    skeleton: &JointMapping,
    controls: &JointMapping,
) -> TposeReport {
    collect(|side| fix_rig_arm(scene, namespace, skeleton, controls, side))
}

/// Puts a mocap skeleton into T-pose by rotating each shoulder joint until
/// the upper arm is level.
pub fn fix_mocap_tpose(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
    skeleton: &JointMapping,
) -> TposeReport {
    collect(|side| fix_mocap_arm(scene, namespace, skeleton, side))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeHost;
    use crate::host::Command;

    fn assert_close(actual: [f64; 3], expected: [f64; 3]) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{:?} != {:?}", actual, expected);
        }
    }

    fn rig_skeleton() -> JointMapping {
        JointMapping::new()
            .with("Root_M", 1)
            .with("Shoulder_L", 9)
            .with("Elbow_L", 10)
            .with("Wrist_L", 11)
            .with("Shoulder_R", 12)
            .with("Elbow_R", 13)
            .with("Wrist_R", 14)
    }

    fn rig_controls() -> JointMapping {
        JointMapping::new()
            .with("FKShoulder_L", 9)
            .with("IKArm_L", 11)
            .with("FKShoulder_R", 12)
            .with("IKArm_R", 14)
    }

    fn a_pose_rig(host: &mut FakeHost) {
        for joint in ["Shoulder_L", "Elbow_L", "Wrist_L", "Shoulder_R", "Elbow_R", "Wrist_R"] {
            host.add_joint(&format!("hero:{}", joint));
        }
        for control in ["FKShoulder_L", "IKArm_L", "FKShoulder_R", "IKArm_R"] {
            host.add_control(&format!("hero:{}", control));
        }
        host.set_translation("hero:Shoulder_L", [10.0, 150.0, 0.0])
            .set_translation("hero:Elbow_L", [40.0, 120.0, 0.0])
            .set_translation("hero:Wrist_L", [60.0, 100.0, 0.0])
            .set_translation("hero:Shoulder_R", [-10.0, 150.0, 0.0])
            .set_translation("hero:Elbow_R", [-40.0, 120.0, 0.0])
            .set_translation("hero:Wrist_R", [-60.0, 100.0, 0.0]);
    }

    #[test]
    fn test_leveling_rotation_drooping_arm() {
        let rotation = leveling_rotation(DVec3::ZERO, DVec3::new(1.0, -1.0, 0.0)).unwrap();
        assert_close(rotation, [0.0, 0.0, 45.0]);

        let rotation = leveling_rotation(DVec3::ZERO, DVec3::new(-1.0, -1.0, 0.0)).unwrap();
        assert_close(rotation, [0.0, 0.0, -45.0]);
    }

    #[test]
    fn test_leveling_rotation_keeps_heading() {
        // Arm pointing forward and down swings about X.
        let rotation = leveling_rotation(DVec3::ZERO, DVec3::new(0.0, -1.0, 1.0)).unwrap();
        assert_close(rotation, [-45.0, 0.0, 0.0]);

        let level = leveling_rotation(DVec3::ZERO, DVec3::new(3.0, 0.0, 4.0)).unwrap();
        assert_close(level, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_leveling_rotation_without_heading() {
        assert_eq!(leveling_rotation(DVec3::ZERO, DVec3::new(0.0, -5.0, 0.0)), None);
        assert_eq!(leveling_rotation(DVec3::ONE, DVec3::ONE), None);
    }

    #[test]
    fn test_fix_rig_tpose_levels_and_aligns_ik() {
        let mut host = FakeHost::new();
        a_pose_rig(&mut host);
        let mut scene = Scene::new(&mut host);
        let report = fix_rig_tpose(
            &mut scene,
            &Namespace::new("hero"),
            &rig_skeleton(),
            &rig_controls(),
        );
        drop(scene);

        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        let left = report.arm(Side::Left).unwrap();
        assert_eq!(left.control, "hero:FKShoulder_L");
        assert_eq!(left.ik_control.as_deref(), Some("hero:IKArm_L"));
        assert_close(left.rotation, [0.0, 0.0, 45.0]);
        assert_close(report.arm(Side::Right).unwrap().rotation, [0.0, 0.0, -45.0]);

        assert_close(host.rotation("hero:FKShoulder_L").unwrap(), [0.0, 0.0, 45.0]);
        assert_close(host.rotation("hero:IKArm_L").unwrap(), [0.0, 0.0, 45.0]);
        assert_eq!(host.world_position("hero:IKArm_L"), Some([60.0, 100.0, 0.0]));
        assert_eq!(host.world_position("hero:IKArm_R"), Some([-60.0, 100.0, 0.0]));

        let rotate: &Command = host
            .commands()
            .iter()
            .find(|c| c.name() == "rotate")
            .unwrap();
        assert!(rotate.has_flag("worldSpace") && rotate.has_flag("relative"));
        assert_eq!(rotate.arg_str(3), Some("hero:FKShoulder_L"));
    }

    #[test]
    fn test_fix_rig_tpose_continues_past_missing_arm() {
        let mut host = FakeHost::new();
        a_pose_rig(&mut host);
        let controls = JointMapping::new()
            .with("FKShoulder_R", 12)
            .with("IKArm_R", 14);
        let mut scene = Scene::new(&mut host);
        let report = fix_rig_tpose(&mut scene, &Namespace::new("hero"), &rig_skeleton(), &controls);

        assert_eq!(report.arms.len(), 1);
        assert_eq!(report.arms[0].side, Side::Right);
        assert_eq!(
            report.warnings,
            vec!["left arm: no node mapped to slot 9 (LeftArm)".to_string()]
        );
    }

    #[test]
    fn test_fix_rig_tpose_reports_host_errors() {
        let mut host = FakeHost::new();
        a_pose_rig(&mut host);
        host.lock_attribute("hero:IKArm_L.translate");
        let mut scene = Scene::new(&mut host);
        let report = fix_rig_tpose(
            &mut scene,
            &Namespace::new("hero"),
            &rig_skeleton(),
            &rig_controls(),
        );
        assert_eq!(report.arms.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("left arm IK not aligned"));
    }

    #[test]
    fn test_fix_mocap_tpose_rotates_shoulders() {
        let mut host = FakeHost::new();
        for joint in ["LCollar", "LShldr", "LForeArm", "RCollar", "RShldr", "RForeArm"] {
            host.add_joint(&format!("take:{}", joint));
        }
        host.set_translation("take:LShldr", [10.0, 150.0, 0.0])
            .set_translation("take:LForeArm", [40.0, 120.0, 0.0])
            .set_translation("take:RShldr", [-10.0, 150.0, 0.0])
            .set_translation("take:RForeArm", [-10.0, 120.0, 0.0]);
        let skeleton = JointMapping::new()
            .with("LShldr", 9)
            .with("LForeArm", 10)
            .with("RShldr", 12)
            .with("RForeArm", 13)
            .with("LCollar", 18)
            .with("RCollar", 19);
        let mut scene = Scene::new(&mut host);
        let report = fix_mocap_tpose(&mut scene, &Namespace::new("take"), &skeleton);
        drop(scene);

        let left = report.arm(Side::Left).unwrap();
        assert_eq!(left.control, "take:LCollar");
        assert_eq!(left.ik_control, None);
        assert_close(host.rotation("take:LCollar").unwrap(), [0.0, 0.0, 45.0]);
        assert_eq!(
            report.warnings,
            vec!["right arm: take:RShldr is vertical, left as is".to_string()]
        );
        assert_eq!(host.command_count("xform"), 4);
    }
}
