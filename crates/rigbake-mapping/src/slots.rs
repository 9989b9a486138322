//! Retargeting slot ids and their standard body-part names.

/// Numeric retargeting slot id.
pub type SlotId = u32;

/// Slot of the root/hip joint. Anchors namespace and animation-range lookups.
pub const ROOT_SLOT: SlotId = 1;

/// Slot of the characterization reference node. Never written to mapping files.
pub const REFERENCE_SLOT: SlotId = 0;

/// Exclusive upper bound of node ids the host characterization knows about.
pub const MAX_NODE_ID: SlotId = 212;

/// Standard body-part names, indexed by slot id.
const BODY_PARTS: [&str; 33] = [
    "Reference",
    "Hips",
    "LeftUpLeg",
    "LeftLeg",
    "LeftFoot",
    "RightUpLeg",
    "RightLeg",
    "RightFoot",
    "Spine",
    "LeftArm",
    "LeftForeArm",
    "LeftHand",
    "RightArm",
    "RightForeArm",
    "RightHand",
    "Head",
    "LeftToeBase",
    "RightToeBase",
    "LeftShoulder",
    "RightShoulder",
    "Neck",
    "LeftFingerBase",
    "RightFingerBase",
    "Spine1",
    "Spine2",
    "Spine3",
    "Spine4",
    "Spine5",
    "Spine6",
    "Spine7",
    "Spine8",
    "Spine9",
    "Neck1",
];

/// Returns the body-part name for a slot, if it is one of the standard roles.
pub fn body_part_name(slot: SlotId) -> Option<&'static str> {
    BODY_PARTS.get(slot as usize).copied()
}

/// Returns the slot for a standard body-part name.
pub fn slot_for_body_part(name: &str) -> Option<SlotId> {
    BODY_PARTS
        .iter()
        .position(|part| *part == name)
        .map(|idx| idx as SlotId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_slots() {
        assert_eq!(body_part_name(ROOT_SLOT), Some("Hips"));
        assert_eq!(body_part_name(REFERENCE_SLOT), Some("Reference"));
        assert_eq!(body_part_name(4), Some("LeftFoot"));
        assert_eq!(body_part_name(18), Some("LeftShoulder"));
        assert_eq!(body_part_name(500), None);
    }

    #[test]
    fn test_reverse_lookup() {
        for slot in 0..33 {
            let name = body_part_name(slot).unwrap();
            assert_eq!(slot_for_body_part(name), Some(slot));
        }
        assert_eq!(slot_for_body_part("Tail"), None);
    }
}
