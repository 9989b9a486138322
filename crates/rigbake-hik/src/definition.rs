//! Characterization definitions: lookup, creation, and the lock protocol.

use regex::Regex;
use rigbake_mapping::JointMapping;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{HikResult, HostResult};
use crate::namespace::Namespace;
use crate::scene::{Direction, Scene, CHARACTER_NODE_TYPE, SOLVER_NODE_TYPE};

/// Default base name of the mocap source definition.
pub const MOCAP_DEFINITION_BASE: &str = "MocapCharacter1";

/// Default base name of the rig destination definition.
pub const RIG_DEFINITION_BASE: &str = "RigCharacter1";

static DIGITS_REGEX: OnceLock<Regex> = OnceLock::new();

fn digits_regex() -> &'static Regex {
    DIGITS_REGEX.get_or_init(|| Regex::new(r"\d+").expect("invalid regex pattern"))
}

/// Handle to a characterization definition in the scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    /// Definition node name.
    pub name: String,
    /// True if this resolution created the definition.
    pub created: bool,
}

impl Definition {
    /// Handle to an existing definition.
    pub fn existing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: false,
        }
    }

    /// Definition node name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Returns the first unused name derived from `base`.
///
/// The first digit run of `base` is replaced by a counter, or the counter is
/// appended if `base` has no digits.
pub fn unique_name(scene: &mut Scene<'_>, base: &str) -> HostResult<String> {
    let mut name = base.to_string();
    let mut counter = 1u32;
    while scene.exists(&name)? {
        name = if digits_regex().is_match(base) {
            digits_regex()
                .replacen(base, 1, counter.to_string().as_str())
                .into_owned()
        } else {
            format!("{}{}", base, counter)
        };
        counter += 1;
    }
    Ok(name)
}

/// Definition the joint `root_node` is characterized into, if any.
///
/// Any host error during the lookup counts as a miss.
pub fn find_from_skeleton_root(scene: &mut Scene<'_>, root_node: &str) -> Option<String> {
    match scene.exists(root_node) {
        Ok(true) => {}
        _ => return None,
    }
    let plug = format!("{}.Character", root_node);
    match scene.list_connections(&plug, Direction::Outgoing, Some(CHARACTER_NODE_TYPE)) {
        Ok(found) => found.into_iter().next(),
        Err(e) => {
            log::debug!("definition lookup from {} failed: {}", root_node, e);
            None
        }
    }
}

/// Finds the definition already characterizing the mapping's root joint, or
/// creates a fresh one named after `base`.
///
/// New definitions start unlocked with no joints assigned, and the host's
/// character list is refreshed.
pub fn resolve_or_create(
    scene: &mut Scene<'_>,
    namespace: &Namespace,
    mapping: &JointMapping,
    base: &str,
) -> HikResult<Definition> {
    if let Some(root) = mapping.root() {
        let root_node = namespace.qualify(root);
        if let Some(name) = find_from_skeleton_root(scene, &root_node) {
            log::info!("reusing definition {} for {}", name, root_node);
            return Ok(Definition::existing(name));
        }
    }

    let wanted = unique_name(scene, base)?;
    let name = scene.create_character(&wanted)?;
    scene.update_character_list()?;
    log::info!("created definition {}", name);
    Ok(Definition {
        name,
        created: true,
    })
}

/// Locks a definition, reading the stance pose first. No-op when locked.
pub fn lock(scene: &mut Scene<'_>, definition: &str) -> HostResult<()> {
    if scene.is_characterization_locked(definition)? {
        return Ok(());
    }
    scene.read_stance_pose(definition)?;
    scene.set_characterization_lock(definition, true)
}

/// Unlocks a definition. No-op when unlocked.
pub fn unlock(scene: &mut Scene<'_>, definition: &str) -> HostResult<()> {
    if !scene.is_characterization_locked(definition)? {
        return Ok(());
    }
    scene.set_characterization_lock(definition, false)
}

/// Source definition driving each destination, read from the scene's
/// solver nodes. Solvers without a destination are skipped; a destination
/// whose source input is disconnected maps to `None`.
pub fn sources_by_destination(
    scene: &mut Scene<'_>,
) -> HostResult<BTreeMap<String, Option<String>>> {
    let mut links = BTreeMap::new();
    for solver in scene.list_nodes_of_type(SOLVER_NODE_TYPE)? {
        let destination = scene
            .list_connections(
                &format!("{}.InputCharacterDefinitionDst", solver),
                Direction::Incoming,
                Some(CHARACTER_NODE_TYPE),
            )?
            .into_iter()
            .next();
        let Some(destination) = destination else {
            log::debug!("solver {} has no destination", solver);
            continue;
        };
        let source = scene
            .list_connections(
                &format!("{}.InputCharacterDefinitionSrc", solver),
                Direction::Incoming,
                Some(CHARACTER_NODE_TYPE),
            )?
            .into_iter()
            .next();
        links.insert(destination, source);
    }
    Ok(links)
}

/// Definitions that `definition` currently drives.
pub fn destinations_of(scene: &mut Scene<'_>, definition: &str) -> HostResult<Vec<String>> {
    Ok(sources_by_destination(scene)?
        .into_iter()
        .filter(|(_, source)| source.as_deref() == Some(definition))
        .map(|(destination, _)| destination)
        .collect())
}
