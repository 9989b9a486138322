//! In-memory [`Host`] for tests and dry runs.
//!
//! `FakeHost` models just enough of the host scene for retargeting: typed
//! nodes with attributes and locks, plug connections, characterization
//! definitions with their lock state, control-rig retargeters, animation
//! curves, playback range, references, and importable files.
//!
//! World-space transforms are simplified: a node's world translation is the
//! sum of the local translations up its parent chain, and world-space
//! relative rotations are added straight onto the local rotate channels.
//!
//! The characterization lock protocol is enforced: slot assignment is
//! rejected on a locked definition, while retargeter creation, input linking
//! and baking reject unlocked ones.

use rigbake_mapping::{body_part_name, SlotId};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{HostError, HostResult};
use crate::host::{value_as_bool, value_to_f64s, Command, Host};
use crate::scene::{CHARACTERIZATION_LOCK_ATTR, CHARACTER_NODE_TYPE, SOLVER_NODE_TYPE};

/// Node type of control-rig retargeters.
pub const RETARGETER_NODE_TYPE: &str = "CustomRigRetargeterNode";
/// Node type of joints.
pub const JOINT_NODE_TYPE: &str = "joint";
/// Node type of plain transforms (rig controls).
pub const TRANSFORM_NODE_TYPE: &str = "transform";
/// Node type of time-based rotation curves.
pub const ANIM_CURVE_NODE_TYPE: &str = "animCurveTA";
/// Node type of reference nodes.
pub const REFERENCE_NODE_TYPE: &str = "reference";

const KEY_TIMES_ATTR: &str = "keyTimes";
const TRANSLATE_ATTRS: [&str; 3] = ["translateX", "translateY", "translateZ"];
const ROTATE_ATTRS: [&str; 3] = ["rotateX", "rotateY", "rotateZ"];

/// A scene node.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeNode {
    /// Host node type.
    pub node_type: String,
    /// Parent node for DAG nodes.
    pub parent: Option<String>,
    /// Attribute values by long name.
    pub attributes: BTreeMap<String, Value>,
    /// Locked attribute names.
    pub locked: BTreeSet<String>,
}

impl FakeNode {
    fn new(node_type: &str) -> Self {
        let mut attributes = BTreeMap::new();
        if node_type == JOINT_NODE_TYPE || node_type == TRANSFORM_NODE_TYPE {
            for attr in [
                "translateX",
                "translateY",
                "translateZ",
                "rotateX",
                "rotateY",
                "rotateZ",
            ] {
                attributes.insert(attr.to_string(), json!(0.0));
            }
            attributes.insert("visibility".to_string(), json!(true));
        }
        if node_type == JOINT_NODE_TYPE {
            attributes.insert("drawStyle".to_string(), json!(0));
        }
        if node_type == CHARACTER_NODE_TYPE {
            attributes.insert(CHARACTERIZATION_LOCK_ATTR.to_string(), json!(false));
        }
        Self {
            node_type: node_type.to_string(),
            parent: None,
            attributes,
            locked: BTreeSet::new(),
        }
    }

    fn has_attribute(&self, attr: &str) -> bool {
        self.attributes.contains_key(attr) || self.attributes.contains_key(&format!("{}X", attr))
    }
}

/// One channel mapping held by a retargeter.
#[derive(Debug, Clone, PartialEq)]
pub struct RetargeterMapping {
    /// Body-part name of the slot.
    pub body_part: String,
    /// `"R"` or `"T"`.
    pub channel: String,
    /// Control node driven by the slot.
    pub node: String,
    /// Slot id.
    pub slot: SlotId,
}

/// A control-rig retargeter attached to one definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeRetargeter {
    /// Retargeter node name.
    pub name: String,
    /// Owning definition.
    pub definition: String,
    /// Channel mappings in the order they were added.
    pub mappings: Vec<RetargeterMapping>,
}

/// A recorded bake call.
#[derive(Debug, Clone, PartialEq)]
pub struct BakeRecord {
    /// Nodes baked.
    pub nodes: Vec<String>,
    /// First baked frame.
    pub start: f64,
    /// Last baked frame.
    pub end: f64,
    /// Flags exactly as passed.
    pub flags: Vec<(String, Option<Value>)>,
}

impl BakeRecord {
    /// Returns a flag value by name.
    pub fn flag(&self, name: &str) -> Option<&Value> {
        self.flags
            .iter()
            .find(|(flag, _)| flag == name)
            .and_then(|(_, value)| value.as_ref())
    }
}

/// Content of an importable or referenceable file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeAsset {
    nodes: Vec<(String, String, Option<String>)>,
    keys: Vec<(String, String, Vec<f64>)>,
    locks: Vec<String>,
    positions: Vec<(String, [f64; 3])>,
}

impl FakeAsset {
    /// Creates an empty asset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root joint.
    pub fn joint(mut self, name: &str) -> Self {
        self.nodes
            .push((name.to_string(), JOINT_NODE_TYPE.to_string(), None));
        self
    }

    /// Adds a joint parented under `parent`.
    pub fn child_joint(mut self, name: &str, parent: &str) -> Self {
        self.nodes.push((
            name.to_string(),
            JOINT_NODE_TYPE.to_string(),
            Some(parent.to_string()),
        ));
        self
    }

    /// Adds a control transform.
    pub fn control(mut self, name: &str) -> Self {
        self.nodes
            .push((name.to_string(), TRANSFORM_NODE_TYPE.to_string(), None));
        self
    }

    /// Adds a root node of any type.
    pub fn node(mut self, name: &str, node_type: &str) -> Self {
        self.nodes
            .push((name.to_string(), node_type.to_string(), None));
        self
    }

    /// Sets the local translation of `node` once instantiated.
    pub fn at(mut self, node: &str, translation: [f64; 3]) -> Self {
        self.positions.push((node.to_string(), translation));
        self
    }

    /// Adds an animation curve with keys on `node.attr`.
    pub fn keys(mut self, node: &str, attr: &str, times: &[f64]) -> Self {
        self.keys
            .push((node.to_string(), attr.to_string(), times.to_vec()));
        self
    }

    /// Locks `node.attr` once instantiated.
    pub fn lock(mut self, plug: &str) -> Self {
        self.locks.push(plug.to_string());
        self
    }
}

#[derive(Debug, Clone)]
struct FakeReference {
    node: String,
    path: String,
    namespace: String,
    loaded: bool,
}

/// In-memory host scene.
#[derive(Debug, Clone)]
pub struct FakeHost {
    nodes: BTreeMap<String, FakeNode>,
    connections: Vec<(String, String)>,
    selection: Vec<String>,
    current_time: f64,
    playback: (f64, f64),
    current_character: Option<String>,
    character_list_refreshes: usize,
    retargeters: BTreeMap<String, FakeRetargeter>,
    character_inputs: BTreeMap<String, String>,
    files: BTreeMap<String, FakeAsset>,
    references: Vec<FakeReference>,
    bakes: Vec<BakeRecord>,
    commands: Vec<Command>,
    rejections: BTreeMap<String, String>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    /// Creates an empty scene with playback range 1..120.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            connections: Vec::new(),
            selection: Vec::new(),
            current_time: 1.0,
            playback: (1.0, 120.0),
            current_character: None,
            character_list_refreshes: 0,
            retargeters: BTreeMap::new(),
            character_inputs: BTreeMap::new(),
            files: BTreeMap::new(),
            references: Vec::new(),
            bakes: Vec::new(),
            commands: Vec::new(),
            rejections: BTreeMap::new(),
        }
    }

    // ========== Scene setup ==========

    /// Adds a node of the given type.
    pub fn add_node(&mut self, name: &str, node_type: &str) -> &mut Self {
        self.nodes.insert(name.to_string(), FakeNode::new(node_type));
        self
    }

    /// Adds a joint.
    pub fn add_joint(&mut self, name: &str) -> &mut Self {
        self.add_node(name, JOINT_NODE_TYPE)
    }

    /// Adds a control transform.
    pub fn add_control(&mut self, name: &str) -> &mut Self {
        self.add_node(name, TRANSFORM_NODE_TYPE)
    }

    /// Parents `child` under `parent`.
    pub fn set_parent(&mut self, child: &str, parent: &str) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent.to_string());
        }
        self
    }

    /// Sets the local translation of a node.
    pub fn set_translation(&mut self, node: &str, translation: [f64; 3]) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(node) {
            for (attr, value) in TRANSLATE_ATTRS.iter().zip(translation) {
                node.attributes.insert(attr.to_string(), json!(value));
            }
        }
        self
    }

    /// Locks an attribute.
    pub fn lock_attribute(&mut self, plug: &str) -> &mut Self {
        let (node, attr) = split_plug(plug);
        if let Some(node) = self.nodes.get_mut(node) {
            node.locked.insert(attr.to_string());
        }
        self
    }

    /// Creates an animation curve with keys at `times` driving `node.attr`.
    pub fn add_anim_curve(&mut self, node: &str, attr: &str, times: &[f64]) -> &mut Self {
        let curve = format!("{}_{}", node.replace(':', "_"), attr);
        let mut curve_node = FakeNode::new(ANIM_CURVE_NODE_TYPE);
        curve_node
            .attributes
            .insert(KEY_TIMES_ATTR.to_string(), json!(times));
        self.nodes.insert(curve.clone(), curve_node);
        self.connections
            .push((format!("{}.output", curve), format!("{}.{}", node, attr)));
        self
    }

    /// Sets the playback range.
    pub fn set_playback_range(&mut self, start: f64, end: f64) -> &mut Self {
        self.playback = (start, end);
        self
    }

    /// Selects nodes without existence checks.
    pub fn set_selection(&mut self, nodes: &[&str]) -> &mut Self {
        self.selection = nodes.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Makes `path` importable/referenceable with the given content.
    pub fn register_file(&mut self, path: &str, asset: FakeAsset) -> &mut Self {
        self.files.insert(path.to_string(), asset);
        self
    }

    /// Adds an already-loaded reference of `path` under `namespace`.
    pub fn add_reference(&mut self, path: &str, namespace: &str, asset: FakeAsset) -> &mut Self {
        self.instantiate(&asset, namespace);
        self.push_reference(path, namespace, true);
        self.files.insert(path.to_string(), asset);
        self
    }

    /// Makes every command naming `node` fail with `message`.
    pub fn reject_node(&mut self, node: &str, message: &str) -> &mut Self {
        self.rejections
            .insert(node.to_string(), message.to_string());
        self
    }

    /// Instantiates an asset directly, as if it had been imported.
    pub fn instantiate(&mut self, asset: &FakeAsset, namespace: &str) {
        let prefix = namespace_prefix(namespace);
        for (name, node_type, parent) in &asset.nodes {
            let mut node = FakeNode::new(node_type);
            node.parent = parent.as_ref().map(|p| format!("{}{}", prefix, p));
            self.nodes.insert(format!("{}{}", prefix, name), node);
        }
        for (node, attr, times) in &asset.keys {
            self.add_anim_curve(&format!("{}{}", prefix, node), attr, times);
        }
        for (node, translation) in &asset.positions {
            self.set_translation(&format!("{}{}", prefix, node), *translation);
        }
        for plug in &asset.locks {
            self.lock_attribute(&format!("{}{}", prefix, plug));
        }
    }

    // ========== Inspection ==========

    /// Returns a node.
    pub fn node(&self, name: &str) -> Option<&FakeNode> {
        self.nodes.get(name)
    }

    /// Returns an attribute value.
    pub fn attribute(&self, plug: &str) -> Option<&Value> {
        let (node, attr) = split_plug(plug);
        self.nodes.get(node).and_then(|n| n.attributes.get(attr))
    }

    /// Names of all characterization definitions.
    pub fn definitions(&self) -> Vec<String> {
        self.nodes_of_type(CHARACTER_NODE_TYPE)
    }

    /// Names of all nodes with the given type.
    pub fn nodes_of_type(&self, node_type: &str) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.node_type == node_type)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Returns the node bound to a definition slot.
    pub fn definition_slot(&self, definition: &str, slot: SlotId) -> Option<String> {
        let body = body_part_name(slot)?;
        let plug = format!("{}.{}", definition, body);
        self.connections
            .iter()
            .find(|(_, dst)| *dst == plug)
            .map(|(src, _)| split_plug(src).0.to_string())
    }

    /// Returns true if a definition is locked.
    pub fn is_definition_locked(&self, definition: &str) -> bool {
        self.attribute(&format!("{}.{}", definition, CHARACTERIZATION_LOCK_ATTR))
            .map(value_as_bool)
            .unwrap_or(false)
    }

    /// Returns the retargeter of a definition.
    pub fn retargeter(&self, definition: &str) -> Option<&FakeRetargeter> {
        self.retargeters.get(definition)
    }

    /// Returns the live input source of a definition.
    pub fn character_input(&self, definition: &str) -> Option<&str> {
        self.character_inputs.get(definition).map(String::as_str)
    }

    /// Namespaces of the loaded references.
    pub fn reference_namespaces(&self) -> Vec<String> {
        self.references.iter().map(|r| r.namespace.clone()).collect()
    }

    /// World translation of a node.
    pub fn world_position(&self, node: &str) -> Option<[f64; 3]> {
        self.world_translation(node).ok()
    }

    /// Local rotate channel values of a node.
    pub fn rotation(&self, node: &str) -> Option<[f64; 3]> {
        let node = self.nodes.get(node)?;
        let mut out = [0.0; 3];
        for (slot, attr) in out.iter_mut().zip(ROTATE_ATTRS) {
            *slot = node.attributes.get(attr).and_then(Value::as_f64)?;
        }
        Some(out)
    }

    /// Bake calls in order.
    pub fn bakes(&self) -> &[BakeRecord] {
        &self.bakes
    }

    /// Every command run, in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of times a command was run.
    pub fn command_count(&self, name: &str) -> usize {
        self.commands.iter().filter(|c| c.name() == name).count()
    }

    /// Current time.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Playback range.
    pub fn playback_range(&self) -> (f64, f64) {
        self.playback
    }

    /// Current selection.
    pub fn current_selection(&self) -> &[String] {
        &self.selection
    }

    /// Current character.
    pub fn current_character(&self) -> Option<&str> {
        self.current_character.as_deref()
    }

    /// How often the character list was refreshed.
    pub fn character_list_refreshes(&self) -> usize {
        self.character_list_refreshes
    }

    /// Key times on the curve driving `node.attr`.
    pub fn key_times(&self, plug: &str) -> Vec<f64> {
        self.connections
            .iter()
            .filter(|(_, dst)| dst == plug)
            .filter_map(|(src, _)| self.attribute(&format!("{}.{}", split_plug(src).0, KEY_TIMES_ATTR)))
            .flat_map(value_to_f64s)
            .collect()
    }

    // ========== Internals ==========

    fn require_node(&self, name: &str) -> HostResult<&FakeNode> {
        self.nodes
            .get(name)
            .ok_or_else(|| HostError::node_not_found(name))
    }

    fn require_definition(&self, command: &str, name: &str) -> HostResult<()> {
        match self.nodes.get(name) {
            Some(node) if node.node_type == CHARACTER_NODE_TYPE => Ok(()),
            Some(_) => Err(HostError::rejected(
                command,
                format!("'{}' is not a character definition", name),
            )),
            None => Err(HostError::node_not_found(name)),
        }
    }

    fn require_locked(&self, command: &str, definition: &str) -> HostResult<()> {
        self.require_definition(command, definition)?;
        if !self.is_definition_locked(definition) {
            return Err(HostError::rejected(
                command,
                format!("Characterization of '{}' must be locked", definition),
            ));
        }
        Ok(())
    }

    fn check_injected(&self, command: &str, node: &str) -> HostResult<()> {
        match self.rejections.get(node) {
            Some(message) => Err(HostError::rejected(command, message.clone())),
            None => Ok(()),
        }
    }

    fn world_translation(&self, name: &str) -> HostResult<[f64; 3]> {
        let mut total = [0.0; 3];
        let mut current = Some(name.to_string());
        let mut depth = 0;
        while let Some(node_name) = current {
            let node = self.require_node(&node_name)?;
            for (sum, attr) in total.iter_mut().zip(TRANSLATE_ATTRS) {
                *sum += node.attributes.get(attr).and_then(Value::as_f64).unwrap_or(0.0);
            }
            current = node.parent.clone();
            depth += 1;
            if depth > self.nodes.len() {
                return Err(HostError::rejected("xform", format!("Cyclic parenting at '{}'", name)));
            }
        }
        Ok(total)
    }

    fn require_unlocked(&self, command: &str, node: &str, attrs: &[&str]) -> HostResult<()> {
        let found = self.require_node(node)?;
        for attr in attrs {
            let compound = attr.trim_end_matches(['X', 'Y', 'Z']);
            if found.locked.contains(*attr) || found.locked.contains(compound) {
                return Err(HostError::rejected(
                    command,
                    format!("The attribute '{}.{}' is locked", node, attr),
                ));
            }
        }
        Ok(())
    }

    fn link_solver(&mut self, destination: &str, source: &str) {
        let solver = format!("{}_Solver", destination);
        let dst_plug = format!("{}.InputCharacterDefinitionDst", solver);
        let src_plug = format!("{}.InputCharacterDefinitionSrc", solver);
        if !self.nodes.contains_key(&solver) {
            self.nodes
                .insert(solver.clone(), FakeNode::new(SOLVER_NODE_TYPE));
        }
        self.connections
            .retain(|(_, dst)| *dst != dst_plug && *dst != src_plug);
        self.connections
            .push((format!("{}.OutputCharacterDefinition", destination), dst_plug));
        self.connections
            .push((format!("{}.OutputCharacterDefinition", source), src_plug));
    }

    fn merge_namespace(&mut self, namespace: &str) -> HostResult<()> {
        let prefix = namespace_prefix(namespace);
        if prefix.is_empty() {
            return Err(HostError::rejected("namespace", "Cannot remove the root namespace"));
        }
        if self.references.iter().any(|r| namespace_prefix(&r.namespace) == prefix) {
            return Err(HostError::rejected(
                "namespace",
                format!("Namespace '{}' belongs to a reference", namespace),
            ));
        }
        let renames: BTreeMap<String, String> = self
            .nodes
            .keys()
            .filter_map(|n| n.strip_prefix(&prefix).map(|rest| (n.clone(), rest.to_string())))
            .collect();
        if renames.is_empty() {
            return Err(HostError::rejected(
                "namespace",
                format!("Namespace '{}' does not exist", namespace),
            ));
        }
        if let Some(clash) = renames.values().find(|new| self.nodes.contains_key(*new)) {
            return Err(HostError::rejected(
                "namespace",
                format!("'{}' already exists in the root namespace", clash),
            ));
        }

        let rename = |name: &str| renames.get(name).cloned().unwrap_or_else(|| name.to_string());
        let rename_plug = |plug: &str| {
            let (node, attr) = split_plug(plug);
            if attr.is_empty() {
                rename(node)
            } else {
                format!("{}.{}", rename(node), attr)
            }
        };

        self.nodes = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(|(name, mut node)| {
                node.parent = node.parent.as_deref().map(rename);
                (rename(&name), node)
            })
            .collect();
        for (src, dst) in &mut self.connections {
            *src = rename_plug(src);
            *dst = rename_plug(dst);
        }
        for node in &mut self.selection {
            *node = rename(node);
        }
        for retargeter in self.retargeters.values_mut() {
            for mapping in &mut retargeter.mappings {
                mapping.node = rename(&mapping.node);
            }
        }
        Ok(())
    }

    fn push_reference(&mut self, path: &str, namespace: &str, loaded: bool) {
        let node = format!("{}RN", namespace.trim_end_matches(':'));
        self.nodes
            .insert(node.clone(), FakeNode::new(REFERENCE_NODE_TYPE));
        self.references.push(FakeReference {
            node,
            path: path.to_string(),
            namespace: namespace.trim_end_matches(':').to_string(),
            loaded,
        });
    }

    fn delete_node(&mut self, name: &str) {
        let out_plug = format!("{}.OutputCharacterDefinition", name);
        let solvers: Vec<String> = self
            .connections
            .iter()
            .filter(|(src, dst)| *src == out_plug && dst.ends_with(".InputCharacterDefinitionDst"))
            .map(|(_, dst)| split_plug(dst).0.to_string())
            .collect();
        for solver in solvers {
            self.delete_node(&solver);
        }

        let children: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.as_deref() == Some(name))
            .map(|(child, _)| child.clone())
            .collect();
        for child in children {
            self.delete_node(&child);
        }
        self.nodes.remove(name);
        self.selection.retain(|n| n != name);
        self.connections
            .retain(|(src, dst)| split_plug(src).0 != name && split_plug(dst).0 != name);
        self.retargeters.retain(|_, r| r.name != name);
        self.retargeters.remove(name);
        self.character_inputs.remove(name);
        if self.current_character.as_deref() == Some(name) {
            self.current_character = None;
        }
    }

    fn dispatch(&mut self, cmd: &Command) -> HostResult<Value> {
        let name = cmd.name();
        match name {
            "hikCreateCharacter" => {
                let def = arg_string(cmd, 0)?;
                if self.nodes.contains_key(&def) {
                    return Err(HostError::rejected(name, format!("'{}' already exists", def)));
                }
                self.nodes
                    .insert(def.clone(), FakeNode::new(CHARACTER_NODE_TYPE));
                self.current_character = Some(def.clone());
                Ok(json!(def))
            }
            "hikUpdateCharacterList" => {
                self.character_list_refreshes += 1;
                Ok(Value::Null)
            }
            "hikSetCurrentCharacter" => {
                let def = arg_string(cmd, 0)?;
                self.require_definition(name, &def)?;
                self.current_character = Some(def);
                Ok(Value::Null)
            }
            "hikGetCurrentCharacter" => Ok(json!(self.current_character.clone().unwrap_or_default())),
            "hikReadStancePoseTRSOffsets" => {
                let def = arg_string(cmd, 0)?;
                self.require_definition(name, &def)?;
                Ok(Value::Null)
            }
            "setCharacterObject" => {
                let node = arg_string(cmd, 0)?;
                let def = arg_string(cmd, 1)?;
                let slot = arg_slot(cmd, 2)?;
                if !self.nodes.contains_key(&node) {
                    return Err(HostError::rejected(
                        name,
                        format!("No object matches name: {}", node),
                    ));
                }
                self.check_injected(name, &node)?;
                self.require_definition(name, &def)?;
                if self.is_definition_locked(&def) {
                    return Err(HostError::rejected(
                        name,
                        format!("Character definition '{}' is locked", def),
                    ));
                }
                let body = body_part_name(slot).ok_or_else(|| {
                    HostError::rejected(name, format!("Invalid characterization id {}", slot))
                })?;
                let source = format!("{}.Character", node);
                let target = format!("{}.{}", def, body);
                let def_prefix = format!("{}.", def);
                self.connections.retain(|(src, dst)| {
                    *dst != target && !(*src == source && dst.starts_with(&def_prefix))
                });
                self.connections.push((source, target));
                Ok(Value::Null)
            }
            "hikCustomRigElementNameFromId" | "GetHIKNodeName" => {
                let slot_index = if name == "GetHIKNodeName" { 0 } else { 1 };
                if name == "hikCustomRigElementNameFromId" {
                    let def = arg_string(cmd, 0)?;
                    self.require_definition(name, &def)?;
                }
                let slot = arg_slot(cmd, slot_index)?;
                match body_part_name(slot) {
                    Some(body) => Ok(json!(body)),
                    None if name == "GetHIKNodeName" => Ok(json!("")),
                    None => Err(HostError::rejected(
                        name,
                        format!("No custom rig element for id {}", slot),
                    )),
                }
            }
            "RetargeterGetName" => {
                let def = arg_string(cmd, 0)?;
                Ok(json!(retargeter_name(&def)))
            }
            "RetargeterExists" => {
                let retargeter = arg_string(cmd, 0)?;
                let exists = self
                    .nodes
                    .get(&retargeter)
                    .map(|n| n.node_type == RETARGETER_NODE_TYPE)
                    .unwrap_or(false);
                Ok(json!(exists))
            }
            "RetargeterCreate" => {
                let def = arg_string(cmd, 0)?;
                self.require_locked(name, &def)?;
                let retargeter = retargeter_name(&def);
                self.nodes
                    .insert(retargeter.clone(), FakeNode::new(RETARGETER_NODE_TYPE));
                self.retargeters.insert(
                    def.clone(),
                    FakeRetargeter {
                        name: retargeter.clone(),
                        definition: def,
                        mappings: Vec::new(),
                    },
                );
                Ok(json!(retargeter))
            }
            "RetargeterAddMapping" => {
                let retargeter = arg_string(cmd, 0)?;
                let body = arg_string(cmd, 1)?;
                let channel = arg_string(cmd, 2)?;
                let node = arg_string(cmd, 3)?;
                let slot = arg_slot(cmd, 4)?;
                if !self.nodes.contains_key(&node) {
                    return Err(HostError::rejected(
                        name,
                        format!("No object matches name: {}", node),
                    ));
                }
                self.check_injected(name, &node)?;
                if channel != "R" && channel != "T" {
                    return Err(HostError::rejected(name, format!("Bad channel '{}'", channel)));
                }
                let entry = self
                    .retargeters
                    .values_mut()
                    .find(|r| r.name == retargeter)
                    .ok_or_else(|| {
                        HostError::rejected(name, format!("Retargeter '{}' does not exist", retargeter))
                    })?;
                entry.mappings.push(RetargeterMapping {
                    body_part: body,
                    channel,
                    node,
                    slot,
                });
                Ok(Value::Null)
            }
            "RetargeterDelete" => {
                let retargeter = arg_string(cmd, 0)?;
                self.require_node(&retargeter)?;
                self.delete_node(&retargeter);
                Ok(Value::Null)
            }
            "hikSetCharacterInput" => {
                let dest = arg_string(cmd, 0)?;
                let source = arg_string(cmd, 1)?;
                self.require_locked(name, &dest)?;
                self.require_locked(name, &source)?;
                self.link_solver(&dest, &source);
                self.character_inputs.insert(dest, source);
                Ok(Value::Null)
            }
            "hikGetCharacterInputString" => {
                let def = arg_string(cmd, 0)?;
                self.require_definition(name, &def)?;
                Ok(json!(self.character_inputs.get(&def).cloned().unwrap_or_default()))
            }
            "currentTime" => {
                if cmd.has_flag("query") {
                    return Ok(json!(self.current_time));
                }
                self.current_time = arg_f64(cmd, 0)?;
                Ok(json!(self.current_time))
            }
            "playbackOptions" => {
                if cmd.has_flag("query") {
                    if cmd.has_flag("minTime") {
                        return Ok(json!(self.playback.0));
                    }
                    if cmd.has_flag("maxTime") {
                        return Ok(json!(self.playback.1));
                    }
                    return Err(HostError::rejected(name, "Nothing to query"));
                }
                if let Some(min) = cmd.flag_value("minTime").and_then(Value::as_f64) {
                    self.playback.0 = min;
                }
                if let Some(max) = cmd.flag_value("maxTime").and_then(Value::as_f64) {
                    self.playback.1 = max;
                }
                Ok(Value::Null)
            }
            "listConnections" => self.list_connections(cmd),
            "xform" => {
                let node = arg_string(cmd, 0)?;
                if cmd.has_flag("query") {
                    return Ok(json!(self.world_translation(&node)?));
                }
                let target = cmd
                    .flag_value("translation")
                    .map(value_to_f64s)
                    .filter(|v| v.len() == 3)
                    .ok_or_else(|| HostError::rejected(name, "Expected -translation x y z"))?;
                self.require_unlocked(name, &node, &TRANSLATE_ATTRS)?;
                let parent = self.require_node(&node)?.parent.clone();
                let origin = match parent {
                    Some(parent) => self.world_translation(&parent)?,
                    None => [0.0; 3],
                };
                let local = [target[0] - origin[0], target[1] - origin[1], target[2] - origin[2]];
                self.set_translation(&node, local);
                Ok(Value::Null)
            }
            "rotate" => {
                let node = arg_string(cmd, 3)?;
                let degrees = [arg_f64(cmd, 0)?, arg_f64(cmd, 1)?, arg_f64(cmd, 2)?];
                self.require_unlocked(name, &node, &ROTATE_ATTRS)?;
                if !cmd.has_flag("relative") {
                    return Err(HostError::rejected(name, "Only -relative rotation is supported"));
                }
                if let Some(found) = self.nodes.get_mut(&node) {
                    for (attr, delta) in ROTATE_ATTRS.iter().zip(degrees) {
                        let value = found.attributes.get(*attr).and_then(Value::as_f64).unwrap_or(0.0);
                        found.attributes.insert(attr.to_string(), json!(value + delta));
                    }
                }
                Ok(Value::Null)
            }
            "namespace" => {
                let namespace = cmd
                    .flag_value("removeNamespace")
                    .and_then(Value::as_str)
                    .ok_or_else(|| HostError::rejected(name, "Only -removeNamespace is supported"))?
                    .to_string();
                if !cmd.has_flag("mergeNamespaceWithRoot") {
                    return Err(HostError::rejected(
                        name,
                        format!("Namespace '{}' is not empty", namespace),
                    ));
                }
                self.merge_namespace(&namespace)?;
                Ok(Value::Null)
            }
            "keyframe" => {
                let curve = arg_string(cmd, 0)?;
                self.require_node(&curve)?;
                let times = self
                    .attribute(&format!("{}.{}", curve, KEY_TIMES_ATTR))
                    .cloned()
                    .unwrap_or_else(|| json!([]));
                Ok(times)
            }
            "setKeyframe" => {
                let plug = arg_string(cmd, 0)?;
                let (node, attr) = split_plug(&plug);
                let (node, attr) = (node.to_string(), attr.to_string());
                if !self.require_node(&node)?.has_attribute(&attr) {
                    return Err(HostError::attribute(plug, "No such attribute"));
                }
                let time = self.current_time;
                let existing = self
                    .connections
                    .iter()
                    .find(|(_, dst)| *dst == plug)
                    .map(|(src, _)| split_plug(src).0.to_string());
                match existing {
                    Some(curve) => {
                        if let Some(node) = self.nodes.get_mut(&curve) {
                            let mut times = node
                                .attributes
                                .get(KEY_TIMES_ATTR)
                                .map(value_to_f64s)
                                .unwrap_or_default();
                            if !times.contains(&time) {
                                times.push(time);
                                times.sort_by(f64::total_cmp);
                            }
                            node.attributes
                                .insert(KEY_TIMES_ATTR.to_string(), json!(times));
                        }
                    }
                    None => {
                        self.add_anim_curve(&node, &attr, &[time]);
                    }
                }
                Ok(json!(1))
            }
            "bakeResults" => {
                let nodes: Vec<String> = cmd
                    .arguments()
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                if nodes.is_empty() {
                    return Err(HostError::rejected(name, "No objects to bake"));
                }
                for node in &nodes {
                    self.require_node(node)?;
                }
                let range = cmd
                    .flag_value("time")
                    .and_then(Value::as_str)
                    .ok_or_else(|| HostError::rejected(name, "Missing -time"))?;
                let (start, end) = parse_time_range(range)
                    .ok_or_else(|| HostError::rejected(name, format!("Bad time range '{}'", range)))?;
                self.bakes.push(BakeRecord {
                    nodes,
                    start,
                    end,
                    flags: cmd.flags().to_vec(),
                });
                Ok(Value::Null)
            }
            "delete" => {
                let targets: Vec<String> = cmd
                    .arguments()
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                for target in &targets {
                    self.require_node(target)?;
                }
                for target in &targets {
                    self.delete_node(target);
                }
                Ok(Value::Null)
            }
            "ls" => {
                let node_type = cmd
                    .flag_value("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| HostError::rejected(name, "Only -type listing is supported"))?;
                Ok(json!(self.nodes_of_type(node_type)))
            }
            "referenceQuery" => {
                let node = arg_string(cmd, 0)?;
                let reference = self
                    .references
                    .iter()
                    .find(|r| r.node == node)
                    .ok_or_else(|| HostError::rejected(name, format!("'{}' is not a reference", node)))?;
                if cmd.has_flag("filename") {
                    Ok(json!(reference.path))
                } else if cmd.has_flag("namespace") {
                    Ok(json!(format!(":{}", reference.namespace)))
                } else {
                    Err(HostError::rejected(name, "Nothing to query"))
                }
            }
            "file" => self.file_command(cmd),
            "about" => Ok(json!("fake")),
            other => Err(HostError::rejected(
                other,
                format!("Cannot find procedure \"{}\"", other),
            )),
        }
    }

    fn list_connections(&self, cmd: &Command) -> HostResult<Value> {
        let target = arg_string(cmd, 0)?;
        let (node, _) = split_plug(&target);
        self.require_node(node)?;
        let is_plug = target.contains('.');
        let want_source = cmd.flag_value("source").map(value_as_bool).unwrap_or(true);
        let want_dest = cmd
            .flag_value("destination")
            .map(value_as_bool)
            .unwrap_or(true);
        let type_filter = cmd.flag_value("type").and_then(Value::as_str);

        let matches_end = |plug: &str| {
            if is_plug {
                plug == target
            } else {
                split_plug(plug).0 == target
            }
        };

        let mut found: Vec<String> = Vec::new();
        for (src, dst) in &self.connections {
            let other = if want_source && matches_end(dst) {
                split_plug(src).0
            } else if want_dest && matches_end(src) {
                split_plug(dst).0
            } else {
                continue;
            };
            let Some(other_node) = self.nodes.get(other) else {
                continue;
            };
            if let Some(filter) = type_filter {
                if !other_node.node_type.starts_with(filter) {
                    continue;
                }
            }
            if !found.iter().any(|f| f == other) {
                found.push(other.to_string());
            }
        }
        Ok(json!(found))
    }

    fn file_command(&mut self, cmd: &Command) -> HostResult<Value> {
        if cmd.has_flag("importReference") {
            let path = arg_string(cmd, 0)?;
            let index = self
                .references
                .iter()
                .position(|r| r.path == path && r.loaded)
                .ok_or_else(|| HostError::rejected("file", format!("No loaded reference of {}", path)))?;
            let reference = self.references.remove(index);
            self.nodes.remove(&reference.node);
            return Ok(Value::Null);
        }
        if let Some(reference) = cmd.flag_value("loadReference").and_then(Value::as_str) {
            let reference = reference.to_string();
            let entry = self
                .references
                .iter_mut()
                .find(|r| r.node == reference)
                .ok_or_else(|| HostError::rejected("file", format!("'{}' is not a reference", reference)))?;
            entry.loaded = true;
            return Ok(Value::Null);
        }

        let path = arg_string(cmd, 0)?;
        let asset = self
            .files
            .get(&path)
            .cloned()
            .ok_or_else(|| HostError::rejected("file", format!("File not found: {}", path)))?;
        let namespace = cmd
            .flag_value("namespace")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        if cmd.has_flag("import") {
            self.instantiate(&asset, &namespace);
            Ok(json!(path))
        } else if cmd.has_flag("reference") {
            self.instantiate(&asset, &namespace);
            self.push_reference(&path, &namespace, true);
            Ok(json!(path))
        } else {
            Err(HostError::rejected("file", "Expected -import or -reference"))
        }
    }
}

impl Host for FakeHost {
    fn object_exists(&mut self, name: &str) -> HostResult<bool> {
        Ok(self.nodes.contains_key(name))
    }

    fn get_attribute(&mut self, plug: &str) -> HostResult<Value> {
        let (node, attr) = split_plug(plug);
        self.require_node(node)?
            .attributes
            .get(attr)
            .cloned()
            .ok_or_else(|| HostError::attribute(plug, "No such attribute"))
    }

    fn set_attribute(&mut self, plug: &str, value: &Value) -> HostResult<()> {
        let (node, attr) = split_plug(plug);
        let node = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| HostError::node_not_found(node))?;
        if node.locked.contains(attr) {
            return Err(HostError::AttributeLocked {
                plug: plug.to_string(),
            });
        }
        match node.attributes.get_mut(attr) {
            Some(slot) => {
                *slot = value.clone();
                Ok(())
            }
            None => Err(HostError::attribute(plug, "No such attribute")),
        }
    }

    fn is_attribute_locked(&mut self, plug: &str) -> HostResult<bool> {
        let (node, attr) = split_plug(plug);
        let node = self.require_node(node)?;
        if !node.has_attribute(attr) {
            return Err(HostError::attribute(plug, "No such attribute"));
        }
        Ok(node.locked.contains(attr))
    }

    fn selection(&mut self) -> HostResult<Vec<String>> {
        Ok(self.selection.clone())
    }

    fn select(&mut self, nodes: &[String]) -> HostResult<()> {
        for node in nodes {
            self.require_node(node)?;
        }
        self.selection = nodes.to_vec();
        Ok(())
    }

    fn run_command(&mut self, command: &Command) -> HostResult<Value> {
        self.commands.push(command.clone());
        self.dispatch(command)
    }
}

/// Name the fake gives the retargeter of a definition.
pub fn retargeter_name(definition: &str) -> String {
    format!("{}_Retargeter", definition)
}

fn namespace_prefix(namespace: &str) -> String {
    if namespace.is_empty() || namespace.ends_with(':') {
        namespace.to_string()
    } else {
        format!("{}:", namespace)
    }
}

fn split_plug(plug: &str) -> (&str, &str) {
    match plug.find('.') {
        Some(idx) => (&plug[..idx], &plug[idx + 1..]),
        None => (plug, ""),
    }
}

fn arg_string(cmd: &Command, index: usize) -> HostResult<String> {
    cmd.arg_str(index).map(str::to_string).ok_or_else(|| {
        HostError::rejected(cmd.name(), format!("Missing string argument {}", index))
    })
}

fn arg_slot(cmd: &Command, index: usize) -> HostResult<SlotId> {
    cmd.arg_u64(index)
        .and_then(|v| SlotId::try_from(v).ok())
        .ok_or_else(|| HostError::rejected(cmd.name(), format!("Missing integer argument {}", index)))
}

fn arg_f64(cmd: &Command, index: usize) -> HostResult<f64> {
    cmd.arguments()
        .get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| HostError::rejected(cmd.name(), format!("Missing number argument {}", index)))
}

fn parse_time_range(range: &str) -> Option<(f64, f64)> {
    let (start, end) = range.split_once(':')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_assignment_rejected_when_locked() {
        let mut host = FakeHost::new();
        host.add_joint("Hip");
        host.run_command(&Command::new("hikCreateCharacter").arg("C1"))
            .unwrap();
        host.set_attribute("C1.InputCharacterizationLock", &json!(true))
            .unwrap();

        let err = host
            .run_command(
                &Command::new("setCharacterObject")
                    .arg("Hip")
                    .arg("C1")
                    .arg(1)
                    .arg(0),
            )
            .unwrap_err();
        assert!(err.to_string().contains("locked"));
        assert_eq!(host.definition_slot("C1", 1), None);
    }

    #[test]
    fn test_slot_assignment_connects_joint() {
        let mut host = FakeHost::new();
        host.add_joint("Hip");
        host.run_command(&Command::new("hikCreateCharacter").arg("C1"))
            .unwrap();
        host.run_command(
            &Command::new("setCharacterObject")
                .arg("Hip")
                .arg("C1")
                .arg(1)
                .arg(0),
        )
        .unwrap();
        assert_eq!(host.definition_slot("C1", 1), Some("Hip".to_string()));

        let found = host
            .run_command(
                &Command::new("listConnections")
                    .flag("source", false)
                    .flag("destination", true)
                    .flag("type", CHARACTER_NODE_TYPE)
                    .arg("Hip.Character"),
            )
            .unwrap();
        assert_eq!(found, json!(["C1"]));
    }

    #[test]
    fn test_retargeter_requires_lock() {
        let mut host = FakeHost::new();
        host.run_command(&Command::new("hikCreateCharacter").arg("C1"))
            .unwrap();
        assert!(host
            .run_command(&Command::new("RetargeterCreate").arg("C1"))
            .is_err());
        host.set_attribute("C1.InputCharacterizationLock", &json!(true))
            .unwrap();
        host.run_command(&Command::new("RetargeterCreate").arg("C1"))
            .unwrap();
        assert!(host.retargeter("C1").is_some());
    }

    #[test]
    fn test_delete_removes_hierarchy() {
        let mut host = FakeHost::new();
        host.add_joint("Hip").add_joint("LThigh").set_parent("LThigh", "Hip");
        host.run_command(&Command::new("delete").arg("Hip")).unwrap();
        assert!(host.node("Hip").is_none());
        assert!(host.node("LThigh").is_none());
    }

    #[test]
    fn test_locked_attribute_blocks_set() {
        let mut host = FakeHost::new();
        host.add_control("IKLeg_L").lock_attribute("IKLeg_L.rotateX");
        assert!(host.is_attribute_locked("IKLeg_L.rotateX").unwrap());
        assert!(!host.is_attribute_locked("IKLeg_L.rotate").unwrap());
        assert!(matches!(
            host.set_attribute("IKLeg_L.rotateX", &json!(1.0)),
            Err(HostError::AttributeLocked { .. })
        ));
    }

    #[test]
    fn test_set_keyframe_extends_curve() {
        let mut host = FakeHost::new();
        host.add_joint("Hip");
        host.run_command(&Command::new("setKeyframe").arg("Hip.rotateX"))
            .unwrap();
        host.run_command(&Command::new("currentTime").arg(10.0))
            .unwrap();
        host.run_command(&Command::new("setKeyframe").arg("Hip.rotateX"))
            .unwrap();
        assert_eq!(host.key_times("Hip.rotateX"), vec![1.0, 10.0]);
    }

    #[test]
    fn test_import_instantiates_with_namespace() {
        let mut host = FakeHost::new();
        host.register_file(
            "/takes/walk.fbx",
            FakeAsset::new()
                .joint("Hip")
                .child_joint("LThigh", "Hip")
                .keys("Hip", "rotateX", &[1.0, 48.0]),
        );
        host.run_command(
            &Command::new("file")
                .switch("import")
                .flag("namespace", "walk")
                .arg("/takes/walk.fbx"),
        )
        .unwrap();
        assert!(host.node("walk:Hip").is_some());
        assert_eq!(
            host.node("walk:LThigh").unwrap().parent.as_deref(),
            Some("walk:Hip")
        );
        assert_eq!(host.key_times("walk:Hip.rotateX"), vec![1.0, 48.0]);
    }

    #[test]
    fn test_world_space_transforms() {
        let mut host = FakeHost::new();
        host.add_joint("Hip")
            .add_joint("LThigh")
            .set_parent("LThigh", "Hip")
            .set_translation("Hip", [0.0, 90.0, 0.0])
            .set_translation("LThigh", [10.0, -5.0, 0.0]);
        assert_eq!(host.world_position("LThigh"), Some([10.0, 85.0, 0.0]));

        host.run_command(
            &Command::new("rotate")
                .switch("worldSpace")
                .switch("relative")
                .args([0.0, 0.0, 45.0])
                .arg("LThigh"),
        )
        .unwrap();
        host.run_command(
            &Command::new("rotate")
                .switch("worldSpace")
                .switch("relative")
                .args([0.0, 0.0, 5.0])
                .arg("LThigh"),
        )
        .unwrap();
        assert_eq!(host.rotation("LThigh"), Some([0.0, 0.0, 50.0]));

        host.lock_attribute("Hip.rotate");
        assert!(host
            .run_command(
                &Command::new("rotate")
                    .switch("relative")
                    .args([1.0, 0.0, 0.0])
                    .arg("Hip"),
            )
            .is_err());
    }

    #[test]
    fn test_namespace_merge_renames_everything() {
        let mut host = FakeHost::new();
        host.add_joint("rig:Root_M")
            .add_joint("rig:Hip_R")
            .set_parent("rig:Hip_R", "rig:Root_M")
            .add_anim_curve("rig:Root_M", "rotateX", &[1.0, 2.0])
            .set_selection(&["rig:Hip_R"]);
        host.run_command(
            &Command::new("namespace")
                .flag("removeNamespace", "rig")
                .switch("mergeNamespaceWithRoot"),
        )
        .unwrap();

        assert!(host.node("rig:Root_M").is_none());
        assert_eq!(host.node("Hip_R").unwrap().parent.as_deref(), Some("Root_M"));
        assert_eq!(host.key_times("Root_M.rotateX"), vec![1.0, 2.0]);
        assert_eq!(host.current_selection(), &["Hip_R".to_string()]);
    }

    #[test]
    fn test_namespace_merge_refuses_clashes() {
        let mut host = FakeHost::new();
        host.add_joint("rig:Root_M").add_joint("Root_M");
        let err = host
            .run_command(
                &Command::new("namespace")
                    .flag("removeNamespace", "rig")
                    .switch("mergeNamespaceWithRoot"),
            )
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(host.node("rig:Root_M").is_some());
    }

    #[test]
    fn test_character_input_creates_solver() {
        let mut host = FakeHost::new();
        for def in ["Mocap1", "Rig1"] {
            host.run_command(&Command::new("hikCreateCharacter").arg(def))
                .unwrap();
            host.set_attribute(&format!("{}.InputCharacterizationLock", def), &json!(true))
                .unwrap();
        }
        host.run_command(
            &Command::new("hikSetCharacterInput")
                .arg("Rig1")
                .arg("Mocap1"),
        )
        .unwrap();
        assert_eq!(host.nodes_of_type(SOLVER_NODE_TYPE), vec!["Rig1_Solver".to_string()]);

        host.run_command(&Command::new("delete").arg("Rig1")).unwrap();
        assert!(host.nodes_of_type(SOLVER_NODE_TYPE).is_empty());
    }

    #[test]
    fn test_unknown_command_rejected() {
        let mut host = FakeHost::new();
        let err = host.run_command(&Command::new("nope")).unwrap_err();
        assert!(err.to_string().contains("Cannot find procedure"));
    }
}
