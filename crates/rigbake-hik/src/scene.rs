//! Explicit host context and the HumanIK command protocol.
//!
//! A [`Scene`] wraps the host for the duration of one operation. All ambient
//! host state rigbake touches (current time, playback range, selection,
//! current character) is read and written through it, and every host
//! command rigbake issues is built here.

use rigbake_mapping::SlotId;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;

use crate::bake::BakeOptions;
use crate::error::{HostError, HostResult};
use crate::host::{value_as_bool, value_as_string, value_to_f64s, value_to_strings, Command, Host};
use crate::namespace::Namespace;
use crate::outcome::Channel;

/// Attribute holding a definition's characterization lock.
pub const CHARACTERIZATION_LOCK_ATTR: &str = "InputCharacterizationLock";

/// Node type of characterization definitions.
pub const CHARACTER_NODE_TYPE: &str = "HIKCharacterNode";

/// Node type of the solvers linking a destination definition to its source.
pub const SOLVER_NODE_TYPE: &str = "HIKRetargeterNode";

/// Inclusive frame range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameRange {
    pub start: f64,
    pub end: f64,
}

impl FrameRange {
    /// Creates a range.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// `start:end` as the bake command expects it.
    pub fn to_time_arg(&self) -> String {
        format!("{}:{}", self.start, self.end)
    }
}

/// Direction filter for connection queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Nodes feeding into the target.
    Incoming,
    /// Nodes the target feeds.
    Outgoing,
}

/// A file reference in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceInfo {
    /// Reference node name.
    pub node: String,
    /// Referenced file path as the host reports it.
    pub path: String,
    /// Namespace the reference is loaded under.
    pub namespace: Namespace,
}

/// Host context threaded through every retarget component.
pub struct Scene<'h> {
    host: &'h mut dyn Host,
}

impl<'h> Scene<'h> {
    /// Wraps a host.
    pub fn new(host: &'h mut dyn Host) -> Self {
        Self { host }
    }

    /// Direct host access.
    pub fn host(&mut self) -> &mut dyn Host {
        &mut *self.host
    }

    /// Runs a command, logging it at debug level.
    pub fn run(&mut self, command: Command) -> HostResult<Value> {
        log::debug!("host command {} {:?}", command.name(), command.arguments());
        self.host.run_command(&command)
    }

    // ========== Nodes and attributes ==========

    /// Returns true if `name` exists.
    pub fn exists(&mut self, name: &str) -> HostResult<bool> {
        self.host.object_exists(name)
    }

    /// Reads an attribute.
    pub fn get_attribute(&mut self, plug: &str) -> HostResult<Value> {
        self.host.get_attribute(plug)
    }

    /// Writes an attribute.
    pub fn set_attribute(&mut self, plug: &str, value: Value) -> HostResult<()> {
        self.host.set_attribute(plug, &value)
    }

    /// Returns true if `node.attribute` or any of its X/Y/Z children is locked.
    pub fn is_locked(&mut self, node: &str, attribute: &str) -> HostResult<bool> {
        let attribute = attribute.trim_start_matches('.');
        for suffix in ["", "X", "Y", "Z"] {
            let plug = format!("{}.{}{}", node, attribute, suffix);
            if self.host.is_attribute_locked(&plug)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Deletes nodes (and their DAG children).
    pub fn delete(&mut self, nodes: &[String]) -> HostResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        self.run(Command::new("delete").args(nodes.iter().cloned()))?;
        Ok(())
    }

    /// Lists nodes connected to `target` (a node or a plug).
    pub fn list_connections(
        &mut self,
        target: &str,
        direction: Direction,
        node_type: Option<&str>,
    ) -> HostResult<Vec<String>> {
        let (source, destination) = match direction {
            Direction::Incoming => (true, false),
            Direction::Outgoing => (false, true),
        };
        let mut cmd = Command::new("listConnections")
            .flag("source", source)
            .flag("destination", destination)
            .flag("skipConversionNodes", false);
        if let Some(node_type) = node_type {
            cmd = cmd.flag("type", node_type);
        }
        let reply = self.run(cmd.arg(target))?;
        Ok(value_to_strings(&reply))
    }

    /// Names of every node of `node_type`.
    pub fn list_nodes_of_type(&mut self, node_type: &str) -> HostResult<Vec<String>> {
        let reply = self.run(Command::new("ls").flag("type", node_type))?;
        Ok(value_to_strings(&reply))
    }

    // ========== Transforms ==========

    /// World-space translation of a node.
    pub fn world_translation(&mut self, node: &str) -> HostResult<[f64; 3]> {
        let reply = self.run(
            Command::new("xform")
                .switch("query")
                .switch("worldSpace")
                .switch("translation")
                .arg(node),
        )?;
        match value_to_f64s(&reply).as_slice() {
            [x, y, z] => Ok([*x, *y, *z]),
            _ => Err(HostError::unexpected_reply("xform", reply.to_string())),
        }
    }

    /// Moves a node to a world-space position.
    pub fn set_world_translation(&mut self, node: &str, position: [f64; 3]) -> HostResult<()> {
        self.run(
            Command::new("xform")
                .switch("worldSpace")
                .flag("translation", json!(position))
                .arg(node),
        )?;
        Ok(())
    }

    /// Rotates a node by X/Y/Z degrees in world space, relative to its
    /// current orientation.
    pub fn rotate_world_relative(&mut self, node: &str, degrees: [f64; 3]) -> HostResult<()> {
        self.run(
            Command::new("rotate")
                .switch("worldSpace")
                .switch("relative")
                .args(degrees)
                .arg(node),
        )?;
        Ok(())
    }

    // ========== Selection ==========

    /// Current selection.
    pub fn selection(&mut self) -> HostResult<Vec<String>> {
        self.host.selection()
    }

    /// Replaces the selection.
    pub fn select(&mut self, nodes: &[String]) -> HostResult<()> {
        self.host.select(nodes)
    }

    /// Runs `f` and restores the selection afterwards.
    ///
    /// Nodes that no longer exist are dropped from the restored selection.
    pub fn preserve_selection<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> T,
    ) -> HostResult<T> {
        let saved = self.selection()?;
        let result = f(self);
        let mut restore = Vec::with_capacity(saved.len());
        for node in saved {
            if self.exists(&node)? {
                restore.push(node);
            }
        }
        self.select(&restore)?;
        Ok(result)
    }

    // ========== Time ==========

    /// Moves the current time.
    pub fn set_current_time(&mut self, time: f64) -> HostResult<()> {
        self.run(Command::new("currentTime").arg(time))?;
        Ok(())
    }

    /// Reads the current time.
    pub fn current_time(&mut self) -> HostResult<f64> {
        let reply = self.run(Command::new("currentTime").switch("query"))?;
        Ok(value_to_f64s(&reply).first().copied().unwrap_or_default())
    }

    /// Reads the playback range.
    pub fn playback_range(&mut self) -> HostResult<FrameRange> {
        let min = self.run(
            Command::new("playbackOptions")
                .switch("query")
                .switch("minTime"),
        )?;
        let max = self.run(
            Command::new("playbackOptions")
                .switch("query")
                .switch("maxTime"),
        )?;
        Ok(FrameRange::new(
            value_to_f64s(&min).first().copied().unwrap_or_default(),
            value_to_f64s(&max).first().copied().unwrap_or_default(),
        ))
    }

    /// Sets the playback range.
    pub fn set_playback_range(&mut self, range: FrameRange) -> HostResult<()> {
        self.run(
            Command::new("playbackOptions")
                .flag("minTime", range.start)
                .flag("maxTime", range.end),
        )?;
        Ok(())
    }

    /// Key times on an animation curve.
    pub fn keyframe_times(&mut self, curve: &str) -> HostResult<Vec<f64>> {
        let reply = self.run(
            Command::new("keyframe")
                .switch("query")
                .switch("timeChange")
                .arg(curve),
        )?;
        Ok(value_to_f64s(&reply))
    }

    /// Keys a plug at the current time.
    pub fn set_keyframe(&mut self, plug: &str) -> HostResult<()> {
        self.run(Command::new("setKeyframe").arg(plug))?;
        Ok(())
    }

    /// Bakes `nodes` over `range`.
    pub fn bake_results(
        &mut self,
        nodes: &[String],
        range: FrameRange,
        options: &BakeOptions,
    ) -> HostResult<()> {
        let mut cmd = Command::new("bakeResults")
            .flag("simulation", options.simulation)
            .flag("time", range.to_time_arg())
            .flag("sampleBy", options.sample_by);
        for (flag, value) in options.flags() {
            cmd = cmd.flag(flag, value);
        }
        self.run(cmd.args(nodes.iter().cloned()))?;
        Ok(())
    }

    // ========== Characterization ==========

    /// Creates a characterization definition and returns its name.
    pub fn create_character(&mut self, name: &str) -> HostResult<String> {
        let reply = self.run(Command::new("hikCreateCharacter").arg(name))?;
        Ok(value_as_string(&reply).unwrap_or_else(|| name.to_string()))
    }

    /// Refreshes the host's character list UI state.
    pub fn update_character_list(&mut self) -> HostResult<()> {
        self.run(Command::new("hikUpdateCharacterList"))?;
        Ok(())
    }

    /// Makes `definition` the current character.
    pub fn set_current_character(&mut self, definition: &str) -> HostResult<()> {
        self.run(Command::new("hikSetCurrentCharacter").arg(definition))?;
        Ok(())
    }

    /// Captures the stance pose offsets; required right before locking.
    pub fn read_stance_pose(&mut self, definition: &str) -> HostResult<()> {
        self.run(Command::new("hikReadStancePoseTRSOffsets").arg(definition))?;
        Ok(())
    }

    /// Returns the characterization lock state.
    pub fn is_characterization_locked(&mut self, definition: &str) -> HostResult<bool> {
        let plug = format!("{}.{}", definition, CHARACTERIZATION_LOCK_ATTR);
        Ok(value_as_bool(&self.get_attribute(&plug)?))
    }

    /// Writes the characterization lock state.
    pub fn set_characterization_lock(&mut self, definition: &str, locked: bool) -> HostResult<()> {
        let plug = format!("{}.{}", definition, CHARACTERIZATION_LOCK_ATTR);
        self.set_attribute(&plug, json!(locked))
    }

    /// Binds a scene joint to a definition slot.
    pub fn set_character_object(
        &mut self,
        node: &str,
        definition: &str,
        slot: SlotId,
    ) -> HostResult<()> {
        self.run(
            Command::new("setCharacterObject")
                .arg(node)
                .arg(definition)
                .arg(slot)
                .arg(0),
        )?;
        Ok(())
    }

    /// Characterization node name of a slot id; `None` for unused ids.
    pub fn hik_node_name(&mut self, slot: SlotId) -> HostResult<Option<String>> {
        let reply = self.run(Command::new("GetHIKNodeName").arg(slot))?;
        Ok(value_as_string(&reply))
    }

    /// Links `source` as the live input of `destination`.
    pub fn set_character_input(&mut self, destination: &str, source: &str) -> HostResult<()> {
        self.run(
            Command::new("hikSetCharacterInput")
                .arg(destination)
                .arg(source),
        )?;
        Ok(())
    }

    /// Live input of `definition`, if any.
    pub fn character_input(&mut self, definition: &str) -> HostResult<Option<String>> {
        let reply = self.run(Command::new("hikGetCharacterInputString").arg(definition))?;
        Ok(value_as_string(&reply))
    }

    // ========== Control rig ==========

    /// Body-part name the control rig uses for a slot.
    pub fn custom_rig_element_name(&mut self, definition: &str, slot: SlotId) -> HostResult<String> {
        let reply = self.run(
            Command::new("hikCustomRigElementNameFromId")
                .arg(definition)
                .arg(slot),
        )?;
        Ok(value_as_string(&reply).unwrap_or_default())
    }

    /// Name of the retargeter belonging to `definition`.
    pub fn retargeter_name(&mut self, definition: &str) -> HostResult<String> {
        let reply = self.run(Command::new("RetargeterGetName").arg(definition))?;
        Ok(value_as_string(&reply).unwrap_or_default())
    }

    /// Returns true if the retargeter exists.
    pub fn retargeter_exists(&mut self, retargeter: &str) -> HostResult<bool> {
        if retargeter.is_empty() {
            return Ok(false);
        }
        let reply = self.run(Command::new("RetargeterExists").arg(retargeter))?;
        Ok(value_as_bool(&reply))
    }

    /// Creates the retargeter of `definition`.
    pub fn create_retargeter(&mut self, definition: &str) -> HostResult<()> {
        self.run(Command::new("RetargeterCreate").arg(definition))?;
        Ok(())
    }

    /// Drives `node` from a slot on one channel.
    pub fn add_retargeter_mapping(
        &mut self,
        retargeter: &str,
        body_part: &str,
        channel: Channel,
        node: &str,
        slot: SlotId,
    ) -> HostResult<()> {
        self.run(
            Command::new("RetargeterAddMapping")
                .arg(retargeter)
                .arg(body_part)
                .arg(channel.code())
                .arg(node)
                .arg(slot),
        )?;
        Ok(())
    }

    /// Deletes a retargeter.
    pub fn delete_retargeter(&mut self, retargeter: &str) -> HostResult<()> {
        self.run(Command::new("RetargeterDelete").arg(retargeter))?;
        Ok(())
    }

    // ========== Files and references ==========

    /// Imports a file into `namespace`.
    pub fn import_file(&mut self, path: &Path, namespace: &Namespace) -> HostResult<()> {
        self.run(
            Command::new("file")
                .switch("import")
                .flag("namespace", namespace.name())
                .arg(path.to_string_lossy().to_string()),
        )?;
        Ok(())
    }

    /// References a file under `namespace`.
    pub fn reference_file(&mut self, path: &Path, namespace: &Namespace) -> HostResult<()> {
        self.run(
            Command::new("file")
                .switch("reference")
                .flag("namespace", namespace.name())
                .arg(path.to_string_lossy().to_string()),
        )?;
        Ok(())
    }

    /// Loads an unloaded reference.
    pub fn load_reference(&mut self, reference_node: &str) -> HostResult<()> {
        self.run(Command::new("file").flag("loadReference", reference_node))?;
        Ok(())
    }

    /// Turns a loaded reference into ordinary scene nodes. The nodes keep
    /// their namespace; the reference itself goes away.
    pub fn import_reference(&mut self, path: &str) -> HostResult<()> {
        self.run(Command::new("file").switch("importReference").arg(path))?;
        Ok(())
    }

    /// Removes `namespace`, moving its nodes into the root namespace.
    pub fn merge_namespace_into_root(&mut self, namespace: &Namespace) -> HostResult<()> {
        self.run(
            Command::new("namespace")
                .flag("removeNamespace", namespace.name())
                .switch("mergeNamespaceWithRoot"),
        )?;
        Ok(())
    }

    /// Lists scene references. References without a file are skipped.
    pub fn list_references(&mut self) -> HostResult<Vec<ReferenceInfo>> {
        let nodes = self.list_nodes_of_type("reference")?;
        let mut references = Vec::new();
        for node in nodes {
            let path = match self.run(
                Command::new("referenceQuery")
                    .switch("filename")
                    .arg(node.as_str()),
            ) {
                Ok(reply) => value_as_string(&reply),
                Err(e) => {
                    log::debug!("skipping reference {}: {}", node, e);
                    None
                }
            };
            let Some(path) = path else {
                continue;
            };
            let namespace = self.run(
                Command::new("referenceQuery")
                    .switch("namespace")
                    .arg(node.as_str()),
            )?;
            references.push(ReferenceInfo {
                node,
                path,
                namespace: Namespace::new(&value_as_string(&namespace).unwrap_or_default()),
            });
        }
        Ok(references)
    }
}
