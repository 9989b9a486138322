//! Per-entry binding outcomes.
//!
//! Mapping joints and controls never stops on the first bad entry. Each entry
//! gets an [`EntryOutcome`] and the caller receives the whole
//! [`MappingReport`], so incomplete rigs still characterize.

use rigbake_mapping::SlotId;
use serde::Serialize;

/// How one mapping entry ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum EntryStatus {
    /// Bound to its slot.
    Bound,
    /// Present but intentionally not bound (e.g., every channel locked).
    Skipped(String),
    /// The node is not in the scene.
    NotFound,
    /// The host refused the binding.
    Rejected(String),
}

/// Retargeting channel of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Rotation, always attempted.
    Rotate,
    /// Translation, attempted for controls that are not rotation-only.
    Translate,
}

impl Channel {
    /// Channel code used by the host retargeter.
    pub fn code(&self) -> &'static str {
        match self {
            Channel::Rotate => "R",
            Channel::Translate => "T",
        }
    }

    /// Compound attribute the channel drives.
    pub fn attribute(&self) -> &'static str {
        match self {
            Channel::Rotate => "rotate",
            Channel::Translate => "translate",
        }
    }
}

/// What happened to one channel of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Added to the retargeter.
    Mapped,
    /// The attribute is locked; the channel was left alone.
    Locked,
    /// The control is rotation-only; no translation channel.
    RotationOnly,
}

/// Outcome of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelOutcome {
    pub channel: Channel,
    pub status: ChannelStatus,
}

/// Outcome of one mapping entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryOutcome {
    /// Name as written in the mapping.
    pub name: String,
    /// Namespace-qualified scene node.
    pub node: String,
    /// Slot the entry targets.
    pub slot: SlotId,
    #[serde(flatten)]
    pub status: EntryStatus,
    /// Channel detail, only for controls.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<ChannelOutcome>,
}

impl EntryOutcome {
    /// Creates an outcome with no channel detail.
    pub fn new(name: &str, node: &str, slot: SlotId, status: EntryStatus) -> Self {
        Self {
            name: name.to_string(),
            node: node.to_string(),
            slot,
            status,
            channels: Vec::new(),
        }
    }

    /// Returns true if the entry was bound.
    pub fn is_bound(&self) -> bool {
        self.status == EntryStatus::Bound
    }

    /// Returns true if the entry failed (missing or rejected).
    pub fn is_failure(&self) -> bool {
        matches!(
            self.status,
            EntryStatus::NotFound | EntryStatus::Rejected(_)
        )
    }

    /// Returns the status of a channel, if it was considered.
    pub fn channel(&self, channel: Channel) -> Option<ChannelStatus> {
        self.channels
            .iter()
            .find(|c| c.channel == channel)
            .map(|c| c.status)
    }

    /// Warning text for failed entries.
    pub fn warning(&self) -> Option<String> {
        match &self.status {
            EntryStatus::NotFound => Some(format!("{} not found", self.node)),
            EntryStatus::Rejected(reason) => {
                Some(format!("problem in mapping to {}: {}", self.node, reason))
            }
            _ => None,
        }
    }
}

/// All entry outcomes of one mapping pass, in mapping order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingReport {
    pub entries: Vec<EntryOutcome>,
}

impl MappingReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome, logging a warning if it failed.
    pub fn record(&mut self, outcome: EntryOutcome) {
        if let Some(warning) = outcome.warning() {
            log::warn!("{}", warning);
        }
        self.entries.push(outcome);
    }

    /// Outcome for a mapping name.
    pub fn get(&self, name: &str) -> Option<&EntryOutcome> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Bound entries.
    pub fn bound(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.entries.iter().filter(|e| e.is_bound())
    }

    /// Failed entries.
    pub fn failures(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.entries.iter().filter(|e| e.is_failure())
    }

    /// Qualified names of bound nodes.
    pub fn bound_nodes(&self) -> Vec<String> {
        self.bound().map(|e| e.node.clone()).collect()
    }

    /// Warning messages, one per failed entry.
    pub fn warnings(&self) -> Vec<String> {
        self.entries.iter().filter_map(EntryOutcome::warning).collect()
    }

    /// Number of bound entries.
    pub fn bound_count(&self) -> usize {
        self.bound().count()
    }

    /// Number of failed entries.
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Returns true if nothing failed.
    pub fn is_complete(&self) -> bool {
        self.failure_count() == 0
    }
}
