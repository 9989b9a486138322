//! How well a mapping matches what is in the scene.

use rigbake_mapping::JointMapping;
use serde::Serialize;

use crate::error::HostResult;
use crate::namespace::Namespace;
use crate::scene::Scene;

/// Presence of a mapping's nodes under one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Coverage {
    /// Qualified nodes present.
    pub found: Vec<String>,
    /// Qualified nodes absent.
    pub missing: Vec<String>,
}

impl Coverage {
    /// Number of mapped names.
    pub fn total(&self) -> usize {
        self.found.len() + self.missing.len()
    }

    /// Fraction of mapped names present, 0 for an empty mapping.
    pub fn ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.found.len() as f64 / total as f64,
        }
    }

    /// Returns true if every mapped node is present.
    pub fn is_full(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Checks which mapped nodes exist under `namespace`.
pub fn mapping_coverage(
    scene: &mut Scene<'_>,
    mapping: &JointMapping,
    namespace: &Namespace,
) -> HostResult<Coverage> {
    let mut coverage = Coverage::default();
    for name in mapping.names() {
        let node = namespace.qualify(name);
        if scene.exists(&node)? {
            coverage.found.push(node);
        } else {
            coverage.missing.push(node);
        }
    }
    Ok(coverage)
}

/// The mapping's root node under `namespace`, if the mapping defines one and
/// it is in the scene.
pub fn find_mapping_root(
    scene: &mut Scene<'_>,
    mapping: &JointMapping,
    namespace: &Namespace,
) -> HostResult<Option<String>> {
    let Some(root) = mapping.root() else {
        return Ok(None);
    };
    let node = namespace.qualify(root);
    Ok(scene.exists(&node)?.then_some(node))
}
