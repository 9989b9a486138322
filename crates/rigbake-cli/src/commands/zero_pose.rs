//! Zero-pose command implementation
//!
//! Zeroes (and optionally keys) the rotations of every mapped joint.

use anyhow::{Context, Result};
use colored::Colorize;
use rigbake_hik::skeleton::{key_rotations, zero_rotations};
use rigbake_hik::{Namespace, Scene};
use rigbake_mapping::{MappingKind, MappingStore};
use std::process::ExitCode;

/// Run the zero-pose command
pub fn run(
    store: &MappingStore,
    port: Option<&str>,
    mapping: &str,
    namespace: Option<&str>,
    key: bool,
) -> Result<ExitCode> {
    let mut host = super::connect(port)?;
    let mut scene = Scene::new(&mut host);
    execute(&mut scene, store, mapping, namespace, key)
}

/// Zeroes rotations in an explicit scene.
pub fn execute(
    scene: &mut Scene<'_>,
    store: &MappingStore,
    mapping: &str,
    namespace: Option<&str>,
    key: bool,
) -> Result<ExitCode> {
    let joints = store
        .load(mapping, MappingKind::Skeleton)
        .with_context(|| format!("Failed to load mapping {}", mapping))?;
    let namespace = namespace.map(Namespace::new).unwrap_or_default();

    let zeroed = zero_rotations(scene, &namespace, &joints);
    println!(
        "{} {} joints in {}",
        "Zeroed:".green().bold(),
        zeroed.bound_count(),
        namespace
    );
    if key {
        let keyed = key_rotations(scene, &namespace, &joints);
        println!("{} {} joints", "Keyed:".green().bold(), keyed.bound_count());
    }
    for warning in zeroed.warnings() {
        println!("  {} {}", "!".yellow(), warning);
    }
    Ok(ExitCode::SUCCESS)
}
