//! Capture command implementation
//!
//! Writes a skeleton mapping read back from a characterized definition.

use anyhow::{bail, Result};
use colored::Colorize;
use rigbake_hik::capture::capture_mapping;
use rigbake_hik::Scene;
use rigbake_mapping::{MappingKind, MappingStore};
use std::process::ExitCode;

/// Run the capture command
///
/// # Arguments
/// * `store` - Mapping store to save into
/// * `port` - Command port address override
/// * `definition` - Characterized definition to read
/// * `name` - Name to save the mapping under
pub fn run(store: &MappingStore, port: Option<&str>, definition: &str, name: &str) -> Result<ExitCode> {
    let mut host = super::connect(port)?;
    let mut scene = Scene::new(&mut host);
    execute(&mut scene, store, definition, name)
}

/// Captures a mapping from an explicit scene.
pub fn execute(
    scene: &mut Scene<'_>,
    store: &MappingStore,
    definition: &str,
    name: &str,
) -> Result<ExitCode> {
    if !scene.exists(definition)? {
        bail!("definition {} not found", definition);
    }
    let mapping = capture_mapping(scene, definition)?;
    if mapping.is_empty() {
        bail!("definition {} has no joints assigned", definition);
    }
    let path = store.save(&mapping, name, MappingKind::Skeleton)?;
    println!(
        "{} {} joints from {} -> {}",
        "Captured:".green().bold(),
        mapping.len(),
        definition,
        path.display()
    );
    if mapping.root().is_none() {
        println!("  {} no joint on the root slot", "!".yellow());
    }
    Ok(ExitCode::SUCCESS)
}
