//! Import-reference command implementation
//!
//! Turns a referenced rig into imported scene nodes.

use anyhow::{bail, Result};
use colored::Colorize;
use rigbake_hik::namespace::import_reference_contents;
use rigbake_hik::Scene;
use std::path::Path;
use std::process::ExitCode;

/// Run the import-reference command
pub fn run(port: Option<&str>, path: &Path, keep_namespace: bool) -> Result<ExitCode> {
    let mut host = super::connect(port)?;
    let mut scene = Scene::new(&mut host);
    execute(&mut scene, path, keep_namespace)
}

/// Imports a reference in an explicit scene.
pub fn execute(scene: &mut Scene<'_>, path: &Path, keep_namespace: bool) -> Result<ExitCode> {
    let Some(imported) = import_reference_contents(scene, path, !keep_namespace)? else {
        bail!("{} is not referenced in the scene", path.display());
    };
    println!(
        "{} {} ({})",
        "Imported:".green().bold(),
        path.display(),
        imported.namespace
    );
    if imported.merged {
        println!("  merged {} into the root namespace", imported.namespace);
    }
    if !imported.deleted_unknown.is_empty() {
        println!(
            "  deleted {} unknown nodes",
            imported.deleted_unknown.len()
        );
    }
    Ok(ExitCode::SUCCESS)
}
