//! Mappings command implementation
//!
//! Lists, shows and checks stored mappings.

use anyhow::{Context, Result};
use colored::Colorize;
use rigbake_hik::coverage::{find_mapping_root, mapping_coverage};
use rigbake_hik::{Namespace, Scene};
use rigbake_mapping::{body_part_name, MappingKind, MappingStore};
use std::process::ExitCode;

/// Run `mappings list`
///
/// Prints the mapping names of `kind`, or of every kind.
pub fn list(store: &MappingStore, kind: Option<MappingKind>) -> Result<ExitCode> {
    println!("{} {}", "Mappings:".cyan().bold(), store.root().display());
    let kinds: Vec<MappingKind> = match kind {
        Some(kind) => vec![kind],
        None => MappingKind::ALL.to_vec(),
    };
    for kind in kinds {
        let names = store.list_names(kind)?;
        println!("{} ({})", kind.to_string().bold(), names.len());
        for name in names {
            println!("  {} {}", "->".green(), name);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Run `mappings show`
pub fn show(store: &MappingStore, name: &str, kind: MappingKind, json_output: bool) -> Result<ExitCode> {
    let mapping = store
        .load(name, kind)
        .with_context(|| format!("Failed to load mapping {}", name))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&mapping)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {} ({})", "Mapping:".cyan().bold(), name, kind);
    for entry in &mapping {
        let label = match kind {
            MappingKind::Skeleton => body_part_name(entry.slot).unwrap_or("?"),
            MappingKind::ControlRig => "",
        };
        println!("  {:>3}  {} {}", entry.slot, entry.name, label.dimmed());
    }
    match mapping.root() {
        Some(root) => println!("{} {}", "Root:".dimmed(), root),
        None => println!("{} {}", "Root:".dimmed(), "undefined".yellow()),
    }
    Ok(ExitCode::SUCCESS)
}

/// Run `mappings check`
///
/// # Returns
/// Exit code: 0 if every mapped node is present, 1 otherwise
pub fn check(
    store: &MappingStore,
    port: Option<&str>,
    name: &str,
    kind: MappingKind,
    namespace: Option<&str>,
) -> Result<ExitCode> {
    let mut host = super::connect(port)?;
    let mut scene = Scene::new(&mut host);
    execute_check(&mut scene, store, name, kind, namespace)
}

/// Checks a mapping against an explicit scene.
pub fn execute_check(
    scene: &mut Scene<'_>,
    store: &MappingStore,
    name: &str,
    kind: MappingKind,
    namespace: Option<&str>,
) -> Result<ExitCode> {
    let mapping = store
        .load(name, kind)
        .with_context(|| format!("Failed to load mapping {}", name))?;
    let namespace = namespace.map(Namespace::new).unwrap_or_default();

    let coverage = mapping_coverage(scene, &mapping, &namespace)?;
    println!(
        "{} {} in {}: {}/{} present",
        "Checking:".cyan().bold(),
        name,
        namespace,
        coverage.found.len(),
        coverage.total()
    );
    for node in &coverage.missing {
        println!("  {} {} not found", "!".yellow(), node);
    }
    if kind == MappingKind::Skeleton {
        match find_mapping_root(scene, &mapping, &namespace)? {
            Some(root) => println!("  {} root {}", "ok".green(), root),
            None => println!("  {} root not found", "!!".red()),
        }
    }

    if coverage.is_full() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}
