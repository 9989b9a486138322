//! T-pose command implementation
//!
//! Levels the upper arms of a rig or a mocap skeleton before characterizing.

use anyhow::{Context, Result};
use colored::Colorize;
use rigbake_hik::tpose::{fix_mocap_tpose, fix_rig_tpose};
use rigbake_hik::{Namespace, Scene};
use rigbake_mapping::{MappingKind, MappingStore};
use std::process::ExitCode;

/// Run the tpose command
pub fn run(
    store: &MappingStore,
    port: Option<&str>,
    mapping: &str,
    namespace: Option<&str>,
    mocap: bool,
) -> Result<ExitCode> {
    let mut host = super::connect(port)?;
    let mut scene = Scene::new(&mut host);
    execute(&mut scene, store, mapping, namespace, mocap)
}

/// Levels the arms in an explicit scene.
///
/// Fails only when neither arm could be leveled.
pub fn execute(
    scene: &mut Scene<'_>,
    store: &MappingStore,
    mapping: &str,
    namespace: Option<&str>,
    mocap: bool,
) -> Result<ExitCode> {
    let namespace = namespace.map(Namespace::new).unwrap_or_default();
    let report = if mocap {
        let skeleton = store
            .load(mapping, MappingKind::Skeleton)
            .with_context(|| format!("Failed to load mapping {}", mapping))?;
        fix_mocap_tpose(scene, &namespace, &skeleton)
    } else {
        let set = store
            .load_set(mapping)
            .with_context(|| format!("Failed to load mapping {}", mapping))?;
        fix_rig_tpose(scene, &namespace, &set.skeleton, &set.controls)
    };

    for arm in &report.arms {
        let [x, y, z] = arm.rotation;
        println!(
            "{} {} by ({:.2}, {:.2}, {:.2})",
            "Leveled:".green().bold(),
            arm.control,
            x,
            y,
            z
        );
        if let Some(ik) = &arm.ik_control {
            println!("  {} {}", "aligned".dimmed(), ik);
        }
    }
    for warning in &report.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }

    if report.arms.is_empty() {
        println!("{} no arm leveled in {}", "Failed:".red().bold(), namespace);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
