//! Apply command implementation
//!
//! Retargets a mocap file onto a rig and bakes the result.

use anyhow::Result;
use colored::Colorize;
use rigbake_hik::{apply, HikError, PathPrompt, RetargetRequest, RetargetSummary, Scene};
use rigbake_mapping::MappingStore;
use std::process::ExitCode;

use crate::prompt::LinePrompt;

/// Exit code when the user declines the path prompt.
pub const CANCELLED_EXIT_CODE: u8 = 2;

/// Run the apply command
///
/// # Arguments
/// * `store` - Mapping store to load mappings from
/// * `port` - Command port address override
/// * `request` - Retarget parameters
/// * `json_output` - Whether to print the summary as JSON
///
/// # Returns
/// Exit code: 0 on success (warnings allowed), 2 if cancelled
pub fn run(
    store: &MappingStore,
    port: Option<&str>,
    request: &RetargetRequest,
    json_output: bool,
) -> Result<ExitCode> {
    let mut host = super::connect(port)?;
    let mut scene = Scene::new(&mut host);
    let mut prompt = LinePrompt::stdin();
    execute(&mut scene, store, request, Some(&mut prompt), json_output)
}

/// Runs the retarget against an explicit scene.
pub fn execute(
    scene: &mut Scene<'_>,
    store: &MappingStore,
    request: &RetargetRequest,
    prompt: Option<&mut dyn PathPrompt>,
    json_output: bool,
) -> Result<ExitCode> {
    if !json_output {
        println!(
            "{} {} -> {}",
            "Retargeting:".cyan().bold(),
            request.mocap_mapping,
            request.rig_mapping
        );
    }

    let summary = match apply(scene, store, request, prompt) {
        Ok(summary) => summary,
        Err(HikError::Cancelled) => {
            if !json_output {
                println!("{}", "Cancelled".yellow());
            }
            return Ok(ExitCode::from(CANCELLED_EXIT_CODE));
        }
        Err(e) => return Err(e.into()),
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_summary(summary: &RetargetSummary) {
    println!(
        "{} {}  {} {}",
        "Mocap:".dimmed(),
        summary.mocap_namespace,
        "Rig:".dimmed(),
        summary.rig_namespace
    );
    println!(
        "  {} {} joints -> {}",
        "->".green(),
        summary.mocap.report.bound_count(),
        summary.mocap.definition.name
    );
    println!(
        "  {} {} joints -> {}",
        "->".green(),
        summary.rig.report.bound_count(),
        summary.rig.definition.name
    );
    println!(
        "  {} {} controls mapped",
        "->".green(),
        summary.controls.bound_count()
    );
    println!(
        "  {} frames {}..{}",
        "->".green(),
        summary.range.start,
        summary.range.end
    );

    let warnings = summary.warnings();
    if !warnings.is_empty() {
        println!();
        println!("{} ({})", "Warnings:".yellow().bold(), warnings.len());
        for warning in &warnings {
            println!("  {} {}", "!".yellow(), warning);
        }
    }

    println!();
    println!(
        "{} {}",
        "Done:".green().bold(),
        summary.stage().as_str().to_lowercase()
    );
}
