//! Links command implementation
//!
//! Lists which definitions drive which, as wired by the scene's solvers.

use anyhow::{bail, Result};
use colored::Colorize;
use rigbake_hik::definition::{destinations_of, sources_by_destination};
use rigbake_hik::Scene;
use std::process::ExitCode;

/// Run the links command
pub fn run(port: Option<&str>, source: Option<&str>) -> Result<ExitCode> {
    let mut host = super::connect(port)?;
    let mut scene = Scene::new(&mut host);
    execute(&mut scene, source)
}

/// Lists links in an explicit scene. With `source`, only the destinations
/// it drives are listed.
pub fn execute(scene: &mut Scene<'_>, source: Option<&str>) -> Result<ExitCode> {
    if let Some(source) = source {
        if !scene.exists(source)? {
            bail!("definition {} not found", source);
        }
        let destinations = destinations_of(scene, source)?;
        if destinations.is_empty() {
            println!("{} drives nothing", source);
        }
        for destination in destinations {
            println!("{} {} <- {}", "Linked:".green().bold(), destination, source);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let links = sources_by_destination(scene)?;
    if links.is_empty() {
        println!("No linked definitions");
    }
    for (destination, source) in links {
        match source {
            Some(source) => println!("{} {} <- {}", "Linked:".green().bold(), destination, source),
            None => println!("  {} {} has no input", "!".yellow(), destination),
        }
    }
    Ok(ExitCode::SUCCESS)
}
