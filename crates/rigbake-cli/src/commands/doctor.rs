//! Doctor command implementation
//!
//! Checks the mapping directory and the host connection.

use anyhow::Result;
use colored::Colorize;
use rigbake_hik::{CommandPortConfig, CommandPortHost};
use rigbake_mapping::{MappingKind, MappingStore, DEFAULT_MAPPINGS_DIR};
use std::process::ExitCode;

/// Run the doctor command
///
/// Checks:
/// - Mapping directory and the mappings it holds
/// - Default mapping sets
/// - Host command port
///
/// # Returns
/// Exit code: 0 if all checks pass, 1 if any fail
pub fn run(store: &MappingStore, port: Option<&str>) -> Result<ExitCode> {
    println!("{}", "rigbake Doctor".cyan().bold());
    println!("{}", "==============".cyan());
    println!();

    let mut all_ok = true;

    println!("{}", "Versions:".bold());
    println!(
        "  {} rigbake-cli v{}",
        "->".green(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("{}", "Mappings:".bold());
    if store.root().is_dir() {
        println!("  {} {}", "ok".green(), store.root().display());
    } else {
        println!(
            "  {} {} does not exist",
            "!!".red(),
            store.root().display()
        );
        println!(
            "     {}",
            format!(
                "Pass --mappings-dir or set RIGBAKE_MAPPINGS_DIR (default ./{})",
                DEFAULT_MAPPINGS_DIR
            )
            .dimmed()
        );
        all_ok = false;
    }
    for kind in MappingKind::ALL {
        match store.list_names(kind) {
            Ok(names) => println!("  {} {} {}: {}", "->".green(), names.len(), kind, names.join(", ")),
            Err(e) => {
                println!("  {} {}: {}", "!!".red(), kind, e);
                all_ok = false;
            }
        }
    }
    for (name, kind) in [
        (rigbake_hik::pipeline::DEFAULT_MOCAP_MAPPING, MappingKind::Skeleton),
        (rigbake_hik::pipeline::DEFAULT_RIG_MAPPING, MappingKind::Skeleton),
        (rigbake_hik::pipeline::DEFAULT_RIG_MAPPING, MappingKind::ControlRig),
    ] {
        if let Err(e) = store.load(name, kind) {
            println!("  {} default {}", "!!".yellow(), e);
        }
    }
    println!();

    println!("{}", "Host:".bold());
    let mut config = CommandPortConfig::default();
    if let Some(port) = port {
        config = config.address(port);
    }
    let address = config.resolved_address();
    match CommandPortHost::connect(&config.timeout_secs(10)).and_then(|mut host| host.version()) {
        Ok(version) => println!("  {} command port {} (version {})", "ok".green(), address, version),
        Err(e) => {
            println!("  {} command port {}: {}", "!!".yellow(), address, e);
            println!(
                "     {}",
                "Open the port in the host with: commandPort -n \":7001\" -sourceType \"mel\";"
                    .dimmed()
            );
            // Only apply, capture, check and zero-pose need the host
        }
    }

    println!();
    if all_ok {
        println!("{}", "All checks passed.".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{}", "Some checks failed.".red().bold());
        Ok(ExitCode::from(1))
    }
}
