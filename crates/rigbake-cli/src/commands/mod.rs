//! CLI command implementations

pub mod apply;
pub mod capture;
pub mod doctor;
pub mod import_reference;
pub mod links;
pub mod mappings;
pub mod tpose;
pub mod zero_pose;

use anyhow::{Context, Result};
use rigbake_hik::{CommandPortConfig, CommandPortHost};

/// Connects to the host command port. `port` overrides the environment.
pub fn connect(port: Option<&str>) -> Result<CommandPortHost> {
    let mut config = CommandPortConfig::default();
    if let Some(port) = port {
        config = config.address(port);
    }
    let address = config.resolved_address();
    CommandPortHost::connect(&config)
        .with_context(|| format!("Failed to reach the host command port at {}", address))
}
