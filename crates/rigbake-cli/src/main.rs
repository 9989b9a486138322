//! rigbake CLI - Command-line interface for mocap-to-rig retargeting
//!
//! This binary drives a running host application over its command port to
//! retarget motion capture onto animation rigs, and manages the mapping
//! files that describe skeletons and rigs.

use clap::{Parser, Subcommand};
use rigbake_hik::{HikError, RetargetRequest};
use rigbake_mapping::{CodedError, MappingKind, MappingStore};
use std::path::PathBuf;
use std::process::ExitCode;

use rigbake_cli::commands;

/// rigbake - Mocap to rig retargeting through HumanIK
#[derive(Parser)]
#[command(name = "rigbake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log retarget stages and skipped channels
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the mapping files (default: $RIGBAKE_MAPPINGS_DIR or ./mappings)
    #[arg(long, global = true)]
    mappings_dir: Option<PathBuf>,

    /// Host command port address (default: $RIGBAKE_COMMAND_PORT or 127.0.0.1:7001)
    #[arg(long, global = true)]
    port: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retarget a mocap file onto a rig and bake the controls
    Apply {
        /// Mocap file to import (prompted for when omitted)
        mocap: Option<PathBuf>,

        /// Namespace of the rig in the scene (default: namespace of the selection)
        #[arg(long)]
        rig_namespace: Option<String>,

        /// Rig file to reference, or reuse if it is already referenced
        #[arg(long)]
        rig_path: Option<PathBuf>,

        /// Skeleton mapping of the mocap
        #[arg(long, default_value = rigbake_hik::pipeline::DEFAULT_MOCAP_MAPPING)]
        mocap_mapping: String,

        /// Skeleton and control mapping of the rig
        #[arg(long, default_value = rigbake_hik::pipeline::DEFAULT_RIG_MAPPING)]
        rig_mapping: String,

        /// Frame to characterize on
        #[arg(long, default_value_t = 0.0)]
        start_frame: f64,

        /// Stop after linking; do not bake
        #[arg(long)]
        no_bake: bool,

        /// Keep definitions and mocap in the scene after baking
        #[arg(long)]
        no_cleanup: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List, show and check mapping files
    Mappings {
        #[command(subcommand)]
        command: MappingsCommands,
    },

    /// Write a skeleton mapping from a characterized definition
    Capture {
        /// Definition to read
        #[arg(short, long)]
        definition: String,

        /// Name to save the mapping under
        #[arg(short, long)]
        name: String,
    },

    /// Zero the rotations of every mapped joint
    ZeroPose {
        /// Skeleton mapping naming the joints
        #[arg(short, long, default_value = rigbake_hik::pipeline::DEFAULT_MOCAP_MAPPING)]
        mapping: String,

        /// Namespace of the skeleton
        #[arg(long)]
        namespace: Option<String>,

        /// Also key the zeroed rotations at the current time
        #[arg(long)]
        key: bool,
    },

    /// Level the upper arms into a T-pose before characterizing
    Tpose {
        /// Mapping naming the arm joints (and controls, for rigs)
        #[arg(short, long, default_value = rigbake_hik::pipeline::DEFAULT_RIG_MAPPING)]
        mapping: String,

        /// Namespace of the rig or skeleton
        #[arg(long)]
        namespace: Option<String>,

        /// Level a mocap skeleton by its shoulder joints instead of a rig
        #[arg(long)]
        mocap: bool,
    },

    /// List which definitions drive which
    Links {
        /// Only list the destinations driven by this definition
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Import the contents of a referenced rig into the scene
    ImportReference {
        /// Referenced rig file
        path: PathBuf,

        /// Keep the reference namespace and unknown nodes
        #[arg(long)]
        keep_namespace: bool,
    },

    /// Check the mapping directory and the host connection
    Doctor,
}

#[derive(Subcommand)]
enum MappingsCommands {
    /// List mapping names
    List {
        /// Only list this kind (sk or cr)
        #[arg(short, long)]
        kind: Option<MappingKind>,
    },

    /// Print a mapping
    Show {
        /// Mapping name
        name: String,

        /// Mapping kind (sk or cr)
        #[arg(short, long, default_value = "sk")]
        kind: MappingKind,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Report which mapped nodes are present in the scene
    Check {
        /// Mapping name
        name: String,

        /// Mapping kind (sk or cr)
        #[arg(short, long, default_value = "sk")]
        kind: MappingKind,

        /// Namespace to look in
        #[arg(long)]
        namespace: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = MappingStore::resolve(cli.mappings_dir.as_deref());
    let port = cli.port.as_deref();

    let result = match cli.command {
        Commands::Apply {
            mocap,
            rig_namespace,
            rig_path,
            mocap_mapping,
            rig_mapping,
            start_frame,
            no_bake,
            no_cleanup,
            json,
        } => {
            let request = RetargetRequest {
                mocap_path: mocap,
                rig_namespace,
                rig_path,
                mocap_mapping,
                rig_mapping,
                start_frame,
                bake: !no_bake,
                cleanup: !no_cleanup,
                ..Default::default()
            };
            commands::apply::run(&store, port, &request, json)
        }
        Commands::Mappings { command } => match command {
            MappingsCommands::List { kind } => commands::mappings::list(&store, kind),
            MappingsCommands::Show { name, kind, json } => {
                commands::mappings::show(&store, &name, kind, json)
            }
            MappingsCommands::Check {
                name,
                kind,
                namespace,
            } => commands::mappings::check(&store, port, &name, kind, namespace.as_deref()),
        },
        Commands::Capture { definition, name } => {
            commands::capture::run(&store, port, &definition, &name)
        }
        Commands::ZeroPose {
            mapping,
            namespace,
            key,
        } => commands::zero_pose::run(&store, port, &mapping, namespace.as_deref(), key),
        Commands::Tpose {
            mapping,
            namespace,
            mocap,
        } => commands::tpose::run(&store, port, &mapping, namespace.as_deref(), mocap),
        Commands::Links { source } => commands::links::run(port, source.as_deref()),
        Commands::ImportReference {
            path,
            keep_namespace,
        } => commands::import_reference::run(port, &path, keep_namespace),
        Commands::Doctor => commands::doctor::run(&store, port),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<HikError>() {
                Some(hik) => eprintln!("{} [{}]: {}", colored::Colorize::red("error"), hik.code(), e),
                None => eprintln!("{}: {}", colored::Colorize::red("error"), e),
            }
            ExitCode::from(1)
        }
    }
}
