//! rigbake HumanIK Retargeting
//!
//! Drives a 3D host application's HumanIK subsystem to move a motion-capture
//! performance onto an animation rig.
//!
//! # Overview
//!
//! A retarget operation:
//!
//! 1. Loads the mocap skeleton mapping and the rig skeleton/control mappings
//! 2. Imports the mocap under a namespace named after the file
//! 3. Characterizes the mocap skeleton into a source definition and locks it
//! 4. Characterizes the rig skeleton into a destination definition and locks it
//! 5. Binds the rig's animation controls to the destination's retargeter
//! 6. Links the source definition as the destination's live input
//! 7. Bakes the solved motion onto the controls over the mocap's key range
//! 8. Deletes the definitions, the retargeter and the mocap skeleton
//!
//! Joints and controls missing from the scene do not stop the operation;
//! they are reported per entry in a [`MappingReport`].
//!
//! Rigs and captures standing in an A-pose can be leveled into a T-pose
//! beforehand with [`tpose::fix_rig_tpose`] and [`tpose::fix_mocap_tpose`].
//!
//! # Host
//!
//! All scene access goes through the [`Host`] trait. [`CommandPortHost`]
//! talks to a running application over its MEL command port, and
//! [`FakeHost`](fake::FakeHost) is an in-memory scene for tests.
//!
//! # Example
//!
//! ```ignore
//! use rigbake_hik::{apply, CommandPortConfig, CommandPortHost, RetargetRequest, Scene};
//! use rigbake_mapping::MappingStore;
//!
//! let mut host = CommandPortHost::connect(&CommandPortConfig::default())?;
//! let mut scene = Scene::new(&mut host);
//! let request = RetargetRequest::new("/takes/walk_01.fbx").rig_namespace("hero");
//! let summary = apply(&mut scene, &MappingStore::default(), &request, None)?;
//! for warning in summary.warnings() {
//!     eprintln!("warning: {}", warning);
//! }
//! ```
//!
//! # Crate Structure
//!
//! - [`host`] - Host capability trait and the command-port adapter
//! - [`fake`] - In-memory host
//! - [`scene`] - Host context and HumanIK command helpers
//! - [`definition`] - Definition lookup, creation, locking and solver links
//! - [`skeleton`] - Skeleton mapper and pose helpers
//! - [`controls`] - Control mapper
//! - [`bake`] - Linking, frame range, baking and cleanup
//! - [`capture`] - Mapping capture from a definition
//! - [`coverage`] - Mapping coverage checks
//! - [`namespace`] - Namespaces, rig references and reference import
//! - [`tpose`] - Arm leveling for T-pose characterization
//! - [`pipeline`] - The full operation
//! - [`outcome`] - Per-entry outcomes
//! - [`error`] - Error types

pub mod bake;
pub mod capture;
pub mod controls;
pub mod coverage;
pub mod definition;
pub mod error;
pub mod fake;
pub mod host;
pub mod namespace;
pub mod outcome;
pub mod pipeline;
pub mod scene;
pub mod skeleton;
pub mod tpose;

pub use bake::{BakeOptions, CleanupReport, ControlSelection};
pub use definition::Definition;
pub use error::{HikError, HikResult, HostError, HostResult};
pub use host::{Command, CommandPortConfig, CommandPortHost, Host};
pub use namespace::{ImportedReference, Namespace};
pub use outcome::{Channel, ChannelStatus, EntryOutcome, EntryStatus, MappingReport};
pub use pipeline::{apply, PathPrompt, RetargetRequest, RetargetStage, RetargetSummary};
pub use scene::{FrameRange, Scene};
pub use tpose::{Side, TposeReport};
pub use skeleton::{Characterization, SkeletonRole};
