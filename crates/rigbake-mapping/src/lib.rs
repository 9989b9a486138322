//! rigbake Mapping Library
//!
//! Types and storage for the name -> slot tables that drive retargeting.
//!
//! # Overview
//!
//! A mapping set is authored once per skeleton topology or rig naming
//! convention and stored as two JSON files:
//!
//! - `<name>.sk.json` - skeleton joints -> characterization slots
//! - `<name>.cr.json` - animation controls -> control-rig slots
//!
//! Slot `1` is always the root/hip joint of a skeleton mapping.
//!
//! # Example
//!
//! ```
//! use rigbake_mapping::{JointMapping, MappingKind, MappingStore};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = MappingStore::new(dir.path());
//!
//! let mapping = JointMapping::new().with("Hip", 1).with("LThigh", 2);
//! store.save(&mapping, "iPi", MappingKind::Skeleton).unwrap();
//!
//! let loaded = store.load("iPi", MappingKind::Skeleton).unwrap();
//! assert_eq!(loaded.root(), Some("Hip"));
//! ```
//!
//! # Modules
//!
//! - [`error`]: Error types and the shared [`CodedError`] trait
//! - [`kind`]: Skeleton vs control-rig mapping kinds
//! - [`mapping`]: The ordered [`JointMapping`] table
//! - [`slots`]: Slot ids and standard body-part names
//! - [`store`]: File-backed [`MappingStore`]

pub mod error;
pub mod kind;
pub mod mapping;
pub mod slots;
pub mod store;

pub use error::{CodedError, MappingError, MappingResult};
pub use kind::MappingKind;
pub use mapping::{JointMapping, MappingEntry, MappingSet};
pub use slots::{
    body_part_name, slot_for_body_part, SlotId, MAX_NODE_ID, REFERENCE_SLOT, ROOT_SLOT,
};
pub use store::{MappingStore, DEFAULT_MAPPINGS_DIR, MAPPINGS_DIR_ENV};
