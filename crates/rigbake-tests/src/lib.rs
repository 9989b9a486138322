//! rigbake End-to-End Test Infrastructure
//!
//! This crate provides integration tests for the retargeting flows:
//!
//! - **Retarget**: mocap file -> characterized definitions -> baked controls
//! - **Mappings**: the shipped mapping files load and agree with each other
//! - **Commands**: CLI command bodies run against an in-memory scene
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rigbake-tests
//! ```
//!
//! Every test runs against [`FakeHost`](rigbake_hik::fake::FakeHost); none
//! needs a running host application.
//!
//! ## Writing a Retarget Test
//!
//! ```rust,ignore
//! use rigbake_hik::RetargetRequest;
//! use rigbake_tests::fixtures::{advanced_skeleton_rig, ipi_take};
//! use rigbake_tests::harness::RetargetHarness;
//!
//! let mut harness = RetargetHarness::new();
//! let take = harness.add_take("walk", ipi_take(&[], &[1.0, 48.0]));
//! harness.add_rig("hero", advanced_skeleton_rig(&["IKLeg_L"]));
//!
//! let summary = harness
//!     .apply(&RetargetRequest::new(&take).rig_namespace("hero"))
//!     .unwrap();
//! assert_eq!(summary.warnings().len(), 2);
//! ```

pub mod fixtures;
pub mod harness;

// Re-export commonly used items
pub use fixtures::{advanced_skeleton_rig, ipi_take, shipped_mappings_dir, MappingFixture};
pub use harness::RetargetHarness;
