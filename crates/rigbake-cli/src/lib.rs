//! rigbake CLI library.
//!
//! Command implementations for the `rigbake` binary. Each command has a
//! `run` entry that connects to the host and an `execute` function taking an
//! explicit [`Scene`](rigbake_hik::Scene), so commands can run against any
//! host.

pub mod commands;
pub mod prompt;
