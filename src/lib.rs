//! Argus - Package Tree Auditor
//!
//! Runs independent checks over a version-controlled package tree and
//! reports findings, answering "since when?" questions through a persistent
//! cache replayed from the tree's commit history.

pub mod check;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod pkg;
pub mod repo;
pub mod ui;

pub use error::{ArgusError, ArgusResult};
