//! Domain types shared by every preview crate.
//!
//! Holds the job model and its state machine, the project/task model that
//! jobs are built from, the deterministic artifact naming scheme, and the
//! stage traits implemented by external collaborators.

pub mod error;
pub mod job;
pub mod naming;
pub mod project;
pub mod stage;
pub mod types;
