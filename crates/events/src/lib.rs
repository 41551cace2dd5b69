//! Live progress notifications for preview jobs.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`JobEvent`]: the progress event envelope published by job runners.
//!
//! The bus is a convenience channel for live observers only. Events published
//! while nobody is subscribed are dropped; the durable record of a job lives
//! in the job registry.

pub mod bus;

pub use bus::{EventBus, JobEvent, JobEventKind};
