//! rollcall-service — Roster engine and configuration.
//!
//! Hosts the store and matcher on a dedicated engine thread behind an
//! async handle. All store access is serialized through that thread, so
//! every identification scan sees a stable snapshot: a registration can
//! never land mid-scan.

pub mod config;
pub mod engine;

pub use config::Config;
pub use engine::{spawn_engine, EngineError, EngineHandle};
