//! CLI command implementations.

pub mod config;
pub mod demux;
pub mod run;
pub mod secrets;
