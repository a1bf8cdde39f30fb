//! Data ingestion layer for quake-report.
//!
//! Reads delimited seismic event exports, builds typed records line by line,
//! aggregates them in memory and runs the top-level analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod builder;
pub mod reader;

pub use quake_core as core;
