//! Engine output export
//!
//! This module writes the render-ready engine output (inspector forests,
//! aggregated graph, duration bounds) as a single JSON document so it can be
//! consumed by an external renderer.

pub mod json;

pub use json::JsonExporter;
