//! # Function Name Resolution
//!
//! Traces identify functions only by address. This module turns those
//! addresses into names using the function table published by the tracer
//! service (one descriptor per traced kernel function).
//!
//! ## Resolution Rules
//!
//! ```text
//! address 16 ──► table["16"].name         "ip_rcv"
//! address 99 ──► (no entry) hex fallback  "0x63"
//! ```
//!
//! Resolution never fails. A missing or partial table only changes what is
//! displayed, never what is aggregated: statistics are keyed by address.
//!
//! Graph labels are additionally shortened by [`display_label`] so node text
//! stays readable.

pub mod symbol_table;

pub use symbol_table::{display_label, fallback_name, FuncInfo, SymbolTable};
