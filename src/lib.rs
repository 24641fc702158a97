//! Workstation security auditing.
//!
//! A run collects a point-in-time snapshot of security facts across six
//! categories (ports, authentication, firewall, vulnerabilities, network,
//! permissions), derives actionable alerts from a fixed rule battery,
//! condenses the alert population into a 0-100 score with a letter grade,
//! and assembles everything into a JSON report.
//!
//! The analysis core (`services`) is a pure function from a snapshot plus
//! configuration to alerts and a score: no I/O, no clock, no state between
//! runs. All I/O lives in `collectors` (gathering) and the report writer.

pub mod collectors;
pub mod models;
pub mod services;
pub mod utils;
