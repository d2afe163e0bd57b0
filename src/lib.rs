//! Probe client and live dashboard for the Web Trust Analyzer firewall.
//!
//! Sends benign and adversarial requests through the firewall, runs
//! sequential bursts for rate-limit testing, and keeps a polled view of
//! the firewall's aggregate stats and threat log.

pub mod burst;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod models;
pub mod poller;
pub mod probe;
pub mod session;
