pub mod firewall;

pub use firewall::{Severity, StatsSnapshot, ThreatLogEntry, ThreatType};
