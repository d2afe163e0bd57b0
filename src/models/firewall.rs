use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================
// Aggregate statistics
// ============================================

/// Response of `GET /api/firewall/stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub total_threats: u64,
    pub blocked_ips: u64,
    /// Breakdown by threat type, empty when the server omits it
    #[serde(default, deserialize_with = "null_as_default")]
    pub threats_by_type: HashMap<String, u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub threats_by_ip: HashMap<String, u64>,
}

impl StatsSnapshot {
    pub fn allowed_requests(&self) -> u64 {
        self.total_requests.saturating_sub(self.blocked_requests)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================
// Threat log
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatType {
    SqlInjection,
    Xss,
    RateLimitExceeded,
    PathTraversal,
    SuspiciousInput,
    #[serde(other)]
    Unclassified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatType {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreatType::SqlInjection => "SQL_INJECTION",
            ThreatType::Xss => "XSS",
            ThreatType::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ThreatType::PathTraversal => "PATH_TRAVERSAL",
            ThreatType::SuspiciousInput => "SUSPICIOUS_INPUT",
            ThreatType::Unclassified => "UNCLASSIFIED",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            ThreatType::SqlInjection => Severity::Critical,
            ThreatType::Xss | ThreatType::PathTraversal => Severity::High,
            ThreatType::RateLimitExceeded | ThreatType::SuspiciousInput => Severity::Medium,
            ThreatType::Unclassified => Severity::Low,
        }
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One element of `GET /api/firewall/logs`. Never mutated client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatLogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub threat_type: ThreatType,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub method: String,
    pub endpoint: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// e.g. "BLOCKED"
    #[serde(default)]
    pub action: Option<String>,
}

impl ThreatLogEntry {
    /// Details text, treating an empty string as absent
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref().filter(|d| !d.trim().is_empty())
    }
}
