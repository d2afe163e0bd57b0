// Plain-text views of dashboard state

use std::fmt::Write;

use crate::burst::BurstRecord;
use crate::models::{Severity, StatsSnapshot, ThreatLogEntry};
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Ok,
    Warning,
    Error,
}

impl StatusClass {
    pub fn of(status: u16) -> Self {
        if status < 300 {
            StatusClass::Ok
        } else if status < 500 {
            StatusClass::Warning
        } else {
            StatusClass::Error
        }
    }

    fn marker(self) -> &'static str {
        match self {
            StatusClass::Ok => "ok",
            StatusClass::Warning => "warn",
            StatusClass::Error => "error",
        }
    }
}

fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "!!!",
        Severity::High => "!! ",
        Severity::Medium => "!  ",
        Severity::Low => "   ",
    }
}

pub fn session(title: &str, state: &SessionState) -> String {
    let mut out = String::new();
    let outcome = &state.outcome;

    match outcome.status {
        Some(status) => {
            let _ = writeln!(out, "{} [HTTP {} {}]", title, status, StatusClass::of(status).marker());
        }
        None => {
            let _ = writeln!(out, "{}", title);
        }
    }

    if state.loading {
        out.push_str("  loading...\n");
        return out;
    }

    if let Some(error) = &outcome.error {
        let _ = writeln!(out, "  error: {}", error);
    }

    match &outcome.body {
        Some(body) => {
            for line in body.lines() {
                let _ = writeln!(out, "  {}", line);
            }
        }
        None if outcome.error.is_none() => out.push_str("  No response yet.\n"),
        None => {}
    }

    if let Some(latency) = outcome.latency {
        let _ = writeln!(out, "  ({} ms)", latency.as_millis());
    }

    out
}

pub fn stats(snapshot: Option<&StatsSnapshot>) -> String {
    let Some(stats) = snapshot else {
        return "Stats: waiting for first poll\n".to_string();
    };

    let mut out = format!(
        "Total requests: {}  Allowed: {}  Blocked: {}  Threats: {}  Blocked IPs: {}\n",
        stats.total_requests,
        stats.allowed_requests(),
        stats.blocked_requests,
        stats.total_threats,
        stats.blocked_ips
    );

    if !stats.threats_by_type.is_empty() {
        let mut by_type: Vec<_> = stats.threats_by_type.iter().collect();
        by_type.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let parts: Vec<String> = by_type.iter().map(|(t, n)| format!("{}={}", t, n)).collect();
        let _ = writeln!(out, "By type: {}", parts.join(", "));
    }

    out
}

/// Newest entries first, at most `limit` of them
pub fn threat_log(entries: &[ThreatLogEntry], limit: usize) -> String {
    if entries.is_empty() {
        return "No threats detected yet.\n".to_string();
    }

    let mut out = String::new();
    for entry in entries.iter().take(limit) {
        let _ = writeln!(
            out,
            "{} {:<20} {}  IP: {}  {} {}",
            severity_marker(entry.threat_type.severity()),
            entry.threat_type,
            entry.timestamp.format("%H:%M:%S"),
            entry.ip,
            entry.method,
            entry.endpoint
        );
        if let Some(details) = entry.details() {
            let _ = writeln!(out, "    {}", details);
        }
    }
    out
}

pub fn burst_log(records: &[BurstRecord]) -> String {
    if records.is_empty() {
        return "No burst run yet.\n".to_string();
    }

    let mut out = String::new();
    for record in records {
        let _ = writeln!(out, "{}", record);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThreatType;
    use crate::probe::ProbeOutcome;
    use chrono::{TimeZone, Utc};

    fn entry(id: &str, threat_type: ThreatType, details: Option<&str>) -> ThreatLogEntry {
        ThreatLogEntry {
            id: id.to_string(),
            threat_type,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 34, 56).unwrap(),
            ip: "10.0.0.1".to_string(),
            method: "GET".to_string(),
            endpoint: "/api/search".to_string(),
            details: details.map(str::to_string),
            user_agent: None,
            action: Some("BLOCKED".to_string()),
        }
    }

    #[test]
    fn status_classes() {
        assert_eq!(StatusClass::of(200), StatusClass::Ok);
        assert_eq!(StatusClass::of(403), StatusClass::Warning);
        assert_eq!(StatusClass::of(429), StatusClass::Warning);
        assert_eq!(StatusClass::of(502), StatusClass::Error);
    }

    #[test]
    fn empty_session_shows_placeholder() {
        let text = session("Search", &SessionState::default());
        assert!(text.contains("No response yet."));
    }

    #[test]
    fn network_error_has_no_placeholder() {
        let mut state = SessionState::default();
        state.complete(ProbeOutcome::network_failure());
        let text = session("Login", &state);
        assert!(text.contains("error: Network error or firewall blocked before response."));
        assert!(!text.contains("No response yet."));
    }

    #[test]
    fn blocked_response_shows_status_and_body() {
        let mut state = SessionState::default();
        state.complete(ProbeOutcome::from_response(403, r#"{"blocked":true}"#));
        let text = session("Search", &state);
        assert!(text.starts_with("Search [HTTP 403 warn]"));
        assert!(text.contains("  \"blocked\": true"));
    }

    #[test]
    fn stats_line_includes_allowed_count() {
        let snapshot = StatsSnapshot {
            total_requests: 100,
            blocked_requests: 40,
            total_threats: 40,
            blocked_ips: 3,
            ..Default::default()
        };
        let text = stats(Some(&snapshot));
        assert!(text.contains("Allowed: 60"));
        assert!(text.contains("Blocked IPs: 3"));
        assert_eq!(stats(None), "Stats: waiting for first poll\n");
    }

    #[test]
    fn threat_log_is_bounded() {
        let entries: Vec<_> = (0..30)
            .map(|i| entry(&i.to_string(), ThreatType::Xss, None))
            .collect();
        let text = threat_log(&entries, 20);
        assert_eq!(text.lines().count(), 20);
        assert!(text.contains("12:34:56"));
    }

    #[test]
    fn threat_log_shows_details_when_present() {
        let entries = vec![
            entry("1", ThreatType::SqlInjection, Some("union select")),
            entry("2", ThreatType::RateLimitExceeded, Some("")),
        ];
        let text = threat_log(&entries, 20);
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("    union select"));
        assert_eq!(threat_log(&[], 20), "No threats detected yet.\n");
    }

    #[test]
    fn burst_lines() {
        let records = [
            BurstRecord::Response { index: 1, status: 200 },
            BurstRecord::Failed { index: 2 },
        ];
        assert_eq!(
            burst_log(&records),
            "Request #1: HTTP 200\nRequest #2: FAILED (blocked)\n"
        );
    }
}
