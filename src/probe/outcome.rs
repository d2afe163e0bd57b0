use std::time::Duration;

/// Shown for any request that never produced a response
pub const NETWORK_ERROR_MESSAGE: &str = "Network error or firewall blocked before response.";

pub const EMPTY_RESPONSE_BODY: &str = "(empty response)";

/// Result of one probe.
///
/// On completion exactly one of `body` / `error` is set. The default value
/// (neither set) is the "no response yet" state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: Option<u16>,
    pub body: Option<String>,
    pub error: Option<String>,
    pub latency: Option<Duration>,
}

impl ProbeOutcome {
    /// Any status counts, including blocking responses like 403 or 429
    pub fn from_response(status: u16, text: &str) -> Self {
        Self {
            status: Some(status),
            body: Some(normalize_body(text)),
            error: None,
            latency: None,
        }
    }

    pub fn network_failure() -> Self {
        Self {
            status: None,
            body: None,
            error: Some(NETWORK_ERROR_MESSAGE.to_string()),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.body.is_none() && self.error.is_none()
    }

    /// True when exactly one of body and error is present
    pub fn is_exclusive(&self) -> bool {
        self.body.is_some() != self.error.is_some()
    }
}

/// Pretty-print JSON bodies, pass anything else through as text.
pub fn normalize_body(text: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.to_string()),
        Err(_) if text.is_empty() => EMPTY_RESPONSE_BODY.to_string(),
        Err(_) => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_pretty_printed() {
        assert_eq!(normalize_body(r#"{"blocked":true}"#), "{\n  \"blocked\": true\n}");
        assert_eq!(normalize_body("[1,2]"), "[\n  1,\n  2\n]");
    }

    #[test]
    fn html_and_plain_text_pass_through() {
        let page = "<html><body>Access denied</body></html>";
        assert_eq!(normalize_body(page), page);
        assert_eq!(normalize_body("   "), "   ");
        assert_eq!(normalize_body("{broken"), "{broken");
    }

    #[test]
    fn empty_text_gets_placeholder() {
        assert_eq!(normalize_body(""), "(empty response)");
    }

    #[test]
    fn completed_outcomes_are_exclusive() {
        assert!(ProbeOutcome::from_response(500, "").is_exclusive());
        assert!(ProbeOutcome::network_failure().is_exclusive());

        let empty = ProbeOutcome::default();
        assert!(empty.is_empty());
        assert!(!empty.is_exclusive());
    }
}
