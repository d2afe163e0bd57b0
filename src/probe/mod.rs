// ============================================
// Single-probe pipeline
// ============================================
//
// A scenario plus the caller's free-text fields becomes one ProbeRequest.
// The request is sent once and whatever comes back is folded into a
// ProbeOutcome: a status with a body, or a fixed network error message.

use reqwest::Method;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::client::{FirewallClient, LOGIN_PATH, SEARCH_PATH};

pub mod outcome;

pub use outcome::{NETWORK_ERROR_MESSAGE, ProbeOutcome, normalize_body};

/// SQL-injection login bypass sent by the login attack scenario
pub const ATTACK_USERNAME: &str = "admin' OR 1=1--";
pub const ATTACK_PASSWORD: &str = "anything";

pub const DEFAULT_SEARCH_QUERY: &str = "hello";
pub const SQLI_QUERY: &str = "' OR 1=1--";
pub const XSS_QUERY: &str = "<script>alert(1)</script>";

/// Constant query used by burst runs purely to generate load
pub const BURST_QUERY: &str = "ratelimit-demo";

// ============================================
// Scenarios
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Login,
    Search,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Login => f.write_str("login"),
            Feature::Search => f.write_str("search"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LoginScenario {
    Normal,
    Attack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SearchScenario {
    Normal,
    Sqli,
    Xss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Login(LoginScenario),
    Search(SearchScenario),
}

impl Scenario {
    pub fn feature(&self) -> Feature {
        match self {
            Scenario::Login(_) => Feature::Login,
            Scenario::Search(_) => Feature::Search,
        }
    }
}

impl FromStr for Scenario {
    type Err = String;

    /// Accepts `feature:variant`, e.g. `login:attack` or `search:xss`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "login" | "login:normal" => Ok(Scenario::Login(LoginScenario::Normal)),
            "login:attack" => Ok(Scenario::Login(LoginScenario::Attack)),
            "search" | "search:normal" => Ok(Scenario::Search(SearchScenario::Normal)),
            "search:sqli" | "search:sql-injection" => Ok(Scenario::Search(SearchScenario::Sqli)),
            "search:xss" => Ok(Scenario::Search(SearchScenario::Xss)),
            other => Err(format!("unknown scenario: {}", other)),
        }
    }
}

/// Free-text fields supplied by the operator
#[derive(Debug, Clone, Default)]
pub struct BaseFields {
    pub username: String,
    pub password: String,
    pub query: String,
}

// ============================================
// Request
// ============================================

#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub path: &'static str,
    pub method: Method,
    pub payload: Option<serde_json::Value>,
    pub query: Vec<(String, String)>,
}

impl ProbeRequest {
    pub fn build(scenario: Scenario, fields: &BaseFields) -> Self {
        match scenario {
            Scenario::Login(variant) => Self::login(variant, &fields.username, &fields.password),
            Scenario::Search(variant) => Self::search(variant, &fields.query),
        }
    }

    /// The attack variant ignores the supplied credentials
    pub fn login(scenario: LoginScenario, username: &str, password: &str) -> Self {
        let payload = match scenario {
            LoginScenario::Normal => json!({ "username": username, "password": password }),
            LoginScenario::Attack => json!({
                "username": ATTACK_USERNAME,
                "password": ATTACK_PASSWORD,
            }),
        };

        Self {
            path: LOGIN_PATH,
            method: Method::POST,
            payload: Some(payload),
            query: Vec::new(),
        }
    }

    pub fn search(scenario: SearchScenario, query: &str) -> Self {
        let q = match scenario {
            SearchScenario::Normal if query.is_empty() => DEFAULT_SEARCH_QUERY,
            SearchScenario::Normal => query,
            SearchScenario::Sqli => SQLI_QUERY,
            SearchScenario::Xss => XSS_QUERY,
        };
        Self::search_raw(q)
    }

    pub fn burst() -> Self {
        Self::search_raw(BURST_QUERY)
    }

    fn search_raw(q: &str) -> Self {
        Self {
            path: SEARCH_PATH,
            method: Method::GET,
            payload: None,
            query: vec![("q".to_string(), q.to_string())],
        }
    }
}

// ============================================
// Dispatch
// ============================================

/// Send a scenario once and normalize whatever comes back.
pub async fn probe(client: &FirewallClient, scenario: Scenario, fields: &BaseFields) -> ProbeOutcome {
    send(client, &ProbeRequest::build(scenario, fields)).await
}

/// Send a prepared request. Never fails: transport errors become
/// the fixed network error outcome.
pub async fn send(client: &FirewallClient, request: &ProbeRequest) -> ProbeOutcome {
    let started = Instant::now();

    let result = client
        .send(
            request.method.clone(),
            request.path,
            &request.query,
            request.payload.as_ref(),
        )
        .await;

    match result {
        Ok(raw) => ProbeOutcome::from_response(raw.status, &raw.text).with_latency(started.elapsed()),
        Err(e) => {
            // A silent firewall drop and an ordinary network failure look the same here
            tracing::debug!(
                "{} {} failed ({}): {}",
                request.method,
                request.path,
                e.kind(),
                e
            );
            ProbeOutcome::network_failure()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(uri: &str) -> FirewallClient {
        FirewallClient::new(&Config::default().with_firewall_url(uri)).expect("client")
    }

    fn fields(username: &str, password: &str, query: &str) -> BaseFields {
        BaseFields {
            username: username.to_string(),
            password: password.to_string(),
            query: query.to_string(),
        }
    }

    #[test]
    fn login_attack_ignores_supplied_credentials() {
        let request = ProbeRequest::build(
            Scenario::Login(LoginScenario::Attack),
            &fields("alice", "hunter2", ""),
        );

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/api/login");
        assert_eq!(
            request.payload,
            Some(json!({ "username": "admin' OR 1=1--", "password": "anything" }))
        );
    }

    #[test]
    fn login_normal_uses_supplied_credentials() {
        let request = ProbeRequest::login(LoginScenario::Normal, "admin", "password");
        assert_eq!(
            request.payload,
            Some(json!({ "username": "admin", "password": "password" }))
        );
    }

    #[test]
    fn search_normal_defaults_to_hello() {
        let request = ProbeRequest::search(SearchScenario::Normal, "");
        assert_eq!(request.query, vec![("q".to_string(), "hello".to_string())]);

        let request = ProbeRequest::search(SearchScenario::Normal, "shoes");
        assert_eq!(request.query[0].1, "shoes");
    }

    #[test]
    fn search_attacks_use_fixed_queries() {
        let sqli = ProbeRequest::search(SearchScenario::Sqli, "ignored");
        let xss = ProbeRequest::search(SearchScenario::Xss, "ignored");
        assert_eq!(sqli.query[0].1, "' OR 1=1--");
        assert_eq!(xss.query[0].1, "<script>alert(1)</script>");
        assert!(sqli.payload.is_none());
    }

    #[test]
    fn scenario_names_parse() {
        assert_eq!(
            "login:attack".parse::<Scenario>(),
            Ok(Scenario::Login(LoginScenario::Attack))
        );
        assert_eq!(
            "search:sql-injection".parse::<Scenario>(),
            Ok(Scenario::Search(SearchScenario::Sqli))
        );
        assert_eq!(
            "Search".parse::<Scenario>().map(|s| s.feature()),
            Ok(Feature::Search)
        );
        assert!("upload".parse::<Scenario>().is_err());
    }

    #[tokio::test]
    async fn blocked_xss_search_keeps_status_and_pretty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .and(query_param("q", "<script>alert(1)</script>"))
            .respond_with(ResponseTemplate::new(403).set_body_string(r#"{"blocked":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = probe(
            &client_for(&server.uri()),
            Scenario::Search(SearchScenario::Xss),
            &BaseFields::default(),
        )
        .await;

        assert_eq!(outcome.status, Some(403));
        assert_eq!(outcome.body.as_deref(), Some("{\n  \"blocked\": true\n}"));
        assert_eq!(outcome.error, None);
    }

    #[tokio::test]
    async fn login_attack_sends_bypass_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .and(body_json(json!({ "username": "admin' OR 1=1--", "password": "anything" })))
            .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = probe(
            &client_for(&server.uri()),
            Scenario::Login(LoginScenario::Attack),
            &fields("admin", "password", ""),
        )
        .await;

        assert_eq!(outcome.status, Some(200));
        assert_eq!(outcome.body.as_deref(), Some("welcome"));
        assert!(outcome.latency.is_some());
    }

    #[tokio::test]
    async fn empty_body_gets_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .and(query_param("q", "hello"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let outcome = probe(
            &client_for(&server.uri()),
            Scenario::Search(SearchScenario::Normal),
            &BaseFields::default(),
        )
        .await;

        assert_eq!(outcome.status, Some(204));
        assert_eq!(outcome.body.as_deref(), Some("(empty response)"));
        assert!(outcome.is_exclusive());
    }

    #[tokio::test]
    async fn unreachable_firewall_yields_network_error() {
        // Nothing listens on port 9 of the loopback interface
        let client = client_for("http://127.0.0.1:9");
        let outcome = probe(
            &client,
            Scenario::Login(LoginScenario::Normal),
            &fields("admin", "password", ""),
        )
        .await;

        assert_eq!(outcome.status, None);
        assert_eq!(outcome.body, None);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Network error or firewall blocked before response.")
        );
    }
}
