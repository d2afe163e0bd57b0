// HTTP transport for the firewall service

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::Config;

// ============================================
// Endpoints
// ============================================

pub const LOGIN_PATH: &str = "/api/login";
pub const SEARCH_PATH: &str = "/api/search";
pub const STATS_PATH: &str = "/api/firewall/stats";
pub const LOGS_PATH: &str = "/api/firewall/logs";

// ============================================
// Errors
// ============================================

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("firewall responded with HTTP {0}")]
    Status(u16),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid firewall address: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Short label for the transport failure kind, used in diagnostics only
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Transport(e) if e.is_connect() => "connect",
            ClientError::Transport(e) if e.is_timeout() => "timeout",
            ClientError::Transport(_) => "transport",
            ClientError::Status(_) => "status",
            ClientError::Decode(_) => "decode",
            ClientError::InvalidUrl(_) => "url",
        }
    }
}

// ============================================
// Raw response
// ============================================

/// A response that reached the client, with its body read as text
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub text: String,
}

// ============================================
// Client Implementation
// ============================================

#[derive(Clone, Debug)]
pub struct FirewallClient {
    http: reqwest::Client,
    base: Url,
}

impl FirewallClient {
    /// Build a client for the configured firewall address.
    ///
    /// No timeout is applied unless `request_timeout_secs` is set.
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let base = Url::parse(&config.firewall_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.firewall_url, e)))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append an API path to the base address, keeping any path prefix
    /// the base carries (e.g. `http://gw.local/waf` + `/api/login`).
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        if self.base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(format!("{}{}", self.base, path)));
        }

        let mut url = self.base.clone();
        let joined = format!("{}{}", self.base.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        Ok(url)
    }

    /// Send one request and read the whole body as text.
    ///
    /// Any status code counts as a response; only a request that never
    /// completed is an error.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        json: Option<&serde_json::Value>,
    ) -> Result<RawResponse, ClientError> {
        let url = self.endpoint(path)?;

        let mut request = self.http.request(method, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = json {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        Ok(RawResponse { status, text })
    }

    /// GET a JSON document, treating any non-success status as a failure
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Human-readable timeout setting for startup logs
pub fn timeout_label(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format!("{}s", d.as_secs()),
        None => "transport default".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(uri: &str) -> FirewallClient {
        FirewallClient::new(&Config::default().with_firewall_url(uri)).expect("client")
    }

    #[test]
    fn rejects_unparseable_base_address() {
        let config = Config::default().with_firewall_url("not a url");
        let err = FirewallClient::new(&config).unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }

    #[test]
    fn endpoint_joins_absolute_paths() {
        let client = client_for("http://localhost:8080");
        let url = client.endpoint(STATS_PATH).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/firewall/stats");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        for base in ["http://gw.local/waf", "http://gw.local/waf/"] {
            let client = client_for(base);
            assert_eq!(
                client.endpoint(LOGIN_PATH).unwrap().as_str(),
                "http://gw.local/waf/api/login"
            );
            assert_eq!(
                client.endpoint(LOGS_PATH).unwrap().as_str(),
                "http://gw.local/waf/api/firewall/logs"
            );
        }
    }

    #[tokio::test]
    async fn send_reaches_prefixed_firewall() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/waf/api/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&format!("{}/waf", server.uri()));
        let raw = client
            .send(Method::GET, SEARCH_PATH, &[], None)
            .await
            .expect("response");

        assert_eq!(raw.status, 200);
    }

    #[tokio::test]
    async fn send_captures_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let raw = client
            .send(Method::GET, SEARCH_PATH, &[], None)
            .await
            .expect("response");

        assert_eq!(raw.status, 429);
        assert_eq!(raw.text, "slow down");
    }

    #[tokio::test]
    async fn get_json_rejects_non_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STATS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client
            .get_json::<serde_json::Value>(STATS_PATH)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Status(503)));
        assert_eq!(err.kind(), "status");
    }
}
