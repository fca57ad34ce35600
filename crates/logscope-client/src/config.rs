use std::time::Duration;

use url::Url;

use logscope_types::ControlCommand;

use crate::error::{ClientError, Result};

/// Default server address
pub const DEFAULT_SERVER: &str = "http://localhost:3000";

/// Default delay before reconnecting after an unexpected close
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// User name the server treats as anonymous; never sent
const ANONYMOUS_USER: &str = "default";

/// Server address, credentials and reconnect timing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// `http(s)://`, `ws(s)://` or bare `host:port`
    pub server: String,

    /// Auth token, empty for none
    pub token: String,

    /// User name, empty or "default" for none
    pub user: String,

    pub reconnect_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            token: String::new(),
            user: String::new(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ConnectionConfig {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Websocket endpoint: `{ws|wss}://{host}/ws?token=..&user=..`
    pub fn socket_url(&self) -> Result<Url> {
        let mut url = self.server_url()?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ClientError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|()| ClientError::UnsupportedScheme(url.scheme().to_string()))?;
        self.finish(url, "ws", &[])
    }

    /// Bootstrap history endpoint: `GET /api/logs?limit=N`
    pub fn history_url(&self, limit: usize) -> Result<Url> {
        let url = self.http_url()?;
        self.finish(url, "api/logs", &[("limit", limit.to_string())])
    }

    /// Endpoints to `DELETE` for a remote clear
    pub fn clear_urls(&self, target: ClearTarget) -> Result<Vec<Url>> {
        target
            .resources()
            .iter()
            .map(|resource| {
                let url = self.http_url()?;
                self.finish(url, &format!("api/{resource}"), &[])
            })
            .collect()
    }

    /// Server host and port for display
    pub fn display_host(&self) -> String {
        match self.server_url() {
            Ok(url) => match (url.host_str(), url.port()) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                (Some(host), None) => host.to_string(),
                _ => self.server.clone(),
            },
            Err(_) => self.server.clone(),
        }
    }

    fn server_url(&self) -> Result<Url> {
        let raw = self.server.trim();
        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };
        Url::parse(&candidate).map_err(|source| ClientError::InvalidServerUrl {
            url: raw.to_string(),
            source,
        })
    }

    fn http_url(&self) -> Result<Url> {
        let mut url = self.server_url()?;
        let scheme = match url.scheme() {
            "http" | "ws" => "http",
            "https" | "wss" => "https",
            other => return Err(ClientError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|()| ClientError::UnsupportedScheme(url.scheme().to_string()))?;
        Ok(url)
    }

    /// Append `suffix` to the base path and set the query
    fn finish(&self, mut url: Url, suffix: &str, extra: &[(&str, String)]) -> Result<Url> {
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}/{suffix}"));
        url.set_fragment(None);
        url.set_query(None);

        let mut params: Vec<(&str, &str)> = extra.iter().map(|(k, v)| (*k, v.as_str())).collect();
        if !self.token.is_empty() {
            params.push(("token", self.token.as_str()));
        }
        if !self.user.is_empty() && self.user != ANONYMOUS_USER {
            params.push(("user", self.user.as_str()));
        }
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }
}

/// What a clear request removes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearTarget {
    Log,
    Watches,
    All,
}

impl ClearTarget {
    fn resources(&self) -> &'static [&'static str] {
        match self {
            Self::Log => &["logs"],
            Self::Watches => &["watches"],
            Self::All => &["logs", "watches"],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Watches => "watches",
            Self::All => "log and watches",
        }
    }

    /// The local store command with the same effect
    pub fn command(&self) -> ControlCommand {
        match self {
            Self::Log => ControlCommand::ClearLog,
            Self::Watches => ControlCommand::ClearWatches,
            Self::All => ControlCommand::ClearAll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url_schemes() {
        let cases = [
            ("http://localhost:3000", "ws://localhost:3000/ws"),
            ("https://logs.example.com", "wss://logs.example.com/ws"),
            ("ws://10.0.0.1:9000", "ws://10.0.0.1:9000/ws"),
            ("wss://secure.example.com/", "wss://secure.example.com/ws"),
            ("localhost:3000", "ws://localhost:3000/ws"),
        ];
        for (server, expected) in cases {
            let url = ConnectionConfig::new(server).socket_url().unwrap();
            assert_eq!(url.as_str(), expected, "server {server}");
        }
    }

    #[test]
    fn test_socket_url_auth_params() {
        let url = ConnectionConfig::new("http://host:1")
            .with_token("abc")
            .with_user("alice")
            .socket_url()
            .unwrap();
        assert_eq!(url.as_str(), "ws://host:1/ws?token=abc&user=alice");
    }

    #[test]
    fn test_default_user_omitted() {
        let url = ConnectionConfig::new("http://host:1")
            .with_user("default")
            .socket_url()
            .unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_path_prefix_kept() {
        let url = ConnectionConfig::new("https://example.com/viewer/")
            .history_url(50)
            .unwrap();
        assert_eq!(url.as_str(), "https://example.com/viewer/api/logs?limit=50");
    }

    #[test]
    fn test_history_url_carries_auth() {
        let url = ConnectionConfig::new("ws://host:2")
            .with_token("t")
            .history_url(1000)
            .unwrap();
        assert_eq!(url.as_str(), "http://host:2/api/logs?limit=1000&token=t");
    }

    #[test]
    fn test_clear_urls() {
        let config = ConnectionConfig::new("http://host:3");
        let all = config.clear_urls(ClearTarget::All).unwrap();
        let paths: Vec<&str> = all.iter().map(|u| u.path()).collect();
        assert_eq!(paths, vec!["/api/logs", "/api/watches"]);
        assert_eq!(config.clear_urls(ClearTarget::Watches).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_server() {
        assert!(matches!(
            ConnectionConfig::new("ftp://host").socket_url(),
            Err(ClientError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            ConnectionConfig::new("http://").socket_url(),
            Err(ClientError::InvalidServerUrl { .. })
        ));
    }

    #[test]
    fn test_display_host() {
        assert_eq!(ConnectionConfig::new("http://box:3000").display_host(), "box:3000");
        assert_eq!(ConnectionConfig::default().display_host(), "localhost:3000");
    }
}
