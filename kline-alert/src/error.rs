use thiserror::Error;

/// All errors generated in `kline-alert` once the process is running.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum AlertError {
    #[error("SocketError: {0}")]
    Socket(String),

    #[error("kline stream closed: {0}")]
    StreamClosed(String),

    #[error("failed to decode kline message: {0}")]
    Decode(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("failed to deliver alert: {0}")]
    Notify(String),
}

impl AlertError {
    /// Determine if an error ends the current kline subscription and requires a reconnect.
    ///
    /// Decode failures only cost the single message that produced them.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_terminal(&self) -> bool {
        match self {
            AlertError::Socket(_) | AlertError::StreamClosed(_) => true,
            _ => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AlertError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(value.to_string())
    }
}

impl From<serde_json::Error> for AlertError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

impl From<reqwest::Error> for AlertError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value.to_string())
    }
}

/// Startup configuration errors. Any of these aborts the process before streaming begins.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid configuration for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
