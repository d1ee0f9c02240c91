//! Error types shared by the pipeline stages.
//!
//! Only a handful of these ever escalate: a failed top-stories fetch is
//! reported to the [`RetryGovernor`](crate::retry::RetryGovernor), everything
//! else is caught at the cycle boundary and logged.

use thiserror::Error;

/// Result type for miner operations.
pub type Result<T> = std::result::Result<T, MinerError>;

/// Failures surfaced by the HTTP layer, the ledger and configuration.
#[derive(Debug, Error)]
pub enum MinerError {
    /// Connection failure, timeout or redirect loop.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a status outside the configured success set.
    #[error("unexpected status {status} from {url}")]
    BadStatus { url: String, status: u16 },

    /// A response body was not the JSON shape we expected.
    #[error("could not decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// The ledger file exists but could not be read or written.
    #[error("ledger I/O on {path}: {source}")]
    Ledger {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A URL could not be built from configuration.
    #[error("invalid url {input:?}: {source}")]
    Url {
        input: String,
        #[source]
        source: url::ParseError,
    },

    /// Configuration failed to load or validate.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MinerError {
    pub(crate) fn decode(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            what: what.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_status_names_url_and_code() {
        let err = MinerError::BadStatus {
            url: "https://example.com/top".into(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "unexpected status 503 from https://example.com/top"
        );
    }

    #[test]
    fn decode_keeps_source_chain() {
        let source = serde_json::from_str::<Vec<u64>>("{").unwrap_err();
        let err = MinerError::decode("top stories", source);
        assert!(err.to_string().starts_with("could not decode top stories"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
