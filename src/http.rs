//! HTTP transport used by the pipeline.
//!
//! The pipeline only talks to the network through [`HttpClient`], which keeps
//! transport failures ([`MinerError::Transport`]) apart from responses that
//! merely carry an unwanted status. Deciding whether a status is acceptable is
//! left to the caller, since the success set comes from configuration.
//!
//! - [`HttpClient`]: the two calls the pipeline needs
//! - [`ReqwestClient`]: the production implementation on top of `reqwest`

use crate::config::Config;
use crate::error::{MinerError, Result};
use reqwest::redirect::Policy;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// A response that made it back over the wire, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Minimal async HTTP surface the pipeline depends on.
pub trait HttpClient {
    /// Issue a GET and read the body as text.
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    /// POST `body` serialized as JSON with a JSON content type.
    async fn post_json<T>(&self, url: &str, body: &T) -> Result<HttpResponse>
    where
        T: Serialize + ?Sized;
}

/// [`HttpClient`] backed by a shared `reqwest::Client`.
///
/// Timeout and redirect policy come from the `source` section of the
/// configuration and apply to every request.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(config: &Config) -> Result<Self> {
        let policy = if config.source.follow_redirect {
            Policy::limited(config.source.max_redirects)
        } else {
            Policy::none()
        };
        let inner = reqwest::Client::builder()
            .timeout(config.timeout())
            .redirect(policy)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MinerError::Config(format!("building http client: {e}")))?;
        Ok(Self { inner })
    }

    async fn read(url: &str, resp: reqwest::Response) -> Result<HttpResponse> {
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| transport(url, e))?;
        Ok(HttpResponse { status, body })
    }
}

impl HttpClient for ReqwestClient {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let t0 = Instant::now();
        let res = match self.inner.get(url).send().await {
            Ok(resp) => Self::read(url, resp).await,
            Err(e) => Err(transport(url, e)),
        };
        let dt = t0.elapsed();

        match &res {
            Ok(r) => debug!(
                status = r.status,
                bytes = r.body.len(),
                elapsed_ms = dt.as_millis() as u64,
                "GET finished"
            ),
            Err(e) => warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "GET failed"),
        }
        res
    }

    #[instrument(level = "debug", skip(self, body))]
    async fn post_json<T>(&self, url: &str, body: &T) -> Result<HttpResponse>
    where
        T: Serialize + ?Sized,
    {
        let t0 = Instant::now();
        let res = match self.inner.post(url).json(body).send().await {
            Ok(resp) => Self::read(url, resp).await,
            Err(e) => Err(transport(url, e)),
        };
        let dt = t0.elapsed();

        match &res {
            Ok(r) => debug!(
                status = r.status,
                elapsed_ms = dt.as_millis() as u64,
                "POST finished"
            ),
            Err(e) => warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "POST failed"),
        }
        res
    }
}

fn transport(url: &str, e: reqwest::Error) -> MinerError {
    MinerError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    }
}
