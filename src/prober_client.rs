//! Client for the latency probe exposed by prober agents.
//!
//! A probe is a single `GET /probe?module=<module>&target=<target>` request.
//! The agent answers with an exposition-format body of `<metric> <value>`
//! lines, of which only `probe_duration_seconds` is read.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Limited};
use hyper::StatusCode;
use tracing::debug;

use crate::constants::{MAX_PROBE_RESPONSE_BYTES, PROBE_DURATION_METRIC};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid probe request {uri}: {source}")]
    InvalidRequest {
        uri: String,
        #[source]
        source: http::Error,
    },
    #[error("unable to connect to prober {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("http error: {0}")]
    Http(#[from] hyper::Error),
    #[error("bad status: {0}")]
    BadStatus(StatusCode),
    #[error("unable to read probe response body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("metric probe_duration_seconds not found")]
    MetricNotFound,
    #[error("malformed metric line: {0:?}")]
    MalformedMetric(String),
}

/// Issues probes against prober agents listening on a fixed port.
#[derive(Debug, Clone)]
pub struct ProberClient {
    port: u16,
    timeout: Duration,
}

impl ProberClient {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Asks the prober at `address` to probe `target` with `module` and
    /// returns the measured duration.
    ///
    /// The whole exchange is bounded by the client timeout. The in-flight
    /// request is dropped when the deadline passes.
    #[tracing::instrument(name = "ProberClient::probe", skip_all, fields(
        %address,
        port = self.port,
        %module,
        %target,
    ))]
    pub async fn probe(
        &self,
        address: &str,
        module: &str,
        target: &str,
    ) -> Result<Duration, ProbeError> {
        match tokio::time::timeout(self.timeout, self.request(address, module, target)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(timeout = ?self.timeout, "probe timed out");
                Err(ProbeError::Timeout(self.timeout))
            }
        }
    }

    async fn request(
        &self,
        address: &str,
        module: &str,
        target: &str,
    ) -> Result<Duration, ProbeError> {
        let uri = probe_path(module, target);
        let host = host_header(address, self.port);

        let stream = tokio::net::TcpStream::connect((address, self.port))
            .await
            .map_err(|source| ProbeError::Connect {
                addr: host.clone(),
                source,
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(error) = conn.await {
                debug!(?error, "prober connection closed with error");
            }
        });

        let request = http::Request::builder()
            .method(http::Method::GET)
            .uri(uri.as_str())
            .header(http::header::HOST, host.as_str())
            .header(http::header::USER_AGENT, "network-scheduler/0.1")
            .body(Empty::<Bytes>::new())
            .map_err(|source| ProbeError::InvalidRequest {
                uri: uri.clone(),
                source,
            })?;

        let response = sender.send_request(request).await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, %uri, "prober answered with non-2xx status");
            return Err(ProbeError::BadStatus(status));
        }

        let body = Limited::new(response.into_body(), MAX_PROBE_RESPONSE_BYTES)
            .collect()
            .await
            .map_err(ProbeError::Body)?
            .to_bytes();

        parse_probe_duration(&String::from_utf8_lossy(&body))
    }
}

/// Path and query sent to the prober. Values are inserted verbatim.
pub fn probe_path(module: &str, target: &str) -> String {
    format!("/probe?module={module}&target={target}")
}

fn host_header(address: &str, port: u16) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{address}]:{port}")
    } else {
        format!("{address}:{port}")
    }
}

/// Extracts `probe_duration_seconds` from an exposition-format body.
///
/// The first line whose first token is the metric name wins. Comment lines
/// start with `#` and never match.
pub fn parse_probe_duration(body: &str) -> Result<Duration, ProbeError> {
    for line in body.lines() {
        let mut fields = line.split_whitespace();

        if fields.next() != Some(PROBE_DURATION_METRIC) {
            continue;
        }

        let seconds: f64 = fields
            .next()
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| ProbeError::MalformedMetric(line.to_owned()))?;

        return Duration::try_from_secs_f64(seconds)
            .map_err(|_| ProbeError::MalformedMetric(line.to_owned()));
    }

    Err(ProbeError::MetricNotFound)
}
