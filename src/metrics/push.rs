//! Prometheus Pushgateway client

use crate::config::GatewayConfig;
use crate::errors::{MetricsError, MetricsResult};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;

/// Content type of the text exposition format
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Job name every load-test push is grouped under
pub const LOAD_TEST_JOB: &str = "load_test";

/// Grouping key of a push: the job plus extra label pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouping {
    pub job: String,
    pub labels: Vec<(String, String)>,
}

impl Grouping {
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            labels: Vec::new(),
        }
    }

    /// `job="load_test", test_case=<case>`
    pub fn for_case(case: &str) -> Self {
        Self::new(LOAD_TEST_JOB).with_label("test_case", case)
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((name.into(), value.into()));
        self
    }
}

/// Pushes encoded metric families to an aggregation gateway
#[async_trait]
pub trait MetricsPusher: Send + Sync {
    /// Replace the metrics of `grouping` on the gateway with `payload`
    async fn push(&self, gateway: &GatewayConfig, grouping: &Grouping, payload: String) -> MetricsResult<()>;
}

/// Base URL of the gateway: `host:port`, with `http://` added when the host has no scheme
pub fn gateway_endpoint(gateway: &GatewayConfig) -> MetricsResult<Url> {
    let host = gateway.host.trim().trim_end_matches('/');
    let address = if host.contains("://") {
        format!("{}:{}", host, gateway.port)
    } else {
        format!("http://{}:{}", host, gateway.port)
    };

    Url::parse(&address).map_err(|e| MetricsError::InvalidEndpoint {
        endpoint: address.clone(),
        reason: e.to_string(),
    })
}

/// Path segments for one grouping pair.
///
/// Empty values become `<name>@base64/=` and values containing `/` become
/// `<name>@base64/<url-safe base64>`, since a slash cannot survive as a path
/// segment even when percent-encoded.
fn grouping_segments(name: &str, value: &str) -> (String, String) {
    if value.is_empty() {
        (format!("{}@base64", name), "=".to_string())
    } else if value.contains('/') {
        (format!("{}@base64", name), URL_SAFE_NO_PAD.encode(value))
    } else {
        (name.to_string(), value.to_string())
    }
}

/// Full push URL: `<endpoint>/metrics/job/<job>/<label>/<value>...`
pub fn push_url(gateway: &GatewayConfig, grouping: &Grouping) -> MetricsResult<Url> {
    let mut url = gateway_endpoint(gateway)?;
    let endpoint = url.to_string();

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| MetricsError::InvalidEndpoint {
                endpoint,
                reason: "endpoint cannot be a base URL".to_string(),
            })?;
        let (job_key, job) = grouping_segments("job", &grouping.job);
        segments.pop_if_empty().extend(["metrics", job_key.as_str(), job.as_str()]);
        for (name, value) in &grouping.labels {
            let (key, value) = grouping_segments(name, value);
            segments.push(&key).push(&value);
        }
    }

    Ok(url)
}

/// HTTP pusher speaking the Pushgateway PUT protocol
#[derive(Debug, Clone, Default)]
pub struct HttpPushGateway {
    client: reqwest::Client,
}

impl HttpPushGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricsPusher for HttpPushGateway {
    async fn push(&self, gateway: &GatewayConfig, grouping: &Grouping, payload: String) -> MetricsResult<()> {
        let url = push_url(gateway, grouping)?;
        let endpoint = url.to_string();

        tracing::debug!(endpoint = %endpoint, bytes = payload.len(), "Pushing metrics");

        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)
            .timeout(gateway.push_timeout())
            .body(payload)
            .send()
            .await
            .map_err(|e| MetricsError::ConnectionFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(MetricsError::HttpError {
                status: response.status().as_u16(),
                endpoint,
            });
        }

        Ok(())
    }
}
