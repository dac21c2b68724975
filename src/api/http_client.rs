//! reqwest-backed transport
//!
//! One pooled client per configuration. Every request is bounded by the
//! configured timeout; an expired request surfaces as a transport error.

use super::form::{FormPayload, PartValue};
use super::{Endpoint, RawResponse, Transport};
use crate::config::ServiceConfig;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::{Duration, Instant};

pub struct HttpTransport {
    client: Client,
    api_base: String,
}

impl HttpTransport {
    /// Build the transport for a service configuration
    ///
    /// - request timeout from configuration
    /// - 90s idle timeout for pooled connections
    /// - TCP keepalive and nodelay for the small form uploads
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.api_base, endpoint.path())
    }
}

fn to_multipart(payload: FormPayload) -> Result<Form> {
    let mut form = Form::new();
    for part in payload.into_parts() {
        form = match part.value {
            PartValue::Text(text) => form.text(part.name, text),
            PartValue::File(file) => {
                let body = Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(&file.mime)
                    .map_err(|e| ClientError::Transport(format!("Invalid media type: {}", e)))?;
                form.part(part.name, body)
            }
        };
    }
    Ok(form)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_form(&self, endpoint: Endpoint, form: FormPayload) -> Result<RawResponse> {
        let url = self.url(endpoint);
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .multipart(to_multipart(form)?)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(endpoint = endpoint.path(), error = %e, "Request failed");
                ClientError::from(e)
            })?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            endpoint = endpoint.path(),
            status,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Service responded"
        );

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Attachment, MediaKind};

    #[test]
    fn test_transport_urls() {
        let config = ServiceConfig::default()
            .with_api_base("https://health.example.org/api/")
            .unwrap();
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(
            transport.url(Endpoint::Analyze),
            "https://health.example.org/api/analyze"
        );
        assert_eq!(
            transport.url(Endpoint::ExplainLime),
            "https://health.example.org/api/explain/lime"
        );
    }

    #[test]
    fn test_multipart_conversion() {
        let image = Attachment::from_bytes("face.png", vec![1, 2, 3], MediaKind::FaceImage).unwrap();
        let payload = FormPayload::new()
            .file("image", image)
            .text("symptoms", "headache");
        assert!(to_multipart(payload).is_ok());
    }
}
