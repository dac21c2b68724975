//! Analysis service API
//!
//! Every call the client makes is a multipart form `POST`. The [`Transport`]
//! trait carries exactly that, and leaves status interpretation to the
//! workflows so that failure policy lives in one place per workflow.

mod form;
mod http_client;

pub use form::{Attachment, FormPart, FormPayload, MediaKind, PartValue};
pub use http_client::HttpTransport;

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Service endpoints used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Analyze,
    ExplainShap,
    ExplainLime,
    ExplainCounterfactual,
    ExportFhir,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Analyze => "/analyze",
            Endpoint::ExplainShap => "/explain/shap",
            Endpoint::ExplainLime => "/explain/lime",
            Endpoint::ExplainCounterfactual => "/explain/counterfactual",
            Endpoint::ExportFhir => "/export/fhir",
        }
    }
}

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(ClientError::from)
    }
}

/// Sends a form to the analysis service.
///
/// `Ok` means a response arrived, whatever its status. `Err` is reserved for
/// exchanges that produced no response at all.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_form(&self, endpoint: Endpoint, form: FormPayload) -> Result<RawResponse>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fake used by workflow tests

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted reply for one endpoint
    #[derive(Clone)]
    pub enum Reply {
        Respond(RawResponse),
        Fail(String),
    }

    #[derive(Default)]
    pub struct RecordingTransport {
        replies: Mutex<HashMap<Endpoint, Reply>>,
        calls: Mutex<Vec<(Endpoint, FormPayload)>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, endpoint: Endpoint, status: u16, body: &str) -> Self {
            self.replies
                .lock()
                .unwrap()
                .insert(endpoint, Reply::Respond(RawResponse::new(status, body)));
            self
        }

        pub fn fail(self, endpoint: Endpoint, message: &str) -> Self {
            self.replies
                .lock()
                .unwrap()
                .insert(endpoint, Reply::Fail(message.to_string()));
            self
        }

        pub fn set_reply(&self, endpoint: Endpoint, status: u16, body: &str) {
            self.replies
                .lock()
                .unwrap()
                .insert(endpoint, Reply::Respond(RawResponse::new(status, body)));
        }

        pub fn calls(&self) -> Vec<(Endpoint, FormPayload)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn endpoints(&self) -> Vec<Endpoint> {
            self.calls.lock().unwrap().iter().map(|(e, _)| *e).collect()
        }

        pub fn count(&self, endpoint: Endpoint) -> usize {
            self.endpoints().into_iter().filter(|e| *e == endpoint).count()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn post_form(&self, endpoint: Endpoint, form: FormPayload) -> Result<RawResponse> {
            self.calls.lock().unwrap().push((endpoint, form));
            let reply = self.replies.lock().unwrap().get(&endpoint).cloned();
            match reply {
                Some(Reply::Respond(response)) => Ok(response),
                Some(Reply::Fail(message)) => Err(ClientError::Transport(message)),
                None => Ok(RawResponse::new(404, "Not Found")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::Analyze.path(), "/analyze");
        assert_eq!(Endpoint::ExplainCounterfactual.path(), "/explain/counterfactual");
        assert_eq!(Endpoint::ExportFhir.path(), "/export/fhir");
    }

    #[test]
    fn test_raw_response_status() {
        assert!(RawResponse::new(200, "{}").is_success());
        assert!(RawResponse::new(201, "").is_success());
        assert!(!RawResponse::new(500, "boom").is_success());
        assert_eq!(RawResponse::new(500, "boom").text(), "boom");
    }
}
