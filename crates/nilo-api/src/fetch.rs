// Cancellable HTTP exchange
//
// The lowest layer every remote call goes through: send one request, read
// the whole body, and race both against the owner's cancellation token.
// Cancellation surfaces as `Error::Cancelled`, never as a transport failure.

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{Error, preview};

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Parse the body as JSON.
    ///
    /// An empty 2xx body parses as JSON `null`, so endpoints that answer
    /// `204 No Content` can still be read as `serde_json::Value`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let text = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(text).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&self.body)),
            body: self.body.clone(),
        })
    }

    /// Convert a non-2xx response into an `Error::HttpStatus`.
    pub fn into_status_error(self) -> Error {
        Error::HttpStatus {
            status: self.status.as_u16(),
            body: preview(&self.body).to_owned(),
        }
    }
}

/// Send a request and read its body, unless `cancel` fires first.
///
/// Network-level failures come back as `Error::Transport`; HTTP error
/// statuses are NOT errors at this layer, the caller inspects `status`.
pub async fn send(
    request: reqwest::RequestBuilder,
    cancel: &CancellationToken,
) -> Result<RawResponse, Error> {
    let exchange = async {
        let resp = request.send().await?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp.text().await?;
        trace!(%status, body = preview(&body), "response received");
        Ok::<_, Error>(RawResponse {
            status,
            content_type,
            body,
        })
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!("request cancelled by owner");
            Err(Error::Cancelled)
        }
        result = exchange => result,
    }
}

/// Whether a transport error happened before any HTTP status was received.
pub(crate) fn is_network_failure(err: &Error) -> bool {
    match err {
        Error::Transport(e) => e.status().is_none() && !e.is_builder(),
        _ => false,
    }
}
