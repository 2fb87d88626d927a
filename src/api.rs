//! Shared HTTP plumbing for the third-party API clients.
//!
//! Every client issues a single request with a bounded timeout and no
//! retries.  Failures are reported through [`ApiError`]:
//!
//! | Variant          | Meaning                                              |
//! |------------------|------------------------------------------------------|
//! | `NotConfigured`  | credentials missing; no request was sent             |
//! | `Build`          | the request could not be constructed                 |
//! | `Transport`      | connection / I/O failure                             |
//! | `Timeout`        | no response within the timeout                       |
//! | `Remote`         | non-success status; carries the code and raw body    |
//! | `Decode`         | response body was not the expected JSON              |
//! | `EmptyResult`    | well-formed response with nothing usable in it       |

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Timeout applied to every outbound API request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Errors returned by the chat, speech and connector clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client has no API key / credentials.
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    /// The request could not be built or serialised.
    #[error("failed to build request: {0}")]
    Build(String),

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The request did not complete within the timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with an unexpected status.
    #[error("{service} API returned status {status}: {body}")]
    Remote {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The response body could not be parsed.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The response parsed but held no usable content.
    #[error("{0} returned no content")]
    EmptyResult(&'static str),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_builder() {
            ApiError::Build(e.to_string())
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a `reqwest::Client` with the given per-request timeout.
///
/// A default (no-timeout) client is used as a last-resort fallback if the
/// builder fails (it only does when the TLS backend cannot initialise).
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("HTTP client builder failed ({e}); using defaults");
            reqwest::Client::new()
        })
}

/// Buffer the whole response body and return it when the status is one of
/// `accepted`; otherwise fail with [`ApiError::Remote`] carrying the body
/// verbatim.
pub(crate) async fn read_body(
    service: &'static str,
    response: reqwest::Response,
    accepted: &[StatusCode],
) -> Result<Vec<u8>, ApiError> {
    let status = response.status();
    let body = response.bytes().await?.to_vec();

    if !accepted.contains(&status) {
        return Err(ApiError::Remote {
            service,
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }
    Ok(body)
}

/// [`read_body`] followed by JSON decoding.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
    accepted: &[StatusCode],
) -> Result<T, ApiError> {
    let body = read_body(service, response, accepted).await?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Test server
// ---------------------------------------------------------------------------

/// One-shot HTTP/1.1 server for exercising the clients without the network.
///
/// Each canned response answers exactly one connection, in order, with
/// `Connection: close`, so the client opens a fresh connection per request.
#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// A request as seen on the wire.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: String,
        /// Path plus query string, e.g. `/models/m:generateContent?key=k`.
        pub target: String,
        /// Header names are lower-cased.
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            let name = name.to_ascii_lowercase();
            self.headers
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_str())
        }

        pub fn json(&self) -> serde_json::Value {
            serde_json::from_slice(&self.body).expect("request body is JSON")
        }

        pub fn body_text(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    /// A canned reply.
    #[derive(Debug, Clone)]
    pub struct CannedResponse {
        pub status: u16,
        pub content_type: &'static str,
        pub body: Vec<u8>,
    }

    impl CannedResponse {
        pub fn json(status: u16, value: serde_json::Value) -> Self {
            Self {
                status,
                content_type: "application/json",
                body: value.to_string().into_bytes(),
            }
        }

        pub fn bytes(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
            Self {
                status,
                content_type,
                body: body.into(),
            }
        }
    }

    /// Bind `127.0.0.1:0`, answer `responses` in order, then return every
    /// request received.  Yields the server's base URL (`http://127.0.0.1:N`).
    pub async fn serve(
        responses: Vec<CannedResponse>,
    ) -> (String, JoinHandle<Vec<RecordedRequest>>) {
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");

        let handle = tokio::spawn(async move {
            let mut recorded = Vec::with_capacity(responses.len());
            for response in responses {
                let (mut stream, _) = listener.accept().await.expect("accept");
                recorded.push(read_request(&mut stream).await);
                write_response(&mut stream, &response).await;
            }
            recorded
        });

        (format!("http://{addr}"), handle)
    }

    async fn read_request(stream: &mut TcpStream) -> RecordedRequest {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            let n = stream.read(&mut chunk).await.expect("read request head");
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let mut lines = head.split("\r\n");
        let mut request_line = lines.next().unwrap_or_default().split(' ');
        let method = request_line.next().unwrap_or_default().to_string();
        let target = request_line.next().unwrap_or_default().to_string();

        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();

        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);

        let mut body = buf[header_end..].to_vec();
        while body.len() < content_length {
            let n = stream.read(&mut chunk).await.expect("read request body");
            assert!(n > 0, "client closed mid-body");
            body.extend_from_slice(&chunk[..n]);
        }
        body.truncate(content_length);

        RecordedRequest {
            method,
            target,
            headers,
            body,
        }
    }

    async fn write_response(stream: &mut TcpStream, response: &CannedResponse) {
        let head = format!(
            "HTTP/1.1 {} Canned\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            response.status,
            response.content_type,
            response.body.len()
        );
        stream.write_all(head.as_bytes()).await.expect("write head");
        stream.write_all(&response.body).await.expect("write body");
        stream.flush().await.expect("flush");
        let _ = stream.shutdown().await;
    }
}
