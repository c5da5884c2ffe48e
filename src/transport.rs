use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::form_urlencoded;

pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },
    #[error("connection to {host}:{port} timed out after {timeout:?}")]
    ConnectTimeout {
        host: String,
        port: u16,
        timeout: Duration,
    },
    #[error("i/o error talking to {host}: {source}")]
    Io {
        host: String,
        source: std::io::Error,
    },
}

/// Raw response split at the first blank-line boundary. Callers only ever
/// interpret the body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub headers: String,
    pub body: String,
}

/// Single synchronous request/response exchange with the classification
/// host. No retries here; callers turn a failure into an `Unreachable`
/// verdict exactly once.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        host: &str,
        path: &str,
        fields: &[(String, String)],
    ) -> Result<RawResponse, TransportError>;
}

pub struct HttpClient {
    port: u16,
    connect_timeout: Duration,
    user_agent: String,
    charset: String,
}

impl HttpClient {
    pub fn new(port: u16, connect_timeout: Duration, user_agent: String, charset: String) -> Self {
        HttpClient {
            port,
            connect_timeout,
            user_agent,
            charset,
        }
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn post(
        &self,
        host: &str,
        path: &str,
        fields: &[(String, String)],
    ) -> Result<RawResponse, TransportError> {
        let body = encode_form(fields);
        let request = format!(
            "POST {path} HTTP/1.0\r\n\
             Host: {host}\r\n\
             Content-Type: application/x-www-form-urlencoded; charset={charset}\r\n\
             Content-Length: {len}\r\n\
             User-Agent: {agent}\r\n\
             \r\n\
             {body}",
            charset = self.charset,
            len = body.len(),
            agent = self.user_agent,
        );

        let connect = TcpStream::connect((host, self.port));
        let mut stream = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(TransportError::Connect {
                    host: host.to_string(),
                    port: self.port,
                    source,
                })
            }
            Err(_) => {
                return Err(TransportError::ConnectTimeout {
                    host: host.to_string(),
                    port: self.port,
                    timeout: self.connect_timeout,
                })
            }
        };

        let io_err = |source| TransportError::Io {
            host: host.to_string(),
            source,
        };

        stream.write_all(request.as_bytes()).await.map_err(io_err)?;

        // HTTP/1.0: the peer closes the stream when the response is done.
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.map_err(io_err)?;

        log::debug!("{} byte response from {host}{path}", raw.len());
        Ok(split_response(&String::from_utf8_lossy(&raw)))
    }
}

/// Percent-encode and `&`-join the field pairs.
pub fn encode_form(fields: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Split a raw response into header and body blocks at the first blank
/// line. A response with no boundary is all headers and an empty body.
fn split_response(raw: &str) -> RawResponse {
    for boundary in ["\r\n\r\n", "\n\n"] {
        if let Some(at) = raw.find(boundary) {
            return RawResponse {
                headers: raw[..at].to_string(),
                body: raw[at + boundary.len()..].to_string(),
            };
        }
    }
    RawResponse {
        headers: raw.to_string(),
        body: String::new(),
    }
}
