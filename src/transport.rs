//! HTTP transport collaborator.
//!
//! [`Transport`] is the client's only dependency on an HTTP stack; the default
//! implementation wraps a blocking `reqwest` client.

use std::time::Duration;

use url::Url;

use crate::error::TransportError;
use crate::parameters::{FilePart, Method};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_USER_AGENT: &str = concat!("avatar-cycle/", env!("CARGO_PKG_VERSION"));

/// Wire-level body of an outgoing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HttpBody {
    Empty,
    /// `application/x-www-form-urlencoded`, already encoded.
    Form(String),
    /// `multipart/form-data` carrying only file parts.
    Multipart(Vec<FilePart>),
}

#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: HttpBody,
}

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns the status and body, whatever the status.
///
/// Only failures that prevent an HTTP response (DNS, TLS, timeout) are errors.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Settings for the default transport.
#[derive(Clone, Debug)]
pub struct TransportOptions {
    pub timeout: Duration,
    pub verify_tls: bool,
    pub user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        TransportOptions {
            timeout: DEFAULT_TIMEOUT,
            verify_tls: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use reqwest::blocking::{multipart, Client};
    use reqwest::header::CONTENT_TYPE;

    use super::*;

    /// Blocking `reqwest` transport.
    #[derive(Clone, Debug)]
    pub struct ReqwestTransport(Client);

    impl ReqwestTransport {
        pub fn new(options: &TransportOptions) -> Result<Self, TransportError> {
            let client = Client::builder()
                .timeout(options.timeout)
                .danger_accept_invalid_certs(!options.verify_tls)
                .user_agent(options.user_agent.as_str())
                .build()
                .map_err(TransportError::build)?;
            Ok(ReqwestTransport(client))
        }

        pub fn with_client(client: Client) -> Self {
            ReqwestTransport(client)
        }
    }

    fn multipart_form(files: Vec<FilePart>) -> Result<multipart::Form, TransportError> {
        let mut form = multipart::Form::new();
        for file in files {
            let part = multipart::Part::bytes(file.content)
                .file_name(file.file_name)
                .mime_str(&file.media_type)?;
            form = form.part(file.name, part);
        }
        Ok(form)
    }

    impl Transport for ReqwestTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
            };
            let mut builder = self.0.request(method, request.url);
            for (k, v) in &request.headers {
                builder = builder.header(k.as_str(), v.as_str());
            }
            builder = match request.body {
                HttpBody::Empty => builder,
                HttpBody::Form(body) => builder
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(body),
                HttpBody::Multipart(files) => builder.multipart(multipart_form(files)?),
            };

            let response = builder.send()?;
            let status = response.status().as_u16();
            let body = response.bytes()?.to_vec();
            Ok(HttpResponse { status, body })
        }
    }
}
