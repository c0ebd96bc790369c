//! Minimal OAuth 1.0a API client: just enough to verify credentials and replace
//! the profile image.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::avatar::Avatar;
use crate::cache::ResponseCache;
use crate::error::{Error, Result};
use crate::parameters::{drop_null, Body, Method, Request};
use crate::transport::{HttpBody, HttpRequest, HttpResponse, Transport};
use crate::util;
use crate::v1::{Credentials, OAuthSignBuilder, SignedRequest};

pub const API_URL: &str = "https://api.twitter.com/1.1/";

const RESOURCE_VERIFY_CREDENTIALS: &str = "account/verify_credentials";
const RESOURCE_UPDATE_PROFILE_IMAGE: &str = "account/update_profile_image";
const AVATAR_FIELD: &str = "image";

/// How the image bytes travel to `update_profile_image`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UploadMode {
    /// Base64 in the signed `image` form field.
    #[default]
    Base64,
    /// Raw bytes in an unsigned `multipart/form-data` part.
    Multipart,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    message: String,
    #[allow(dead_code)]
    code: Option<i64>,
}

pub struct Client<T> {
    signer: OAuthSignBuilder,
    transport: T,
    api_base: Url,
    cache: Option<ResponseCache>,
}

impl<T: Transport> Client<T> {
    /// Creates a client. Token credentials with an empty key mean "no token".
    pub fn new(consumer: Credentials, token: Option<Credentials>, transport: T) -> Result<Self> {
        if consumer.key().is_empty() || consumer.secret().is_empty() {
            return Err(Error::invalid_credentials(
                "consumer key and secret must not be empty",
            ));
        }
        let mut signer = OAuthSignBuilder::new(consumer);
        signer.oauth_token(token);
        Ok(Client {
            signer,
            transport,
            api_base: util::parse_url(API_URL)?,
            cache: None,
        })
    }

    /// Overrides the base URL bare resource names are resolved against.
    pub fn with_api_base(mut self, api_base: &str) -> Result<Self> {
        let mut base = util::parse_url(api_base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        self.api_base = base;
        Ok(self)
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Tests whether the user credentials are valid.
    ///
    /// A 401 answer means "not authenticated" and is not an error. Never served
    /// from the response cache.
    pub fn authenticate(&self) -> Result<bool> {
        match self.request(RESOURCE_VERIFY_CREDENTIALS, Method::Get, Body::default()) {
            Ok(res) => Ok(res.get("id").map_or(false, is_present)),
            Err(Error::Api { status: 401, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Replaces the profile image with `avatar`.
    pub fn update_avatar(&self, avatar: &Avatar, mode: UploadMode) -> Result<Value> {
        tracing::info!(avatar = %avatar.path.display(), ?mode, "updating profile image");
        let body = match mode {
            UploadMode::Base64 => Body::url_encoded(vec![(AVATAR_FIELD, Some(avatar.to_base64()))]),
            UploadMode::Multipart => Body::multipart(
                Vec::<(String, Option<String>)>::new(),
                vec![avatar.to_file_part(AVATAR_FIELD)],
            ),
        };
        self.request(RESOURCE_UPDATE_PROFILE_IMAGE, Method::Post, body)
    }

    /// Signs and sends a request to `resource`, returning the decoded JSON.
    pub fn request(&self, resource: &str, method: Method, body: Body) -> Result<Value> {
        let url = util::resolve_resource(&self.api_base, resource)?;
        let signed = self.signer.sign(Request::new(method, &url, body)?)?;
        let http_request = into_http_request(signed);
        tracing::info!(method = %http_request.method, url = %redacted(&http_request.url), "sending request");

        let response = self.transport.execute(http_request)?;
        tracing::debug!(status = response.status, bytes = response.body.len(), "received response");
        decode_response(response)
    }

    /// POSTs a multipart request whose files are read from disk. Only `params`
    /// are signed.
    pub fn upload_files<I, K, V, N, P>(
        &self,
        resource: &str,
        params: I,
        files: &[(N, P)],
    ) -> Result<Value>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
        N: AsRef<str>,
        P: AsRef<Path>,
    {
        let body = Body::multipart_from_files(params, files)?;
        self.request(resource, Method::Post, body)
    }

    /// GET through the response cache when one is configured.
    pub fn cached_request<I, K, V>(
        &self,
        resource: &str,
        params: I,
        expire: Option<Duration>,
    ) -> Result<Value>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params = drop_null(params);
        let cache = match &self.cache {
            Some(cache) => cache,
            None => return self.request(resource, Method::Get, Body::UrlEncoded(params)),
        };
        let path = cache.path_for(&self.cache_key(resource, &params));
        cache.get_or_fetch(&path, expire, || {
            self.request(resource, Method::Get, Body::UrlEncoded(params.clone()))
        })
    }

    fn cache_key(&self, resource: &str, params: &[(String, String)]) -> String {
        let consumer = self.signer.consumer();
        let (token_key, token_secret) = self
            .signer
            .token()
            .map_or(("", ""), |t| (t.key(), t.secret()));
        format!(
            "{}{}{}",
            resource,
            serde_json::to_string(params).unwrap_or_default(),
            serde_json::json!([consumer.key(), consumer.secret(), token_key, token_secret]),
        )
    }
}

/// Applies the dispatch contract: GET carries everything in the query string,
/// POST in a form body, and multipart uploads keep signed fields in the query
/// string with only the files in the body.
fn into_http_request(signed: SignedRequest) -> HttpRequest {
    let method = signed.request().method();
    let body = signed.request().body();
    let (url, body) = match (method, body) {
        (Method::Get, _) => (signed.to_url(), HttpBody::Empty),
        (Method::Post, Body::UrlEncoded(_)) => (
            signed.request().url().clone(),
            HttpBody::Form(signed.to_postdata()),
        ),
        (Method::Post, Body::Multipart { files, .. }) => (
            signed.to_url(),
            HttpBody::Multipart(files.clone()),
        ),
    };
    HttpRequest {
        method,
        url,
        headers: Vec::new(),
        body,
    }
}

fn decode_response(response: HttpResponse) -> Result<Value> {
    if !response.is_success() {
        let message = serde_json::from_slice::<ErrorPayload>(&response.body)
            .ok()
            .and_then(|p| p.errors.into_iter().next())
            .map(|e| e.message)
            .unwrap_or_else(|| format!("Server error #{}", response.status));
        tracing::debug!(status = response.status, %message, "API error");
        return Err(Error::Api {
            status: response.status,
            message,
        });
    }
    serde_json::from_slice(&response.body).map_err(|source| Error::Decode {
        status: response.status,
        source,
    })
}

// PHP-style emptiness: null, false, 0, "" and "0" are absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

// keep oauth values out of logs
fn redacted(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::parameters::FilePart;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records requests and replays canned responses.
    struct FakeTransport {
        responses: Mutex<Vec<std::result::Result<HttpResponse, TransportError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        fn new(responses: Vec<std::result::Result<HttpResponse, TransportError>>) -> Self {
            FakeTransport {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn reply(status: u16, body: &str) -> Self {
            FakeTransport::new(vec![Ok(HttpResponse {
                status,
                body: body.as_bytes().to_vec(),
            })])
        }

        fn last(&self) -> HttpRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn client(transport: &FakeTransport) -> Client<&FakeTransport> {
        Client::new(
            Credentials::new("ck", "cs"),
            Some(Credentials::new("tk", "ts")),
            transport,
        )
        .unwrap()
    }

    fn avatar() -> Avatar {
        Avatar {
            path: "/tmp/me.png".into(),
            content: b"hello".to_vec(),
            media_type: "image/png",
        }
    }

    #[test]
    fn test_empty_consumer_rejected() {
        let transport = FakeTransport::new(Vec::new());
        let err = Client::new(Credentials::new("", ""), None, &transport)
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidCredentials { .. }));
    }

    #[test]
    fn test_authenticate() {
        let transport = FakeTransport::reply(200, r#"{"id": 12345, "screen_name": "me"}"#);
        assert!(client(&transport).authenticate().unwrap());
        let req = transport.last();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.url.path(), "/1.1/account/verify_credentials.json");
        assert!(req.url.query().unwrap().contains("oauth_signature="));
        assert!(req.url.query().unwrap().contains("oauth_token=tk"));

        let transport = FakeTransport::reply(200, r#"{"id": 0}"#);
        assert!(!client(&transport).authenticate().unwrap());
    }

    #[test]
    fn test_authenticate_401_is_false() {
        let transport = FakeTransport::reply(
            401,
            r#"{"errors":[{"message":"Could not authenticate you.","code":32}]}"#,
        );
        assert!(!client(&transport).authenticate().unwrap());
    }

    #[test]
    fn test_authenticate_other_status_propagates() {
        let transport = FakeTransport::reply(503, "<html>unavailable</html>");
        let err = client(&transport).authenticate().unwrap_err();
        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "Server error #503");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_transport_error_is_distinct() {
        let transport = FakeTransport::new(vec![Err(TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "timed out",
        )))]);
        let err = client(&transport).authenticate().unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn test_api_error_message() {
        let transport = FakeTransport::reply(
            400,
            r#"{"errors":[{"message":"Image is too large","code":324}]}"#,
        );
        let err = client(&transport)
            .update_avatar(&avatar(), UploadMode::Base64)
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "Image is too large");
    }

    #[test]
    fn test_decode_error() {
        let transport = FakeTransport::reply(200, "not json");
        let err = client(&transport)
            .update_avatar(&avatar(), UploadMode::Base64)
            .unwrap_err();
        assert!(matches!(err, Error::Decode { status: 200, .. }));
    }

    #[test]
    fn test_update_avatar_base64() {
        let transport = FakeTransport::reply(200, r#"{"id": 1}"#);
        client(&transport)
            .update_avatar(&avatar(), UploadMode::Base64)
            .unwrap();
        let req = transport.last();
        assert_eq!(req.method, Method::Post);
        assert_eq!(
            req.url.as_str(),
            "https://api.twitter.com/1.1/account/update_profile_image.json"
        );
        match req.body {
            HttpBody::Form(body) => {
                assert!(body.starts_with("image=aGVsbG8%3D&"));
                assert!(body.contains("oauth_consumer_key=ck"));
                assert!(body.contains("oauth_signature="));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_update_avatar_multipart() {
        let transport = FakeTransport::reply(200, r#"{"id": 1}"#);
        client(&transport)
            .update_avatar(&avatar(), UploadMode::Multipart)
            .unwrap();
        let req = transport.last();
        let query = req.url.query().unwrap().to_string();
        assert!(query.contains("oauth_signature="));
        assert!(!query.contains("image="));
        match req.body {
            HttpBody::Multipart(files) => {
                assert_eq!(
                    files,
                    vec![FilePart::new("image", "me.png", "image/png", b"hello".to_vec())]
                );
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_null_params_dropped() {
        let transport = FakeTransport::reply(200, "[]");
        client(&transport)
            .request(
                "statuses/user_timeline",
                Method::Get,
                Body::url_encoded(vec![("count", Some("5")), ("since_id", None)]),
            )
            .unwrap();
        let query = transport.last().url.query().unwrap().to_string();
        assert!(query.starts_with("count=5&"));
        assert!(!query.contains("since_id"));
    }

    #[test]
    fn test_cached_request_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::reply(200, r#"{"id": 7}"#);
        let client = client(&transport).with_cache(ResponseCache::new(dir.path()));
        let no_params: Vec<(String, Option<String>)> = Vec::new();

        let first = client
            .cached_request("account/settings", no_params.clone(), None)
            .unwrap();
        // the transport has no responses left, so this must be a cache hit
        let second = client
            .cached_request("account/settings", no_params, None)
            .unwrap();
        assert_eq!(first, json!({"id": 7}));
        assert_eq!(second, first);
        assert_eq!(transport.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_authenticate_bypasses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::new(vec![
            Ok(HttpResponse {
                status: 200,
                body: br#"{"id": 42}"#.to_vec(),
            }),
            Ok(HttpResponse {
                status: 401,
                body: br#"{"errors":[{"message":"Could not authenticate you.","code":32}]}"#
                    .to_vec(),
            }),
        ]);
        let client = client(&transport)
            .with_cache(ResponseCache::new(dir.path()).with_expire(Duration::ZERO));

        assert!(client.authenticate().unwrap());
        assert!(!client.authenticate().unwrap());
        assert_eq!(transport.seen.lock().unwrap().len(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_upload_files_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banner.jpg");
        std::fs::write(&path, b"jpeg-bytes").unwrap();
        let transport = FakeTransport::reply(200, r#"{"id": 1}"#);

        client(&transport)
            .upload_files(
                "account/update_profile_banner",
                vec![("offset_left", Some("0")), ("offset_top", None)],
                &[("banner", &path)],
            )
            .unwrap();
        let req = transport.last();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.url.path(), "/1.1/account/update_profile_banner.json");
        let query = req.url.query().unwrap().to_string();
        assert!(query.starts_with("offset_left=0&"));
        assert!(!query.contains("offset_top"));
        assert!(query.contains("oauth_signature="));
        assert_eq!(
            req.body,
            HttpBody::Multipart(vec![FilePart::new(
                "banner",
                "banner.jpg",
                "image/jpeg",
                b"jpeg-bytes".to_vec()
            )])
        );
    }

    #[test]
    fn test_upload_files_missing_file() {
        let transport = FakeTransport::new(Vec::new());
        let err = client(&transport)
            .upload_files(
                "account/update_profile_banner",
                Vec::<(String, Option<String>)>::new(),
                &[("banner", "/definitely/not/here.jpg")],
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_with_api_base() {
        let transport = FakeTransport::new(Vec::new());
        let client = client(&transport)
            .with_api_base("http://127.0.0.1:8080/1.1")
            .unwrap();
        assert_eq!(client.api_base().as_str(), "http://127.0.0.1:8080/1.1/");
    }

    #[test]
    fn test_is_present() {
        assert!(is_present(&json!(1)));
        assert!(is_present(&json!("123")));
        assert!(!is_present(&json!(0)));
        assert!(!is_present(&json!("")));
        assert!(!is_present(&json!("0")));
        assert!(!is_present(&Value::Null));
    }
}
