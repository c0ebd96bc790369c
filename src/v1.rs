use chrono::Utc;
use percent_encoding::{utf8_percent_encode, AsciiSet, PercentEncode};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::parameters::Request;

mod secrets;
mod signer;

pub use secrets::*;
pub use signer::*;

// https://tools.ietf.org/html/rfc5849#section-3.6
// * ALPHA, DIGIT, '-', '.', '_', '~' MUST NOT be encoded.
// * All other characters MUST be encoded.
// * The two hexadecimal characters used to represent encoded
//   characters MUST be uppercase.
const TARGETS_FOR_PARAMS: &AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub const DEFAULT_SIGNATURE: &str = "HMAC-SHA1";
pub const OAUTH_VERSION: &str = "1.0";

pub(crate) const OAUTH_HEADER: &str = "OAuth";
pub(crate) const OAUTH_PARAM_KEY_CONSUMER_KEY: &str = "oauth_consumer_key";
pub(crate) const OAUTH_PARAM_KEY_NONCE: &str = "oauth_nonce";
pub(crate) const OAUTH_PARAM_KEY_SIGNATURE: &str = "oauth_signature";
pub(crate) const OAUTH_PARAM_KEY_SIGNATURE_METHOD: &str = "oauth_signature_method";
pub(crate) const OAUTH_PARAM_KEY_TIMESTAMP: &str = "oauth_timestamp";
pub(crate) const OAUTH_PARAM_KEY_TOKEN: &str = "oauth_token";
pub(crate) const OAUTH_PARAM_KEY_VERSION: &str = "oauth_version";

/// Percent-encodes `input` with the RFC 3986 unreserved set.
pub fn percent_encode(input: &str) -> PercentEncode<'_> {
    utf8_percent_encode(input, TARGETS_FOR_PARAMS)
}

/// OAuth Signature Builder
///
/// Holds the consumer and (optional) token credentials and produces a fresh
/// [`SignedRequest`] for every call to [`OAuthSignBuilder::sign`]. Nonce and
/// timestamp are generated per call unless pinned with
/// [`oauth_nonce`](OAuthSignBuilder::oauth_nonce) /
/// [`oauth_timestamp`](OAuthSignBuilder::oauth_timestamp).
#[derive(Clone, Debug)]
pub struct OAuthSignBuilder {
    consumer: Credentials,
    token: Option<Credentials>,
    oauth_nonce: Option<String>,
    oauth_timestamp: Option<i64>,
}

impl OAuthSignBuilder {
    /// Constructor of OAuthSignBuilder with the consumer credentials.
    pub fn new(consumer: Credentials) -> Self {
        OAuthSignBuilder {
            consumer,
            token: None,
            oauth_nonce: None,
            oauth_timestamp: None,
        }
    }

    /// Constructor of OAuthSignBuilder bound to an access token.
    pub fn new_with_token(consumer: Credentials, token: Credentials) -> Self {
        let mut builder = OAuthSignBuilder::new(consumer);
        builder.oauth_token(Some(token));
        builder
    }

    /// Binds (or unbinds) the access token. Tokens with an empty key are ignored.
    pub fn oauth_token(&mut self, token: Option<Credentials>) -> &mut Self {
        self.token = token.filter(|t| !t.key().is_empty());
        self
    }

    pub fn oauth_nonce(&mut self, nonce: impl Into<String>) -> &mut Self {
        self.oauth_nonce = Some(nonce.into());
        self
    }

    pub fn oauth_timestamp(&mut self, timestamp: i64) -> &mut Self {
        self.oauth_timestamp = Some(timestamp);
        self
    }

    pub fn consumer(&self) -> &Credentials {
        &self.consumer
    }

    pub fn token(&self) -> Option<&Credentials> {
        self.token.as_ref()
    }

    /// Builds the standard oauth_* parameters for one request.
    fn basic_params(&self) -> Vec<(String, String)> {
        let timestamp = self
            .oauth_timestamp
            .unwrap_or_else(|| Utc::now().timestamp());
        // generate nonce when it is not specified
        let nonce = self
            .oauth_nonce
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        let mut params = vec![
            (
                OAUTH_PARAM_KEY_CONSUMER_KEY.to_string(),
                self.consumer.key().to_string(),
            ),
            (OAUTH_PARAM_KEY_NONCE.to_string(), nonce),
            (
                OAUTH_PARAM_KEY_SIGNATURE_METHOD.to_string(),
                DEFAULT_SIGNATURE.to_string(),
            ),
            (OAUTH_PARAM_KEY_TIMESTAMP.to_string(), timestamp.to_string()),
            (OAUTH_PARAM_KEY_VERSION.to_string(), OAUTH_VERSION.to_string()),
        ];
        if let Some(token) = &self.token {
            params.push((OAUTH_PARAM_KEY_TOKEN.to_string(), token.key().to_string()));
        }
        params
    }

    /// Signs `request`, returning the request together with its oauth_* parameters
    /// and signature.
    pub fn sign(&self, request: Request) -> Result<SignedRequest> {
        if self.consumer.key().is_empty() || self.consumer.secret().is_empty() {
            return Err(Error::invalid_credentials(
                "consumer key and secret must not be empty",
            ));
        }

        let oauth_params = self.basic_params();
        let token_secret = self.token.as_ref().map(|t| t.secret()).unwrap_or("");

        // file parts never take part in the signature
        let signed_params = request
            .query()
            .iter()
            .chain(request.body().signable())
            .chain(oauth_params.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect::<Vec<(&str, &str)>>();

        let signature = sign(
            request.method().as_str(),
            request.url().as_str(),
            &signed_params,
            self.consumer.secret(),
            token_secret,
        )?;

        Ok(SignedRequest::new(request, oauth_params, signature))
    }
}
