use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::Url;

use crate::error::{Error, Result};
use crate::parameters::{Method, Request};
use crate::util;
use crate::v1::*;

type HmacSha1 = Hmac<Sha1>;

/// Parameters that are carried next to the signed set but never signed themselves.
const UNSIGNED_PARAMS: [&str; 2] = [OAUTH_PARAM_KEY_SIGNATURE, "realm"];

/// Computes the HMAC-SHA1 `oauth_signature` for a request.
///
/// `parameters` must already contain the oauth_* parameters (consumer key, nonce,
/// timestamp, ...). Any query string on `url` is folded into the signed set and
/// stripped from the base string URI.
///
/// # Errors
/// - [`Error::InvalidRequest`] when `http_method` is not GET/POST or `url` is not an
///   absolute http(s) URL.
/// - [`Error::InvalidCredentials`] when the consumer secret or a supplied
///   `oauth_consumer_key` is empty.
pub fn sign<K, V>(
    http_method: &str,
    url: &str,
    parameters: &[(K, V)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let http_method = http_method.parse::<Method>()?;
    let url = util::parse_url(url)?;
    if consumer_secret.is_empty() {
        return Err(Error::invalid_credentials("consumer secret must not be empty"));
    }
    let empty_consumer_key = parameters
        .iter()
        .any(|(k, v)| k.as_ref() == OAUTH_PARAM_KEY_CONSUMER_KEY && v.as_ref().is_empty());
    if empty_consumer_key {
        return Err(Error::invalid_credentials("consumer key must not be empty"));
    }

    let (endpoint, query) = util::url_to_endpoint_and_queries(&url);
    let params = parameters
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_ref()))
        .chain(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let base_str = signature_base_string(http_method.as_str(), &endpoint, params);
    tracing::debug!(base_string = %base_str, "built OAuth signature base string");

    Ok(generate_signature_hmacsha1(
        consumer_secret,
        token_secret,
        &base_str,
    ))
}

/// Encodes, sorts and joins the parameters into the OAuth parameter string.
pub fn normalize_parameters<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut encoded = params
        .into_iter()
        .filter(|(k, _)| !UNSIGNED_PARAMS.contains(k))
        .map(|(k, v)| (percent_encode(k).to_string(), percent_encode(v).to_string()))
        .collect::<Vec<(String, String)>>();
    // alphabetic sort by encoded key, then by encoded value
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<String>>()
        .join("&")
}

/// `METHOD&enc(endpoint)&enc(parameter string)`
pub fn signature_base_string<'a, I>(http_method: &str, endpoint: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    // (parameters end up encoded twice.)
    let param_str = normalize_parameters(params);
    let http_method = http_method.to_ascii_uppercase();
    format!(
        "{}&{}&{}",
        percent_encode(&http_method),
        percent_encode(endpoint),
        percent_encode(&param_str)
    )
}

fn generate_signature_hmacsha1(consumer_secret: &str, token_secret: &str, base_str: &str) -> String {
    let sign_key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac = match HmacSha1::new_from_slice(sign_key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC accepts keys of any length"),
    };
    mac.update(base_str.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

fn encode_pairs<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<String>>()
        .join("&")
}

/// A request together with the oauth_* parameters and signature that authenticate it.
///
/// Single-use: build a new one for every dispatch.
#[derive(Clone, Debug)]
pub struct SignedRequest {
    request: Request,
    oauth_params: Vec<(String, String)>,
    signature: String,
}

impl SignedRequest {
    pub(crate) fn new(request: Request, oauth_params: Vec<(String, String)>, signature: String) -> Self {
        SignedRequest {
            request,
            oauth_params,
            signature,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn oauth_param(&self, key: &str) -> Option<&str> {
        self.oauth_params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// oauth_* parameters followed by `oauth_signature`.
    pub fn authorization_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.oauth_params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(std::iter::once((
                OAUTH_PARAM_KEY_SIGNATURE,
                self.signature.as_str(),
            )))
    }

    /// Every signed parameter plus the signature, in dispatch order.
    fn all_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.request
            .query()
            .iter()
            .chain(self.request.body().signable())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(self.authorization_params())
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        let params = self
            .authorization_params()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<String>>()
            .join(", ");
        format!("{} {}", OAUTH_HEADER, params)
    }

    /// The request URL with every signed parameter in the query string.
    pub fn to_url(&self) -> Url {
        let mut url = self.request.url().clone();
        url.set_query(Some(&encode_pairs(self.all_params())));
        url
    }

    /// Every signed parameter as an `application/x-www-form-urlencoded` body.
    pub fn to_postdata(&self) -> String {
        encode_pairs(self.all_params())
    }
}
