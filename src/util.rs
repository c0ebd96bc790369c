use url::Url;

use crate::error::{Error, Result};

/// Parses an absolute http(s) URL with a host.
pub fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| Error::invalid_request(format!("malformed URL `{}`: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(parsed),
        _ => Err(Error::invalid_request(format!(
            "URL `{}` must be an absolute http(s) URL",
            url
        ))),
    }
}

/// Splits `url` into the base string URI (scheme, host, port, path) and its
/// decoded query parameters.
pub fn url_to_endpoint_and_queries(url: &Url) -> (String, Vec<(String, String)>) {
    // queries save into pairs, keeping duplicates.
    let queries = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut endpoint = url.clone();
    endpoint.set_query(None);
    endpoint.set_fragment(None);
    (endpoint.into(), queries)
}

/// Resolves an API resource name against `api_base`.
///
/// Absolute URLs pass through; bare names without an extension get `.json`.
pub fn resolve_resource(api_base: &Url, resource: &str) -> Result<String> {
    if resource.contains("://") {
        return Ok(resource.to_string());
    }
    let mut resource = resource.trim_start_matches('/').to_string();
    let name = resource.split('?').next().unwrap_or("");
    if !name.contains('.') {
        let query = resource.find('?').map(|i| resource.split_off(i));
        resource.push_str(".json");
        if let Some(query) = query {
            resource.push_str(&query);
        }
    }
    api_base
        .join(&resource)
        .map(String::from)
        .map_err(|e| Error::invalid_request(format!("cannot resolve `{}`: {}", resource, e)))
}

#[test]
fn test_url_to_endpoint_and_queries() {
    let s = "http://EXAMPLE.com:80/r%20v/X?id=123&q=a+b&パラメータ=テスト#section";
    let u = Url::parse(s).unwrap();
    let (core, pairs) = url_to_endpoint_and_queries(&u);
    assert_eq!(core, "http://example.com/r%20v/X");
    assert_eq!(
        pairs,
        vec![
            ("id".to_string(), "123".to_string()),
            ("q".to_string(), "a b".to_string()),
            ("パラメータ".to_string(), "テスト".to_string()),
        ]
    );
    let n = "https://www.example.net:8080/";
    let nu = Url::parse(n).unwrap();
    let (core, pairs) = url_to_endpoint_and_queries(&nu);
    assert_eq!(core, n);
    assert!(pairs.is_empty());
}

#[test]
fn test_parse_url() {
    assert!(parse_url("https://api.example.com/1.1/").is_ok());
    assert!(parse_url("/relative/path").is_err());
    assert!(parse_url("mailto:someone@example.com").is_err());
    assert!(parse_url("file:///etc/passwd").is_err());
}

#[test]
fn test_resolve_resource() {
    let base = Url::parse("https://api.twitter.com/1.1/").unwrap();
    assert_eq!(
        resolve_resource(&base, "account/verify_credentials").unwrap(),
        "https://api.twitter.com/1.1/account/verify_credentials.json"
    );
    assert_eq!(
        resolve_resource(&base, "statuses/show.xml").unwrap(),
        "https://api.twitter.com/1.1/statuses/show.xml"
    );
    assert_eq!(
        resolve_resource(&base, "users/show?screen_name=a.b").unwrap(),
        "https://api.twitter.com/1.1/users/show.json?screen_name=a.b"
    );
    assert_eq!(
        resolve_resource(&base, "https://upload.example.com/x").unwrap(),
        "https://upload.example.com/x"
    );
}
