use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use url::Url;

use crate::error::{Error, Result};
use crate::util;

/// HTTP methods an OAuth request may be signed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            other => Err(Error::invalid_request(format!(
                "unsupported HTTP method `{}`",
                other
            ))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A binary upload carried in a multipart body.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    pub name: String,
    pub file_name: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

impl FilePart {
    pub fn new(
        name: impl Into<String>,
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        FilePart {
            name: name.into(),
            file_name: file_name.into(),
            media_type: media_type.into(),
            content,
        }
    }

    /// Reads `path` into a part named `name`.
    pub fn from_path(name: impl Into<String>, path: &Path) -> Result<Self> {
        let content = fs::read(path).map_err(|_| {
            Error::invalid_request(format!(
                "Cannot read the file {}. Check if file exists on disk and check its permissions",
                path.display()
            ))
        })?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        Ok(FilePart::new(
            name,
            file_name,
            crate::avatar::media_type_for(path),
            content,
        ))
    }
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("name", &self.name)
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("len", &self.content.len())
            .finish()
    }
}

/// Drops parameters whose value is null.
pub fn drop_null<I, K, V>(params: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: Into<String>,
    V: Into<String>,
{
    params
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.into(), v.into())))
        .collect()
}

/// Request payload. Only the plain fields are ever signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    UrlEncoded(Vec<(String, String)>),
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
}

impl Default for Body {
    fn default() -> Self {
        Body::UrlEncoded(Vec::new())
    }
}

impl Body {
    pub fn url_encoded<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        Body::UrlEncoded(drop_null(params))
    }

    pub fn multipart<I, K, V>(fields: I, files: Vec<FilePart>) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        Body::Multipart {
            fields: drop_null(fields),
            files,
        }
    }

    /// Builds a multipart body whose files are read from disk.
    pub fn multipart_from_files<I, K, V, N, P>(fields: I, files: &[(N, P)]) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
        N: AsRef<str>,
        P: AsRef<Path>,
    {
        let files = files
            .iter()
            .map(|(name, path)| FilePart::from_path(name.as_ref(), path.as_ref()))
            .collect::<Result<Vec<FilePart>>>()?;
        Ok(Body::multipart(fields, files))
    }

    /// The non-file fields: the subset that takes part in the signature.
    pub fn signable(&self) -> &[(String, String)] {
        match self {
            Body::UrlEncoded(params) => params,
            Body::Multipart { fields, .. } => fields,
        }
    }

    pub fn files(&self) -> &[FilePart] {
        match self {
            Body::UrlEncoded(_) => &[],
            Body::Multipart { files, .. } => files,
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Body::Multipart { .. })
    }
}

/// Request descriptor: method, base URL and parameters.
///
/// Query parameters found on the URL are moved into [`Request::query`] so the URL
/// itself is always the base string URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Url,
    query: Vec<(String, String)>,
    body: Body,
}

impl Request {
    pub fn new(method: Method, url: &str, body: Body) -> Result<Self> {
        let url = util::parse_url(url)?;
        if method == Method::Get && body.is_multipart() {
            return Err(Error::invalid_request("file uploads require POST"));
        }
        let (endpoint, query) = util::url_to_endpoint_and_queries(&url);
        Ok(Request {
            method,
            url: util::parse_url(&endpoint)?,
            query,
            body,
        })
    }

    pub fn get(url: &str) -> Result<Self> {
        Request::new(Method::Get, url, Body::default())
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}
