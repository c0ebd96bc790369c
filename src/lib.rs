//! Rotates a social-media profile avatar: picks a random image from a directory
//! and uploads it through an OAuth 1.0a (HMAC-SHA1) signed API call.
//!
//! The signer lives in [`v1`]; everything else is glue around it.

pub mod avatar;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod parameters;
pub mod transport;
pub mod v1;

mod util;

pub use avatar::{Avatar, AvatarSource};
pub use cache::ResponseCache;
pub use client::{Client, UploadMode, API_URL};
pub use config::Config;
pub use error::{Error, Result};
pub use parameters::{Body, FilePart, Method, Request};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::{Transport, TransportOptions};
pub use v1::{sign, Credentials, OAuthSignBuilder, SignedRequest};
