//! Command-line / environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::cache::ResponseCache;
use crate::client::{UploadMode, API_URL};
use crate::transport::TransportOptions;
use crate::v1::Credentials;

/// Upload a random image from a directory as the profile avatar.
#[derive(Clone, Debug, Parser)]
#[command(name = "avatar-cycle", version, about)]
pub struct Config {
    /// OAuth consumer (application) key
    #[arg(long, env = "AVATAR_CYCLE_CONSUMER_KEY")]
    pub consumer_key: String,

    /// OAuth consumer (application) secret
    #[arg(long, env = "AVATAR_CYCLE_CONSUMER_SECRET", hide_env_values = true)]
    pub consumer_secret: String,

    /// OAuth access token of the account to update
    #[arg(long, env = "AVATAR_CYCLE_ACCESS_TOKEN")]
    pub access_token: Option<String>,

    /// OAuth access token secret
    #[arg(long, env = "AVATAR_CYCLE_ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub access_token_secret: Option<String>,

    /// Directory holding the candidate avatar images
    #[arg(long, env = "AVATAR_CYCLE_DIR")]
    pub avatar_dir: PathBuf,

    /// Base URL API resources are resolved against
    #[arg(long, env = "AVATAR_CYCLE_API_BASE", default_value = API_URL)]
    pub api_base: String,

    /// HTTP timeout in seconds
    #[arg(long, env = "AVATAR_CYCLE_TIMEOUT", default_value_t = 20)]
    pub timeout: u64,

    /// Skip TLS certificate verification
    #[arg(long, env = "AVATAR_CYCLE_INSECURE")]
    pub insecure: bool,

    /// Upload the image as multipart/form-data instead of a base64 form field
    #[arg(long)]
    pub multipart: bool,

    /// Check the credentials before uploading
    #[arg(long)]
    pub verify: bool,

    /// Directory for cached GET responses (disabled when unset)
    #[arg(long, env = "AVATAR_CYCLE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Seconds a cached response stays fresh
    #[arg(long, env = "AVATAR_CYCLE_CACHE_EXPIRE", default_value_t = 30 * 60)]
    pub cache_expire: u64,
}

impl Config {
    pub fn consumer(&self) -> Credentials {
        Credentials::new(self.consumer_key.as_str(), self.consumer_secret.as_str())
    }

    pub fn token(&self) -> Option<Credentials> {
        self.access_token.as_ref().map(|key| {
            Credentials::new(
                key.as_str(),
                self.access_token_secret.as_deref().unwrap_or(""),
            )
        })
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            timeout: Duration::from_secs(self.timeout),
            verify_tls: !self.insecure,
            ..TransportOptions::default()
        }
    }

    pub fn cache(&self) -> Option<ResponseCache> {
        self.cache_dir.as_ref().map(|dir| {
            ResponseCache::new(dir).with_expire(Duration::from_secs(self.cache_expire))
        })
    }

    pub fn upload_mode(&self) -> UploadMode {
        if self.multipart {
            UploadMode::Multipart
        } else {
            UploadMode::Base64
        }
    }
}
