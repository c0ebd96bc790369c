use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use avatar_cycle::{AvatarSource, Client, Config, ReqwestTransport};

fn main() -> Result<()> {
    // a missing .env file is fine
    let _ = dotenvy::dotenv();
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("avatar_cycle=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    run(&config)
}

fn run(config: &Config) -> Result<()> {
    let avatar = AvatarSource::new(&config.avatar_dir)
        .pick()
        .context("Cannot select an avatar")?;

    let transport = ReqwestTransport::new(&config.transport_options())?;
    let mut client = Client::new(config.consumer(), config.token(), transport)?
        .with_api_base(&config.api_base)?;
    if let Some(cache) = config.cache() {
        client = client.with_cache(cache);
    }

    if config.verify && !client.authenticate()? {
        bail!("Invalid credentials: the API rejected the access token");
    }

    client
        .update_avatar(&avatar, config.upload_mode())
        .context("Error updating avatar")?;
    println!("Avatar updated with {}", avatar.file_name());
    Ok(())
}
