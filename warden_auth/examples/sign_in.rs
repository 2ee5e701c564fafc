use std::time::Duration;

use clap::Parser;
use warden_auth::{directory::PostgresDirectory, Authenticator, Identity, Secret};

#[derive(Debug, Parser)]
struct Opts {
    /// The user to sign in as
    #[arg(short, long, env = "WARDEN_USER")]
    user: Identity,

    /// The user's password
    #[arg(short, long, env = "WARDEN_PASSWORD", hide_env_values = true)]
    password: Secret,

    /// How long the renewed token should remain usable, in seconds
    #[arg(short, long, default_value_t = 300)]
    extend: u64,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let auth = Authenticator::from_env(
        PostgresDirectory::new().with_connect_timeout(Duration::from_secs(5)),
    )?;

    let token = auth.authenticate(&opts.user, &opts.password).await?;
    tracing::info!(token = ?token, valid = auth.is_valid(&token), "signed in");

    let renewed = auth.refresh(&token, Duration::from_secs(opts.extend))?;
    tracing::info!(token = ?renewed, valid = auth.is_valid(&renewed), "token renewed");

    println!("{:#}", renewed);

    Ok(())
}
