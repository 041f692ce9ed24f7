use std::net::TcpListener;

use anyhow::Context;
use env_logger::Env;
use markwatch::{
    configuration::get_configuration,
    startup::{build_searcher, run},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().context("Failed to read configuration.")?;
    let searcher = build_searcher(&configuration).context("Failed to build trademark searcher.")?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener =
        TcpListener::bind(&address).with_context(|| format!("Failed to bind {}", address))?;
    log::info!("Listening on {}", address);

    run(listener, searcher, configuration.application.static_dir)?.await?;
    Ok(())
}
