use clap::Parser;
use rsimulator_http::{logging, Args, SimulatorServer};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let config = args.load_config()?;
    logging::init(&config.log_level, config.log_format)?;

    info!(
        "Starting rsimulator v{} serving {}",
        env!("CARGO_PKG_VERSION"),
        config.root()?.display()
    );
    let server = SimulatorServer::from_config(&config)?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
