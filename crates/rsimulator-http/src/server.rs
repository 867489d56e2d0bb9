//! HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use rsimulator_core::Simulator;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::config::Config;
use crate::handler::{handle_request, AppState};
use crate::scripting::RhaiHooks;

/// Simulator HTTP server
pub struct SimulatorServer {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl SimulatorServer {
    pub fn new(addr: SocketAddr, state: Arc<AppState>) -> Self {
        Self { addr, state }
    }

    /// Build the simulator and its server from a validated configuration.
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let root = config.root()?;
        let mut builder = Simulator::builder(root);
        if config.scripting.enabled {
            builder = builder.hooks(RhaiHooks::new(root));
        }
        if config.cache.enabled {
            builder = builder.cache(config.cache.max_entries);
        }
        let simulator = builder.build();
        debug!("Created {:?}", simulator);

        let state = AppState::new(simulator, config.diagnostics.enabled);
        Ok(Self::new(config.socket_addr()?, Arc::new(state)))
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve until an accept error occurs.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(
            "rsimulator listening on http://{}",
            listener.local_addr()?
        );
        serve(listener, self.state).await
    }
}

/// Accept loop on an already bound listener.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), anyhow::Error> {
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { handle_request(req, state).await }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Connection error: {}", e);
            }
        });
    }
}
