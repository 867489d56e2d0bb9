//! HTTP front end for the rsimulator template matcher.
//!
//! Any `GET`, `POST`, `PUT` or `DELETE` request is answered with the response
//! paired to the first request template under `<root>/<path>` that matches
//! the request body. Requests without a matching template get a 404.

pub mod cli;
pub mod config;
pub mod handler;
pub mod logging;
pub mod response;
pub mod scripting;
pub mod server;

pub use cli::Args;
pub use config::Config;
pub use handler::AppState;
pub use server::{serve, SimulatorServer};
