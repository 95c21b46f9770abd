//! kanjo Server
//!
//! HTTP front end for the Japanese sentiment model: `POST /predict`
//! classifies a text as positive or negative, `GET /health` is a liveness
//! probe.

pub mod cli;
pub mod config;
pub mod routes;
pub mod state;

pub use cli::Cli;
pub use config::ServerConfig;
pub use routes::create_router;
pub use state::AppState;
