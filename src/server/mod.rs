//! HTTP surface: frontend, liveness, prediction and model health routes.

pub mod routes;
pub mod server;
pub mod types;

pub use server::{router, ApiServer, AppState};
pub use types::{ModelHealthResponse, PingResponse};
