//! Network services for DCC++ over TCP and the JSON API.
//!
//! - `net` feature: [`SharedStation`], the DCC++ TCP listener and the tokio
//!   update loop that drives the scheduler
//! - `web` feature: Axum-based HTTP API with JSON endpoints
//!
//! Every service shares one station through `Arc<SharedStation>`:
//!
//! ```ignore
//! use std::sync::Arc;
//! use rs_cmdstation::services::{SharedStation, run_tcp_server, spawn_update_loop};
//!
//! let state = Arc::new(SharedStation::new(station, scheduler));
//! spawn_update_loop(Arc::clone(&state));
//!
//! // TCP and web use the same state
//! let web_router = build_router(Arc::clone(&state), &web_config);
//! run_tcp_server(state, tcp_config).await?;
//! ```

#[cfg(feature = "net")]
pub mod shared;

#[cfg(feature = "net")]
pub mod tcp;

#[cfg(feature = "web")]
pub mod api;

#[cfg(feature = "web")]
pub mod web;

// Re-exports
#[cfg(feature = "net")]
pub use shared::*;

#[cfg(feature = "net")]
pub use tcp::*;

#[cfg(feature = "web")]
pub use api::*;

#[cfg(feature = "web")]
pub use web::*;
