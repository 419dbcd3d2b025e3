// palctl-api: Async Rust client for the Palworld dedicated server REST API

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{PalworldClient, Reachability};
pub use error::Error;
pub use models::{Player, ServerInfo};
pub use transport::TransportConfig;
