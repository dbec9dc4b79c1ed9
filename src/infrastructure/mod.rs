pub mod config;
pub mod error;
pub mod events_client;
pub mod logging;
