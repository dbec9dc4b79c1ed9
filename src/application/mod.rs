pub mod bootstrap;
pub mod commands;
pub mod invoke;
pub mod state;
pub mod sync_coordinator;
