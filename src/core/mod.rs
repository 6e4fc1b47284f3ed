pub mod adapters;
pub mod config;
pub mod error;
pub mod keepalive;
pub mod lifecycle;
pub mod store;
pub mod tasks;
pub mod terminal;
