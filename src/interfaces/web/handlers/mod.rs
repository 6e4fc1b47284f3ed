pub mod config;
pub mod keepalive;
pub mod tasks;
