pub mod agent;
pub mod config;
pub mod error;
pub mod handler;
pub mod probe;
pub mod signals;
