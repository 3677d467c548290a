#![doc = include_str!("../README.md")]

pub mod channels;
pub mod charging;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clients;
pub mod codec;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
mod macros;
pub mod plugin;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
