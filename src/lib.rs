//! NTS Radio plugin core: player selection, process supervision, live volume
//! and now/next metadata for the two NTS channels.

pub mod backend;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod ipc;
pub mod metadata;
pub mod plugin;
pub mod state;
pub mod watchdog;

pub use config::Settings;
pub use error::{Error, Result};
pub use plugin::{Plugin, Status};
