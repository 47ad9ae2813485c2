// src/lib.rs

#[macro_use]
pub mod macros;
#[macro_use]
pub mod log;

pub mod config;
pub mod core;
pub mod error;

pub mod archive;
pub mod feeds;
pub mod fetch;
pub mod normalize;
pub mod progress;
pub mod ranking;
pub mod roster;
pub mod runner;
pub mod specs;
pub mod store;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "gui")]
pub mod gui;

pub use error::{Error, Result};
