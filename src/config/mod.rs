// src/config/mod.rs

pub mod consts;
pub mod options;
#[cfg(feature = "gui")]
pub mod state;

pub use options::{Credentials, RunOptions, Source, SourceSelector};
