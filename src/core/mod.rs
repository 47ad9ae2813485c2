// src/core/mod.rs

pub mod bucket;
pub mod csv;
pub mod key;
pub mod net;
pub mod sanitize;

pub use bucket::TimeBucket;
pub use key::{EntityKey, KeyField, KeySchema};
