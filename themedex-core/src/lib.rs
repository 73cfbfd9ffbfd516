//! Themedex library exports

pub mod catalog;
pub mod config;
pub mod debounce;
pub mod transport;
