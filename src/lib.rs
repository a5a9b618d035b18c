#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod candidates;
pub mod catalog;
pub mod config;
pub mod probe;
pub mod resolver;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
