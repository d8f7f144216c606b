#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod feed;
pub mod form;
pub mod logging;
pub mod post;
pub mod router;
pub mod store;
pub mod tasks;
pub mod ui;
pub mod upload;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
