#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod data;
pub mod favorites;
pub mod feed;
pub mod home;
pub mod interactions;
pub mod logging;
pub mod model;
pub mod profile;
pub mod session;
pub mod signup;
pub mod storage;
pub mod title;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
