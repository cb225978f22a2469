pub mod app;
pub mod card;
pub mod cli;
pub mod config;
pub mod draft;
pub mod focus;
pub mod sanitize;
pub mod storage;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
