pub mod camera;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod format;
pub mod forms;
pub mod models;
pub mod reports;
pub mod session;
pub mod store;
pub mod ui;

pub use error::{AppError, Result};
