pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::Cli;
pub use config::AppConfig;

pub use adapters::{http::ApiClient, storage::LocalStorage};
pub use core::schedule::{ExpanderSettings, ScheduleExpander};
pub use core::store::AppState;
pub use utils::error::{AppError, Result};
