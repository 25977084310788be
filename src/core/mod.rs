pub mod export;
pub mod extracted;
pub mod schedule;
pub mod session;
pub mod store;

pub use crate::domain::model::{CalendarEvent, Contract, Invoice, Schedule};
pub use crate::domain::ports::{BackendApi, ConfigProvider, Storage};
pub use crate::utils::error::Result;
