// Adapters layer: concrete implementations for external systems (backend http, local storage).

pub mod http;
pub mod storage;
