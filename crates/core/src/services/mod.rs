pub mod aggregation_service;
pub mod billing_service;
pub mod entry_store;
pub mod session_service;
