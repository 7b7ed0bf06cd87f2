pub mod category;
pub mod entry;
pub mod form;
pub mod session;
pub mod settings;
pub mod summary;
