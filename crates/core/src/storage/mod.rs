pub mod guest_store;
pub mod medium;
pub mod seed;
