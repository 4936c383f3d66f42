pub mod providers;
pub mod store;
