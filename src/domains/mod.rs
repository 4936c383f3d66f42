pub mod chat;
pub mod ids;
