pub mod anthropic;
pub mod memory;
pub mod relay_client;
