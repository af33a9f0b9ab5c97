pub mod api_client;
pub mod config;
pub mod constants;
pub mod engine;
pub mod services;
pub mod settings;
pub mod testing;
pub mod time;
