pub mod adapters;
pub mod config;
pub mod errors;
pub mod models;
pub mod player;
pub mod services;
pub mod sources;
