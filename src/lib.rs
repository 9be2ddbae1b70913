pub mod analysis;
pub mod api;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod server;
pub mod symbols;
pub mod workers;
