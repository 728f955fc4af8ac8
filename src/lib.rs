pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod orders;
pub mod products;
pub mod response;
pub mod state;
pub mod store;
pub mod users;
