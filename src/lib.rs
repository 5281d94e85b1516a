// Library exports for testing
pub mod ai;
pub mod app;
pub mod config;
pub mod handlers;
pub mod models;
pub mod session;
pub mod uploads;
