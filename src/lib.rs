pub mod app;
pub mod config;
pub mod detail;
pub mod discovery;
pub mod expiring;
pub mod favorites;
pub mod models;
pub mod present;
pub mod tmdb;
pub mod view;
