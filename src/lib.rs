pub mod auth;
pub mod bookings;
pub mod config;
pub mod live;
pub mod models;
pub mod services;
pub mod store;
pub mod tables;
