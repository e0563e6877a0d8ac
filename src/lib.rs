pub mod client;
pub mod config;
pub mod controller;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod preview;
pub mod services;
pub mod view;
