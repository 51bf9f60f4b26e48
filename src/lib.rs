pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod fees;
pub mod gateway;
pub mod models;
pub mod observability;
pub mod reconciliation;
pub mod repositories;
pub mod services;
