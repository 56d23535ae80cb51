pub mod activity;
pub mod attribution;
pub mod config;
pub mod error;
pub mod router;
pub mod seed;
pub mod service;
pub mod store;
pub mod survey;
pub mod telemetry;
