//! Live motion telemetry: ingest accelerometer/orientation readings from a
//! phone, keep fixed-length chart windows, and stay connected to the relay.

pub mod app;
pub mod auth;
pub mod codec;
pub mod commands;
pub mod config;
pub mod ingest;
pub mod logger;
pub mod orientation;
pub mod plotter;
pub mod simulator;
pub mod transport;
pub mod types;
pub mod utils;
pub mod window;
