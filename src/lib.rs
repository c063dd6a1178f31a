//! Aerosense dashboard backend - chart data for wind turbine blade sensors
//!
//! Resolves time range selections, fetches sensor data from the warehouse
//! under a row cap, and shapes it into chart descriptions served over HTTP.
//! This library exposes the core modules for testing and reuse.

pub mod charts;
pub mod common;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod services;
pub mod warehouse;
