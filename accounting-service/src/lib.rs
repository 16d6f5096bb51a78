//! Accounting Service - journal posting and running-balance ledgers.

pub mod chart;
pub mod config;
pub mod models;
pub mod services;
