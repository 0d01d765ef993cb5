// src/services/mod.rs
pub mod cpi;
pub mod cpi_parser;
pub mod cpi_store;
pub mod retry;
pub mod scheduler;
pub mod valuation;
