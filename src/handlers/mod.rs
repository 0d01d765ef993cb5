// src/handlers/mod.rs
pub mod cpi;
pub mod error;
pub mod health;
pub mod valuation;
