//! Options desk simulator: a stepped stock-price path driving Black-Scholes
//! revaluation of a book of option contracts.

pub mod commentary;
pub mod config;
pub mod desk;
pub mod engine;
pub mod errors;
pub mod models;
pub mod server;
pub mod state;
