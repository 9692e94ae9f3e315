//! Core domain types and logic.

pub mod backtest;
pub mod basket;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod portfolio;
pub mod position;
pub mod regime;
pub mod registry;
pub mod strategy;
pub mod universe;
pub mod window;
