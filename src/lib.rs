//! Core library for the spot-deals refresher.
//!
//! A run discovers the provider's regions, prices each one concurrently,
//! ranks the qualifying offers and reconciles the result with the dataset
//! persisted by the previous run.

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod utils;
